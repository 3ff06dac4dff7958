// File Operations for RSA keys and messages
// Handles reading and writing data and PEM key files

use super::key_format::{
    private_key_from_pem, private_key_to_pem, public_key_from_pem, public_key_to_pem,
    KeyFormatError,
};
use crate::rsa::{RsaPrivateKey, RsaPublicKey};
use log::debug;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors that can occur during file operations
#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error on {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("key file {path} is not valid UTF-8 PEM")]
    NotText { path: PathBuf },

    #[error("key file {path}: {source}")]
    KeyFormat {
        path: PathBuf,
        #[source]
        source: KeyFormatError,
    },
}

/// Result type for file operations
pub type FileResult<T> = Result<T, FileError>;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> FileError + '_ {
    move |source| FileError::IoError {
        path: path.to_path_buf(),
        source,
    }
}

/// Read entire file into memory
pub fn read_file(path: impl AsRef<Path>) -> FileResult<Vec<u8>> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(io_error(path))?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).map_err(io_error(path))?;
    Ok(data)
}

/// Write data to file
pub fn write_file(path: impl AsRef<Path>, data: &[u8]) -> FileResult<()> {
    let path = path.as_ref();
    let mut file = File::create(path).map_err(io_error(path))?;
    file.write_all(data).map_err(io_error(path))?;
    debug!("wrote {} to {}", format_file_size(data.len() as u64), path.display());
    Ok(())
}

/// Write data readable by the owner only (0600 on Unix)
pub fn write_private_key_file(path: impl AsRef<Path>, data: &[u8]) -> FileResult<()> {
    let path = path.as_ref();
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(io_error(path))?;
    // mode only applies on creation, tighten an existing file too
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(io_error(path))?;
    }
    file.write_all(data).map_err(io_error(path))?;
    debug!("wrote private key to {}", path.display());
    Ok(())
}

/// Get file size in bytes
pub fn get_file_size(path: impl AsRef<Path>) -> FileResult<u64> {
    let path = path.as_ref();
    let metadata = fs::metadata(path).map_err(io_error(path))?;
    Ok(metadata.len())
}

/// Format file size for display
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn read_pem(path: &Path) -> FileResult<Zeroizing<String>> {
    let data = Zeroizing::new(read_file(path)?);
    std::str::from_utf8(&data)
        .map(|text| Zeroizing::new(text.to_string()))
        .map_err(|_| FileError::NotText {
            path: path.to_path_buf(),
        })
}

fn key_format_error(path: &Path) -> impl FnOnce(KeyFormatError) -> FileError + '_ {
    move |source| FileError::KeyFormat {
        path: path.to_path_buf(),
        source,
    }
}

pub fn save_public_key(path: impl AsRef<Path>, key: &RsaPublicKey) -> FileResult<()> {
    write_file(path, public_key_to_pem(key).as_bytes())
}

pub fn load_public_key(path: impl AsRef<Path>) -> FileResult<RsaPublicKey> {
    let path = path.as_ref();
    let pem = read_pem(path)?;
    public_key_from_pem(&pem).map_err(key_format_error(path))
}

pub fn save_private_key(path: impl AsRef<Path>, key: &RsaPrivateKey) -> FileResult<()> {
    write_private_key_file(path, private_key_to_pem(key).as_bytes())
}

pub fn load_private_key(path: impl AsRef<Path>) -> FileResult<RsaPrivateKey> {
    let path = path.as_ref();
    let pem = read_pem(path)?;
    private_key_from_pem(&pem).map_err(key_format_error(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::KeyGenerator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rsa_oaep_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024), "3.00 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn test_read_write_file() {
        let path = temp_path("data.bin");
        write_file(&path, b"ciphertext bytes").unwrap();
        assert_eq!(read_file(&path).unwrap(), b"ciphertext bytes");
        assert_eq!(get_file_size(&path).unwrap(), 16);
        fs::remove_file(&path).unwrap();

        assert!(matches!(read_file(&path), Err(FileError::IoError { .. })));
    }

    #[test]
    fn test_key_files_roundtrip() {
        let mut rng = StdRng::seed_from_u64(41);
        let keypair = KeyGenerator::default().generate(1024, &mut rng).unwrap();
        let public_path = temp_path("key.pub.pem");
        let private_path = temp_path("key.pem");

        save_public_key(&public_path, &keypair.public_key).unwrap();
        save_private_key(&private_path, &keypair.private_key).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&private_path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        assert_eq!(load_public_key(&public_path).unwrap(), keypair.public_key);
        assert_eq!(load_private_key(&private_path).unwrap(), keypair.private_key);

        // a public key file is not a private key
        assert!(matches!(
            load_private_key(&public_path),
            Err(FileError::KeyFormat {
                source: KeyFormatError::WrongLabel { .. },
                ..
            })
        ));

        fs::remove_file(&public_path).unwrap();
        fs::remove_file(&private_path).unwrap();
    }

    #[test]
    fn test_binary_key_file_rejected() {
        let path = temp_path("garbage.pem");
        write_file(&path, &[0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(load_public_key(&path), Err(FileError::NotText { .. })));
        fs::remove_file(&path).unwrap();
    }
}
