use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, LevelFilter};
use rand::rngs::OsRng;
use rsa_oaep::config::RsaConfig;
use rsa_oaep::rsa::{KeyGenerator, PublicKeyParts, RsaKeyPair};
use rsa_oaep::util::file_ops::{
    format_file_size, load_private_key, load_public_key, read_file, save_private_key,
    save_public_key, write_file,
};
use rsa_oaep::util::key_format::public_key_to_pem;
use std::path::{Path, PathBuf};
use std::process;

const DEMO_MESSAGE: &str = "This is a secret message for RSA encryption";

#[derive(Parser)]
#[command(name = "rsa-oaep", version, about = "RSA key generation and OAEP encryption")]
struct Cli {
    /// JSON settings file (key size, exponent, hash, label)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a key, encrypt a sample message and decrypt it again
    Demo {
        #[arg(long)]
        bits: Option<usize>,
        #[arg(long, short, default_value = DEMO_MESSAGE)]
        message: String,
    },
    /// Generate a key pair and write <OUT>.pem and <OUT>.pub.pem
    Keygen {
        #[arg(long, short)]
        out: PathBuf,
        #[arg(long)]
        bits: Option<usize>,
    },
    /// Encrypt with a public key file
    Encrypt {
        #[arg(long, short)]
        key: PathBuf,
        #[command(flatten)]
        input: Input,
        /// Write raw ciphertext here instead of printing hex
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Decrypt with a private key file
    Decrypt {
        #[arg(long, short)]
        key: PathBuf,
        #[command(flatten)]
        input: Input,
        /// Write the plaintext here instead of printing it
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Input {
    /// Inline text to encrypt, or hex ciphertext to decrypt
    #[arg(long, short)]
    text: Option<String>,
    /// Read the input bytes from a file
    #[arg(long, short)]
    input: Option<PathBuf>,
}

fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => RsaConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RsaConfig::default(),
    };

    match cli.command {
        Command::Demo { bits, message } => {
            override_bits(&mut config, bits)?;
            demo(&config, &message)
        }
        Command::Keygen { out, bits } => {
            override_bits(&mut config, bits)?;
            keygen(&config, &out)
        }
        Command::Encrypt { key, input, output } => encrypt(&config, &key, input, output),
        Command::Decrypt { key, input, output } => decrypt(&config, &key, input, output),
    }
}

fn override_bits(config: &mut RsaConfig, bits: Option<usize>) -> Result<()> {
    if let Some(bits) = bits {
        config.key_bits = bits;
        config.validate()?;
    }
    Ok(())
}

fn generate(config: &RsaConfig) -> Result<RsaKeyPair> {
    info!("generating {}-bit key pair", config.key_bits);
    KeyGenerator::new(config.keygen())
        .generate(config.key_bits, &mut OsRng)
        .context("key generation failed")
}

fn demo(config: &RsaConfig, message: &str) -> Result<()> {
    let keypair = generate(config)?;
    let public_key = &keypair.public_key;
    println!("{}", public_key_to_pem(public_key));
    println!("modulus: {} bits, {} bytes", public_key.bit_length(), public_key.size());
    println!(
        "hash: {:?}, max message: {} bytes",
        config.hash,
        config.hash.max_message_len(public_key.size())
    );

    let ciphertext = config
        .hash
        .encrypt(config.label(), message.as_bytes(), public_key, &mut OsRng)?;
    println!("message ({} bytes): {}", message.len(), message);
    println!("ciphertext ({} bytes): {}", ciphertext.len(), hex::encode(&ciphertext));

    let decrypted = config
        .hash
        .decrypt(config.label(), &ciphertext, &keypair.private_key)?;
    println!("decrypted: {}", String::from_utf8_lossy(&decrypted));
    if decrypted != message.as_bytes() {
        bail!("decrypted message does not match the original");
    }
    println!("round trip OK");
    Ok(())
}

fn keygen(config: &RsaConfig, out: &Path) -> Result<()> {
    let keypair = generate(config)?;
    let private_path = out.with_extension("pem");
    let public_path = out.with_extension("pub.pem");
    save_private_key(&private_path, &keypair.private_key)?;
    save_public_key(&public_path, &keypair.public_key)?;
    info!(
        "wrote {} and {}",
        private_path.display(),
        public_path.display()
    );
    Ok(())
}

fn read_input(input: Input, hex_text: bool) -> Result<Vec<u8>> {
    match (input.text, input.input) {
        (Some(text), _) if hex_text => {
            hex::decode(text.trim()).context("ciphertext is not valid hex")
        }
        (Some(text), _) => Ok(text.into_bytes()),
        (None, Some(path)) => Ok(read_file(&path)?),
        (None, None) => bail!("no input given"),
    }
}

fn encrypt(config: &RsaConfig, key: &Path, input: Input, output: Option<PathBuf>) -> Result<()> {
    let public_key = load_public_key(key)?;
    let message = read_input(input, false)?;
    let ciphertext = config
        .hash
        .encrypt(config.label(), &message, &public_key, &mut OsRng)
        .context("encryption failed")?;

    match output {
        Some(path) => {
            write_file(&path, &ciphertext)?;
            info!(
                "wrote {} of ciphertext to {}",
                format_file_size(ciphertext.len() as u64),
                path.display()
            );
        }
        None => println!("{}", hex::encode(&ciphertext)),
    }
    Ok(())
}

fn decrypt(config: &RsaConfig, key: &Path, input: Input, output: Option<PathBuf>) -> Result<()> {
    let private_key = load_private_key(key)?;
    let ciphertext = read_input(input, true)?;
    let plaintext = config
        .hash
        .decrypt(config.label(), &ciphertext, &private_key)
        .context("decryption failed")?;

    match output {
        Some(path) => write_file(&path, &plaintext)?,
        None => println!("{}", String::from_utf8_lossy(&plaintext)),
    }
    Ok(())
}
