// RSA Encryption Implementation
// Implements RSA encryption with OAEP padding

use super::bigint::RsaBigInt;
use super::error::RsaResult;
use super::keygen::{PublicKeyParts, RsaPublicKey};
use super::padding::Oaep;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Encrypt `message` under `public_key` with the given OAEP parameters.
///
/// The ciphertext is always exactly `public_key.size()` bytes.
pub fn encrypt_with<H, M, R>(
    oaep: &Oaep<H, M>,
    message: &[u8],
    public_key: &RsaPublicKey,
    rng: &mut R,
) -> RsaResult<Vec<u8>>
where
    H: Digest,
    M: Digest,
    R: RngCore + CryptoRng,
{
    let key_len = public_key.size();
    let mut padded = oaep.pad(message, key_len, rng)?;

    // The leading zero byte keeps m below n
    let mut m = RsaBigInt::from_bytes_be(&padded);
    padded.zeroize();

    // Compute c = m^e mod n
    let c = m.mod_pow(public_key.e(), public_key.n())?;
    m.zeroize();

    Ok(c.to_bytes_be(key_len))
}

/// Encrypt bytes with OAEP (SHA-256, empty label) from the OS random source
pub fn encrypt(message: &[u8], public_key: &RsaPublicKey) -> RsaResult<Vec<u8>> {
    encrypt_with(&Oaep::<Sha256>::new(), message, public_key, &mut OsRng)
}

/// Encrypt a string using RSA public key
pub fn encrypt_string(plaintext: &str, public_key: &RsaPublicKey) -> RsaResult<Vec<u8>> {
    encrypt(plaintext.as_bytes(), public_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::error::RsaError;
    use crate::rsa::keygen::generate_keypair;
    use crate::rsa::testing::FailingRng;

    #[test]
    fn test_encrypt_bytes() {
        let keypair = generate_keypair(1024).unwrap();
        let message = b"Hello, RSA!";

        let ciphertext = encrypt(message, &keypair.public_key).unwrap();
        assert_eq!(ciphertext.len(), 128); // 1024 bits = 128 bytes

        // Verify it's not the same as plaintext
        assert_ne!(&ciphertext[..message.len()], message);
    }

    #[test]
    fn test_encrypt_is_randomized() {
        let keypair = generate_keypair(1024).unwrap();
        let a = encrypt_string("Test message", &keypair.public_key).unwrap();
        let b = encrypt_string("Test message", &keypair.public_key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_encrypt_empty() {
        let keypair = generate_keypair(1024).unwrap();
        let ciphertext = encrypt(b"", &keypair.public_key).unwrap();
        assert_eq!(ciphertext.len(), 128);
    }

    #[test]
    fn test_512_bit_key_too_small_for_sha256() {
        // k = 64 < 2 * 32 + 2, not even an empty message fits
        let keypair = generate_keypair(512).unwrap();
        assert_eq!(
            encrypt(b"", &keypair.public_key),
            Err(RsaError::MessageTooLong { max: 0, actual: 0 })
        );
    }

    #[test]
    fn test_encrypt_boundary() {
        let keypair = generate_keypair(1024).unwrap();
        // 128 - 2 * 32 - 2
        let max = 62;

        assert!(encrypt(&vec![0xabu8; max], &keypair.public_key).is_ok());
        assert_eq!(
            encrypt(&vec![0xabu8; max + 1], &keypair.public_key),
            Err(RsaError::MessageTooLong {
                max,
                actual: max + 1
            })
        );
    }

    #[test]
    fn test_encrypt_rng_failure() {
        let keypair = generate_keypair(1024).unwrap();
        let result = encrypt_with(&Oaep::<Sha256>::new(), b"x", &keypair.public_key, &mut FailingRng);
        assert!(matches!(result, Err(RsaError::RngUnavailable(_))));
    }
}
