// RSA Decryption Implementation
// Implements RSA-OAEP decryption with Chinese Remainder Theorem (CRT) optimization

use super::bigint::RsaBigInt;
use super::error::{RsaError, RsaResult};
use super::keygen::{PublicKeyParts, RsaPrivateKey};
use super::padding::Oaep;
use log::warn;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Decrypt `ciphertext` with the given OAEP parameters.
///
/// The ciphertext must be exactly `private_key.size()` bytes. Every failure
/// past the length check is reported as `DecryptionFailed`.
pub fn decrypt_with<H, M>(
    oaep: &Oaep<H, M>,
    ciphertext: &[u8],
    private_key: &RsaPrivateKey,
) -> RsaResult<Vec<u8>>
where
    H: Digest,
    M: Digest,
{
    // Validate ciphertext size
    let key_len = private_key.size();
    if ciphertext.len() != key_len {
        return Err(RsaError::InvalidCiphertextLength {
            expected: key_len,
            actual: ciphertext.len(),
        });
    }

    let c = RsaBigInt::from_bytes_be(ciphertext);
    if &c >= private_key.n() {
        return Err(RsaError::DecryptionFailed);
    }

    let mut m = decrypt_crt(&c, private_key)?;

    // A faulty CRT half would otherwise hand out a factor of n
    if m.mod_pow(private_key.e(), private_key.n())? != c {
        warn!("RSA private operation failed its consistency check");
        m.zeroize();
        return Err(RsaError::DecryptionFailed);
    }

    let mut encoded = m.to_bytes_be(key_len);
    m.zeroize();
    let plaintext = oaep.unpad(&encoded, key_len);
    encoded.zeroize();
    plaintext
}

/// Decrypt with OAEP (SHA-256, empty label)
pub fn decrypt(ciphertext: &[u8], private_key: &RsaPrivateKey) -> RsaResult<Vec<u8>> {
    decrypt_with(&Oaep::<Sha256>::new(), ciphertext, private_key)
}

/// Decrypt using Chinese Remainder Theorem (CRT)
///
/// Both half exponentiations always run, and the recombination adds p before
/// subtracting so there is no branch on m1 < m2.
fn decrypt_crt(c: &RsaBigInt, key: &RsaPrivateKey) -> RsaResult<RsaBigInt> {
    let (p, q) = (key.p(), key.q());

    // m1 = c^d_p mod p
    let mut m1 = c.mod_pow(key.d_p(), p)?;

    // m2 = c^d_q mod q
    let mut m2 = c.mod_pow(key.d_q(), q)?;

    // h = (m1 - m2) * q_inv mod p
    let mut diff = (&m1 + p).checked_sub(&m2.mod_reduce(p)?)?;
    let mut h = diff.mod_mul(key.q_inv(), p)?;

    // m = m2 + q * h, already below n
    let m = &m2 + &(q * &h);

    m1.zeroize();
    m2.zeroize();
    diff.zeroize();
    h.zeroize();
    Ok(m)
}

/// Decrypt ciphertext to a string
pub fn decrypt_to_string(ciphertext: &[u8], private_key: &RsaPrivateKey) -> anyhow::Result<String> {
    let plaintext = decrypt(ciphertext, private_key)?;
    Ok(String::from_utf8(plaintext)?)
}
