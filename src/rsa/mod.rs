// RSA Module - Main module file
// Exports all RSA-related functionality

pub mod bigint;
pub mod decrypt;
pub mod encrypt;
pub mod error;
pub mod keygen;
mod limb;
pub mod padding;
pub mod prime;

#[cfg(test)]
mod testing;

pub use bigint::RsaBigInt;
pub use decrypt::{decrypt, decrypt_to_string, decrypt_with};
pub use encrypt::{encrypt, encrypt_string, encrypt_with};
pub use error::{RsaError, RsaResult};
pub use keygen::{
    generate_keypair, KeyGenConfig, KeyGenerator, PublicKeyParts, RsaKeyPair, RsaPrivateKey,
    RsaPublicKey, MIN_KEY_BITS, RECOMMENDED_KEY_BITS, RSA_PUBLIC_EXPONENT,
};
pub use padding::{mgf1, Oaep};
pub use prime::{is_probable_prime, PrimalityTester, DEFAULT_ROUNDS};
