// Configuration
// JSON settings for key generation and OAEP parameters

use crate::rsa::{
    decrypt_with, encrypt_with, KeyGenConfig, Oaep, RsaError, RsaPrivateKey, RsaPublicKey,
    RsaResult, DEFAULT_ROUNDS, MIN_KEY_BITS, RECOMMENDED_KEY_BITS, RSA_PUBLIC_EXPONENT,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Rsa(#[from] RsaError),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Digest used for both the OAEP label hash and MGF1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn output_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Longest message this hash leaves room for under a `key_len`-byte modulus
    pub fn max_message_len(self, key_len: usize) -> usize {
        key_len.saturating_sub(2 * self.output_len() + 2)
    }

    pub fn encrypt<R: RngCore + CryptoRng>(
        self,
        label: &[u8],
        message: &[u8],
        public_key: &RsaPublicKey,
        rng: &mut R,
    ) -> RsaResult<Vec<u8>> {
        match self {
            HashAlgorithm::Sha256 => {
                encrypt_with(&Oaep::<Sha256>::with_label(label), message, public_key, rng)
            }
            HashAlgorithm::Sha384 => {
                encrypt_with(&Oaep::<Sha384>::with_label(label), message, public_key, rng)
            }
            HashAlgorithm::Sha512 => {
                encrypt_with(&Oaep::<Sha512>::with_label(label), message, public_key, rng)
            }
        }
    }

    pub fn decrypt(
        self,
        label: &[u8],
        ciphertext: &[u8],
        private_key: &RsaPrivateKey,
    ) -> RsaResult<Vec<u8>> {
        match self {
            HashAlgorithm::Sha256 => {
                decrypt_with(&Oaep::<Sha256>::with_label(label), ciphertext, private_key)
            }
            HashAlgorithm::Sha384 => {
                decrypt_with(&Oaep::<Sha384>::with_label(label), ciphertext, private_key)
            }
            HashAlgorithm::Sha512 => {
                decrypt_with(&Oaep::<Sha512>::with_label(label), ciphertext, private_key)
            }
        }
    }
}

/// Settings read from a JSON file; missing fields take their defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RsaConfig {
    pub key_bits: usize,
    pub public_exponent: u64,
    pub miller_rabin_rounds: usize,
    pub max_prime_candidates: usize,
    pub max_pair_attempts: usize,
    pub hash: HashAlgorithm,
    pub label: String,
}

impl Default for RsaConfig {
    fn default() -> Self {
        let keygen = KeyGenConfig::default();
        Self {
            key_bits: RECOMMENDED_KEY_BITS,
            public_exponent: RSA_PUBLIC_EXPONENT,
            miller_rabin_rounds: DEFAULT_ROUNDS,
            max_prime_candidates: keygen.max_prime_candidates,
            max_pair_attempts: keygen.max_pair_attempts,
            hash: HashAlgorithm::default(),
            label: String::new(),
        }
    }
}

impl RsaConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: RsaConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_bits < MIN_KEY_BITS || self.key_bits % 2 != 0 {
            return Err(RsaError::InvalidKeySize {
                bits: self.key_bits,
                min: MIN_KEY_BITS,
            }
            .into());
        }
        if self.public_exponent < 3 || self.public_exponent % 2 == 0 {
            return Err(RsaError::InvalidPublicExponent.into());
        }
        if self.miller_rabin_rounds == 0 {
            return Err(ConfigError::Invalid("miller_rabin_rounds must be positive"));
        }
        if self.max_prime_candidates == 0 || self.max_pair_attempts == 0 {
            return Err(ConfigError::Invalid("retry budgets must be positive"));
        }
        // the hash must leave room for at least an empty message
        if self.hash.output_len() * 2 + 2 > self.key_bits / 8 {
            return Err(ConfigError::Invalid("hash output too large for the key size"));
        }
        Ok(())
    }

    pub fn keygen(&self) -> KeyGenConfig {
        KeyGenConfig {
            public_exponent: self.public_exponent,
            primality_rounds: self.miller_rabin_rounds,
            max_prime_candidates: self.max_prime_candidates,
            max_pair_attempts: self.max_pair_attempts,
        }
    }

    pub fn label(&self) -> &[u8] {
        self.label.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::KeyGenerator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_defaults() {
        let config = RsaConfig::from_json("{}").unwrap();
        assert_eq!(config, RsaConfig::default());
        assert_eq!(config.key_bits, 2048);
        assert_eq!(config.public_exponent, 65537);
        assert_eq!(config.miller_rabin_rounds, 40);
        assert_eq!(config.hash, HashAlgorithm::Sha256);
        assert_eq!(config.keygen(), KeyGenConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = RsaConfig::from_json(
            r#"{ "key_bits": 1024, "hash": "sha384", "label": "backup", "miller_rabin_rounds": 20 }"#,
        )
        .unwrap();
        assert_eq!(config.key_bits, 1024);
        assert_eq!(config.hash, HashAlgorithm::Sha384);
        assert_eq!(config.label(), b"backup");
        assert_eq!(config.keygen().primality_rounds, 20);
        assert_eq!(config.public_exponent, RSA_PUBLIC_EXPONENT);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            RsaConfig::from_json(r#"{ "key_bits": 1000 + 1 }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            RsaConfig::from_json(r#"{ "key_bits": 1023 }"#),
            Err(ConfigError::Rsa(RsaError::InvalidKeySize { .. }))
        ));
        assert!(matches!(
            RsaConfig::from_json(r#"{ "public_exponent": 4 }"#),
            Err(ConfigError::Rsa(RsaError::InvalidPublicExponent))
        ));
        assert!(matches!(
            RsaConfig::from_json(r#"{ "miller_rabin_rounds": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RsaConfig::from_json(r#"{ "key_bits": 512, "hash": "sha512" }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RsaConfig::from_json(r#"{ "hash": "md5" }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            RsaConfig::from_json(r#"{ "bits": 2048 }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("rsa_oaep_config_{}.json", std::process::id()));
        fs::write(&path, r#"{ "key_bits": 3072 }"#).unwrap();
        let config = RsaConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.key_bits, 3072);

        assert!(matches!(
            RsaConfig::load(&path),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_hash_dispatch_roundtrip() {
        let mut rng = StdRng::seed_from_u64(21);
        let keypair = KeyGenerator::default().generate(1024, &mut rng).unwrap();
        for hash in [HashAlgorithm::Sha256, HashAlgorithm::Sha384] {
            let max = hash.max_message_len(128);
            let message = vec![0x5au8; max];
            let ciphertext = hash
                .encrypt(b"tag", &message, &keypair.public_key, &mut rng)
                .unwrap();
            assert_eq!(hash.decrypt(b"tag", &ciphertext, &keypair.private_key).unwrap(), message);
        }
        // SHA-512 needs 130 bytes of overhead, more than a 1024-bit modulus has
        assert!(matches!(
            HashAlgorithm::Sha512.encrypt(b"", b"", &keypair.public_key, &mut rng),
            Err(RsaError::MessageTooLong { .. })
        ));
    }
}
