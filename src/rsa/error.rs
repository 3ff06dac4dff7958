// RSA Errors

use thiserror::Error;

/// Errors raised by the RSA core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RsaError {
    #[error("invalid key size {bits}: must be even and at least {min} bits")]
    InvalidKeySize { bits: usize, min: usize },

    #[error("public exponent must be odd and at least 3")]
    InvalidPublicExponent,

    #[error("key generation gave up after {attempts} attempts")]
    GenerationFailed { attempts: usize },

    #[error("message too long: max {max} bytes, got {actual}")]
    MessageTooLong { max: usize, actual: usize },

    #[error("invalid ciphertext length: expected {expected} bytes, got {actual}")]
    InvalidCiphertextLength { expected: usize, actual: usize },

    /// Deliberately carries no detail about which check failed
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("value is not invertible for the given modulus")]
    NotInvertible,

    #[error("subtraction underflow")]
    Underflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("secure random source unavailable: {0}")]
    RngUnavailable(String),

    #[error("invalid key: {0}")]
    InvalidKey(&'static str),
}

pub type RsaResult<T> = Result<T, RsaError>;
