// RSA Key Generation
// Implements RSA key pair generation (public and private keys)

use super::bigint::RsaBigInt;
use super::error::{RsaError, RsaResult};
use super::prime::{PrimalityTester, DEFAULT_ROUNDS};
use log::{debug, error, info, warn};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::fmt;
use zeroize::Zeroize;

/// F4, the conventional public exponent
pub const RSA_PUBLIC_EXPONENT: u64 = 65537;

/// Smallest modulus the generator accepts. Kept for interoperability and tests;
/// 512- and 1024-bit keys are breakable today.
pub const MIN_KEY_BITS: usize = 512;

/// Smallest modulus considered secure
pub const RECOMMENDED_KEY_BITS: usize = 2048;

/// Accessors shared by public and private keys
pub trait PublicKeyParts {
    /// Modulus
    fn n(&self) -> &RsaBigInt;

    /// Public exponent
    fn e(&self) -> &RsaBigInt;

    /// Modulus length in bytes, the size of every ciphertext
    fn size(&self) -> usize {
        self.n().byte_length()
    }

    fn bit_length(&self) -> usize {
        self.n().bit_length()
    }

    fn n_bytes(&self) -> Vec<u8> {
        self.n().to_bytes_be(0)
    }

    fn e_bytes(&self) -> Vec<u8> {
        self.e().to_bytes_be(0)
    }
}

/// RSA Public Key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    n: RsaBigInt, // Modulus
    e: RsaBigInt, // Public exponent
}

/// RSA Private Key
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPrivateKey {
    public_key: RsaPublicKey,
    d: RsaBigInt, // Private exponent
    p: RsaBigInt, // First prime factor
    q: RsaBigInt, // Second prime factor
    // Pre-computed values for faster decryption
    d_p: RsaBigInt,   // d mod (p-1)
    d_q: RsaBigInt,   // d mod (q-1)
    q_inv: RsaBigInt, // q^(-1) mod p
}

/// RSA Key Pair (both public and private keys)
#[derive(Debug, Clone)]
pub struct RsaKeyPair {
    pub public_key: RsaPublicKey,
    pub private_key: RsaPrivateKey,
    pub bit_length: usize,
}

impl RsaPublicKey {
    /// Checks the modulus is odd and the exponent is an odd value in [3, n)
    pub fn new(n: RsaBigInt, e: RsaBigInt) -> RsaResult<Self> {
        if n.is_even() || n.bit_length() < 2 {
            return Err(RsaError::InvalidKey("modulus must be odd and greater than one"));
        }
        if e.is_even() || e < RsaBigInt::from_u64(3) || e >= n {
            return Err(RsaError::InvalidPublicExponent);
        }
        Ok(Self { n, e })
    }

    /// Encrypt a message with OAEP (SHA-256, empty label)
    pub fn encrypt(&self, plaintext: &[u8]) -> RsaResult<Vec<u8>> {
        super::encrypt::encrypt(plaintext, self)
    }
}

impl PublicKeyParts for RsaPublicKey {
    fn n(&self) -> &RsaBigInt {
        &self.n
    }

    fn e(&self) -> &RsaBigInt {
        &self.e
    }
}

impl RsaPrivateKey {
    /// Rebuild a private key from its components, recomputing the CRT values.
    ///
    /// Fails with `InvalidKey` unless n = p*q, p != q and e*d ≡ 1 mod λ(n).
    pub fn from_components(
        n: RsaBigInt,
        e: RsaBigInt,
        d: RsaBigInt,
        p: RsaBigInt,
        q: RsaBigInt,
    ) -> RsaResult<Self> {
        let public_key = RsaPublicKey::new(n, e)?;
        if p == q || p.bit_length() < 2 || q.bit_length() < 2 {
            return Err(RsaError::InvalidKey("prime factors must be distinct and greater than one"));
        }
        if &p * &q != public_key.n {
            return Err(RsaError::InvalidKey("modulus is not the product of the prime factors"));
        }
        let lambda = carmichael_lambda(&p, &q)?;
        if !public_key.e.mod_mul(&d, &lambda)?.is_one() {
            return Err(RsaError::InvalidKey("private exponent does not invert the public exponent"));
        }
        Self::from_primes(public_key, d, p, q)
    }

    fn from_primes(public_key: RsaPublicKey, d: RsaBigInt, p: RsaBigInt, q: RsaBigInt) -> RsaResult<Self> {
        let one = RsaBigInt::one();
        let d_p = d.mod_reduce(&p.checked_sub(&one)?)?;
        let d_q = d.mod_reduce(&q.checked_sub(&one)?)?;
        let q_inv = q.mod_inverse(&p)?;
        Ok(Self {
            public_key,
            d,
            p,
            q,
            d_p,
            d_q,
            q_inv,
        })
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn d(&self) -> &RsaBigInt {
        &self.d
    }

    pub fn p(&self) -> &RsaBigInt {
        &self.p
    }

    pub fn q(&self) -> &RsaBigInt {
        &self.q
    }

    pub fn d_p(&self) -> &RsaBigInt {
        &self.d_p
    }

    pub fn d_q(&self) -> &RsaBigInt {
        &self.d_q
    }

    pub fn q_inv(&self) -> &RsaBigInt {
        &self.q_inv
    }

    pub fn d_bytes(&self) -> Vec<u8> {
        self.d.to_bytes_be(0)
    }

    pub fn p_bytes(&self) -> Vec<u8> {
        self.p.to_bytes_be(0)
    }

    pub fn q_bytes(&self) -> Vec<u8> {
        self.q.to_bytes_be(0)
    }

    /// Decrypt an OAEP (SHA-256, empty label) ciphertext
    pub fn decrypt(&self, ciphertext: &[u8]) -> RsaResult<Vec<u8>> {
        super::decrypt::decrypt(ciphertext, self)
    }
}

impl PublicKeyParts for RsaPrivateKey {
    fn n(&self) -> &RsaBigInt {
        &self.public_key.n
    }

    fn e(&self) -> &RsaBigInt {
        &self.public_key.e
    }
}

impl fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl Zeroize for RsaPrivateKey {
    fn zeroize(&mut self) {
        self.d.zeroize();
        self.p.zeroize();
        self.q.zeroize();
        self.d_p.zeroize();
        self.d_q.zeroize();
        self.q_inv.zeroize();
    }
}

impl Drop for RsaPrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl RsaKeyPair {
    /// Get the bit length of the key
    pub fn bit_length(&self) -> usize {
        self.bit_length
    }
}

/// λ(n) = lcm(p-1, q-1)
fn carmichael_lambda(p: &RsaBigInt, q: &RsaBigInt) -> RsaResult<RsaBigInt> {
    let one = RsaBigInt::one();
    Ok(p.checked_sub(&one)?.lcm(&q.checked_sub(&one)?))
}

/// True when |p - q| <= 2^(half_bits - 100), which includes p == q
fn primes_too_close(p: &RsaBigInt, q: &RsaBigInt, half_bits: usize) -> bool {
    let (high, low) = if p >= q { (p, q) } else { (q, p) };
    let min_distance = RsaBigInt::one().shl_bits(half_bits.saturating_sub(100));
    high.checked_sub(low).map_or(true, |distance| distance <= min_distance)
}

/// Knobs for key generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyGenConfig {
    pub public_exponent: u64,
    pub primality_rounds: usize,
    /// Upper bound on prime candidates sampled across one generation
    pub max_prime_candidates: usize,
    /// Upper bound on (p, q) pairs tried before giving up
    pub max_pair_attempts: usize,
}

impl Default for KeyGenConfig {
    fn default() -> Self {
        Self {
            public_exponent: RSA_PUBLIC_EXPONENT,
            primality_rounds: DEFAULT_ROUNDS,
            max_prime_candidates: 100_000,
            max_pair_attempts: 64,
        }
    }
}

/// Produces RSA key pairs from a secure random source
#[derive(Debug, Clone, Default)]
pub struct KeyGenerator {
    config: KeyGenConfig,
}

impl KeyGenerator {
    pub fn new(config: KeyGenConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KeyGenConfig {
        &self.config
    }

    /// Generate a key pair whose modulus has exactly `bit_length` bits.
    ///
    /// `bit_length` must be even and at least 512; 2048 or more is
    /// recommended.
    pub fn generate<R: RngCore + CryptoRng>(
        &self,
        bit_length: usize,
        rng: &mut R,
    ) -> RsaResult<RsaKeyPair> {
        if bit_length < MIN_KEY_BITS || bit_length % 2 != 0 {
            return Err(RsaError::InvalidKeySize {
                bits: bit_length,
                min: MIN_KEY_BITS,
            });
        }
        let e_value = self.config.public_exponent;
        if e_value < 3 || e_value % 2 == 0 {
            return Err(RsaError::InvalidPublicExponent);
        }
        if bit_length < RECOMMENDED_KEY_BITS {
            warn!(
                "generating a {}-bit RSA key, below the recommended {} bits",
                bit_length, RECOMMENDED_KEY_BITS
            );
        }

        let e = RsaBigInt::from_u64(e_value);
        let half_bits = bit_length / 2;
        let mut candidates = 0;

        for attempt in 1..=self.config.max_pair_attempts {
            // Step 1: Generate two random primes p and q
            let p = self.random_prime(half_bits, rng, &mut candidates)?;
            let q = self.random_prime(half_bits, rng, &mut candidates)?;

            if primes_too_close(&p, &q, half_bits) {
                debug!("attempt {}: primes too close, resampling", attempt);
                continue;
            }

            // Ensure p > q (for q_inv calculation)
            let (p, q) = if p < q { (q, p) } else { (p, q) };

            // Step 2: Compute n = p * q
            let n = &p * &q;
            debug_assert_eq!(n.bit_length(), bit_length);

            // Step 3: Compute λ(n) = lcm(p-1, q-1), e must be coprime to it
            let lambda = carmichael_lambda(&p, &q)?;
            if !e.gcd(&lambda).is_one() {
                debug!("attempt {}: e shares a factor with λ(n), resampling", attempt);
                continue;
            }

            // Step 4: Compute d = e^(-1) mod λ(n)
            let d = match e.mod_inverse(&lambda) {
                Ok(d) => d,
                Err(err) => {
                    error!("modular inverse failed although gcd(e, λ) = 1: {}", err);
                    return Err(err);
                }
            };

            let public_key = RsaPublicKey::new(n, e.clone())?;
            let private_key = RsaPrivateKey::from_primes(public_key.clone(), d, p, q)?;
            info!(
                "generated {}-bit RSA key after {} attempt(s), {} prime candidates",
                bit_length, attempt, candidates
            );

            return Ok(RsaKeyPair {
                public_key,
                private_key,
                bit_length,
            });
        }

        Err(RsaError::GenerationFailed {
            attempts: self.config.max_pair_attempts,
        })
    }

    /// Random prime with its top two bits set, so the product of two such
    /// primes has exactly twice as many bits.
    fn random_prime<R: RngCore + CryptoRng>(
        &self,
        bits: usize,
        rng: &mut R,
        candidates: &mut usize,
    ) -> RsaResult<RsaBigInt> {
        let tester = PrimalityTester::new(self.config.primality_rounds);
        let second_bit = RsaBigInt::one().shl_bits(bits - 2);

        while *candidates < self.config.max_prime_candidates {
            *candidates += 1;
            let mut candidate = RsaBigInt::random_odd_bits(bits, rng)?;
            if !candidate.bit(bits - 2) {
                candidate = &candidate + &second_bit;
            }
            if tester.is_probable_prime(&candidate, rng)? {
                return Ok(candidate);
            }
        }

        Err(RsaError::GenerationFailed {
            attempts: *candidates,
        })
    }
}

/// Generate RSA key pair with the default settings from the OS random source
pub fn generate_keypair(bit_length: usize) -> RsaResult<RsaKeyPair> {
    KeyGenerator::default().generate(bit_length, &mut OsRng)
}
