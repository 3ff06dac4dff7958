// OAEP Padding
// EME-OAEP encoding and decoding with MGF1, RFC 8017 section 7.1

use super::bigint::fill_random;
use super::error::{RsaError, RsaResult};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use std::fmt;
use std::marker::PhantomData;
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};
use zeroize::Zeroize;

/// MGF1: XOR `out` with Hash(seed || counter) blocks, counter from 0
pub fn mgf1_xor<M: Digest>(out: &mut [u8], seed: &[u8]) {
    let mut counter = 0u32;
    for chunk in out.chunks_mut(<M as Digest>::output_size()) {
        let mut hasher = M::new();
        hasher.update(seed);
        hasher.update(counter.to_be_bytes());
        let digest = hasher.finalize();
        chunk.iter_mut().zip(digest.iter()).for_each(|(a, b)| *a ^= b);
        counter += 1;
    }
}

/// MGF1 mask of `len` bytes
pub fn mgf1<M: Digest>(seed: &[u8], len: usize) -> Vec<u8> {
    let mut mask = vec![0u8; len];
    mgf1_xor::<M>(&mut mask, seed);
    mask
}

/// OAEP parameters: label hash `H`, mask generation hash `M`, and the label
///
/// The encoded block is `0x00 || maskedSeed || maskedDB` where
/// `DB = Hash(label) || 0x00.. || 0x01 || message`.
pub struct Oaep<H = Sha256, M = H> {
    label: Vec<u8>,
    _hash: PhantomData<fn() -> (H, M)>,
}

impl<H: Digest, M: Digest> Oaep<H, M> {
    /// OAEP with an empty label
    pub fn new() -> Self {
        Self::with_label(Vec::new())
    }

    pub fn with_label(label: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            _hash: PhantomData,
        }
    }

    pub fn label(&self) -> &[u8] {
        &self.label
    }

    pub fn hash_len() -> usize {
        <H as Digest>::output_size()
    }

    /// Longest message that fits a `key_len`-byte modulus, k - 2*hLen - 2
    pub fn max_message_len(&self, key_len: usize) -> usize {
        key_len.saturating_sub(2 * Self::hash_len() + 2)
    }

    /// Encode `message` into a block of exactly `key_len` bytes
    pub fn pad<R: RngCore + CryptoRng>(
        &self,
        message: &[u8],
        key_len: usize,
        rng: &mut R,
    ) -> RsaResult<Vec<u8>> {
        let h_len = Self::hash_len();
        let max = self.max_message_len(key_len);
        if key_len < 2 * h_len + 2 || message.len() > max {
            return Err(RsaError::MessageTooLong {
                max,
                actual: message.len(),
            });
        }

        let mut em = vec![0u8; key_len];
        let (seed, db) = em[1..].split_at_mut(h_len);
        fill_random(rng, seed)?;

        // DB = lHash || PS || 0x01 || M
        let db_len = db.len();
        db[..h_len].copy_from_slice(&H::digest(&self.label));
        db[db_len - message.len() - 1] = 0x01;
        db[db_len - message.len()..].copy_from_slice(message);

        mgf1_xor::<M>(db, seed);
        mgf1_xor::<M>(seed, db);
        Ok(em)
    }

    /// Decode a `key_len`-byte block.
    ///
    /// The leading zero, the label hash and the separator are checked without
    /// data-dependent branches, and every failure is the same
    /// `DecryptionFailed`.
    pub fn unpad(&self, encoded: &[u8], key_len: usize) -> RsaResult<Vec<u8>> {
        let h_len = Self::hash_len();
        if key_len < 2 * h_len + 2 || encoded.len() != key_len {
            return Err(RsaError::DecryptionFailed);
        }

        let mut em = encoded.to_vec();
        let leading_zero = em[0].ct_eq(&0);
        let (seed, db) = em[1..].split_at_mut(h_len);
        mgf1_xor::<M>(seed, db);
        mgf1_xor::<M>(db, seed);

        let label_hash = H::digest(&self.label);
        let hash_ok = db[..h_len].ct_eq(label_hash.as_slice());

        // Scan PS || 0x01 || M for the first non-zero byte
        let mut looking = Choice::from(1);
        let mut bad_byte = Choice::from(0);
        let mut separator = 0u32;
        for (i, b) in db.iter().enumerate().skip(h_len) {
            let is_zero = b.ct_eq(&0);
            let is_one = b.ct_eq(&1);
            separator.conditional_assign(&(i as u32), looking & is_one);
            bad_byte |= looking & !is_zero & !is_one;
            looking &= is_zero;
        }

        let valid = leading_zero & hash_ok & !looking & !bad_byte;
        let result = if bool::from(valid) {
            Ok(db[separator as usize + 1..].to_vec())
        } else {
            Err(RsaError::DecryptionFailed)
        };
        em.zeroize();
        result
    }
}

impl<H: Digest, M: Digest> Default for Oaep<H, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H, M> Clone for Oaep<H, M> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            _hash: PhantomData,
        }
    }
}

impl<H, M> fmt::Debug for Oaep<H, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Oaep")
            .field("label", &hex::encode(&self.label))
            .finish()
    }
}
