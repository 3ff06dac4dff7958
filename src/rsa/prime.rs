// Primality Testing
// Trial division by small primes followed by Miller-Rabin

use super::bigint::{Montgomery, RsaBigInt};
use super::error::RsaResult;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::sync::OnceLock;

/// Miller-Rabin rounds used when none are configured.
///
/// Each round lets an odd composite through with probability at most 1/4,
/// so 40 rounds bound the false-positive rate by 4^-40 = 2^-80.
pub const DEFAULT_ROUNDS: usize = 40;

/// Trial division covers every prime below this bound
const SIEVE_BOUND: u64 = 2000;

/// Primes below `SIEVE_BOUND`, sieve of Eratosthenes
fn small_primes() -> &'static [u64] {
    static PRIMES: OnceLock<Vec<u64>> = OnceLock::new();
    PRIMES.get_or_init(|| {
        let mut composite = vec![false; SIEVE_BOUND as usize];
        let mut primes = Vec::new();
        for i in 2..SIEVE_BOUND as usize {
            if composite[i] {
                continue;
            }
            primes.push(i as u64);
            for j in (i * i..SIEVE_BOUND as usize).step_by(i) {
                composite[j] = true;
            }
        }
        primes
    })
}

/// Probabilistic primality test with a configurable round count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimalityTester {
    rounds: usize,
}

impl Default for PrimalityTester {
    fn default() -> Self {
        Self::new(DEFAULT_ROUNDS)
    }
}

impl PrimalityTester {
    pub fn new(rounds: usize) -> Self {
        Self {
            rounds: rounds.max(1),
        }
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Returns true if `candidate` is probably prime.
    ///
    /// Values below 2000^2 are decided exactly by trial division; larger
    /// values that survive it go through `rounds` Miller-Rabin rounds with
    /// random witnesses drawn from `rng`.
    pub fn is_probable_prime<R: RngCore + CryptoRng>(
        &self,
        candidate: &RsaBigInt,
        rng: &mut R,
    ) -> RsaResult<bool> {
        let primes = small_primes();
        if let Some(small) = candidate.to_u64() {
            if small < SIEVE_BOUND {
                return Ok(primes.binary_search(&small).is_ok());
            }
        }

        for &p in primes {
            if candidate.rem_u64(p)? == 0 {
                return Ok(false);
            }
        }
        if candidate.to_u64().map_or(false, |c| c < SIEVE_BOUND * SIEVE_BOUND) {
            return Ok(true);
        }

        miller_rabin(candidate, self.rounds, rng)
    }
}

/// Miller-Rabin test using the OS random source for witnesses
pub fn is_probable_prime(candidate: &RsaBigInt, rounds: usize) -> RsaResult<bool> {
    PrimalityTester::new(rounds).is_probable_prime(candidate, &mut OsRng)
}

// n must be odd and greater than 3
fn miller_rabin<R: RngCore + CryptoRng>(
    n: &RsaBigInt,
    rounds: usize,
    rng: &mut R,
) -> RsaResult<bool> {
    // Write n-1 as d * 2^s with d odd
    let n_minus_one = n.checked_sub(&RsaBigInt::one())?;
    let s = (0..n_minus_one.bit_length())
        .take_while(|&i| !n_minus_one.bit(i))
        .count();
    let d = n_minus_one.shr_bits(s);

    let ctx = Montgomery::new(n);
    let minus_one = ctx.to_mont(&n_minus_one);
    // witnesses are drawn from [2, n-2]
    let witness_span = n.checked_sub(&RsaBigInt::from_u64(3))?;
    let two = RsaBigInt::from_u64(2);

    for _ in 0..rounds {
        let a = &RsaBigInt::random_below(&witness_span, rng)? + &two;
        let mut x = ctx.pow(&ctx.to_mont(&a), &d);
        if x.as_slice() == ctx.one() || x == minus_one {
            continue;
        }

        let mut composite = true;
        for _ in 1..s {
            x = ctx.mul(&x, &x);
            if x == minus_one {
                composite = false;
                break;
            }
        }
        if composite {
            return Ok(false);
        }
    }

    Ok(true)
}
