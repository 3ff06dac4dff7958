// RSA Big Integer Operations
// Arbitrary-precision unsigned integer with the modular arithmetic RSA needs

use super::error::RsaError;
use super::limb::{
    adc, conditional_assign, mac, montgomery_n0_inv, mont_mul, mul_accumulate, sbb, sub_assign,
    Limb, LIMB_BITS,
};
use rand::{CryptoRng, RngCore};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul};
use subtle::Choice;
use zeroize::Zeroize;

/// Non-negative integer of arbitrary size
///
/// Stored as little-endian 64-bit limbs with no trailing zero limb; zero is
/// the empty limb vector. Every operation returns a fresh value.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct RsaBigInt {
    limbs: Vec<Limb>,
}

/// Fill `buf` from a cryptographically secure source, never falling back
pub(crate) fn fill_random<R: RngCore + CryptoRng>(
    rng: &mut R,
    buf: &mut [u8],
) -> Result<(), RsaError> {
    rng.try_fill_bytes(buf)
        .map_err(|e| RsaError::RngUnavailable(e.to_string()))
}

impl RsaBigInt {
    pub fn zero() -> Self {
        Self { limbs: Vec::new() }
    }

    pub fn one() -> Self {
        Self::from_u64(1)
    }

    pub fn from_u64(n: u64) -> Self {
        Self::from_limbs(vec![n])
    }

    pub(crate) fn from_limbs(mut limbs: Vec<Limb>) -> Self {
        while limbs.last() == Some(&0) {
            limbs.pop();
        }
        Self { limbs }
    }

    #[cfg(test)]
    pub(crate) fn limbs(&self) -> &[Limb] {
        &self.limbs
    }

    /// Limbs zero-extended to `width`
    fn limbs_padded(&self, width: usize) -> Vec<Limb> {
        let mut out = self.limbs.clone();
        out.resize(width.max(out.len()), 0);
        out
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.is_empty()
    }

    pub fn is_one(&self) -> bool {
        self.limbs.len() == 1 && self.limbs[0] == 1
    }

    pub fn is_odd(&self) -> bool {
        self.limbs.first().map_or(false, |l| l & 1 == 1)
    }

    pub fn is_even(&self) -> bool {
        !self.is_odd()
    }

    /// Number of significant bits, 0 for zero
    pub fn bit_length(&self) -> usize {
        match self.limbs.last() {
            Some(top) => {
                (self.limbs.len() - 1) * LIMB_BITS + LIMB_BITS - top.leading_zeros() as usize
            }
            None => 0,
        }
    }

    /// Number of bytes needed for the big-endian encoding
    pub fn byte_length(&self) -> usize {
        (self.bit_length() + 7) / 8
    }

    pub fn bit(&self, i: usize) -> bool {
        self.limbs
            .get(i / LIMB_BITS)
            .map_or(false, |l| (l >> (i % LIMB_BITS)) & 1 == 1)
    }

    pub fn to_u64(&self) -> Option<u64> {
        match self.limbs.len() {
            0 => Some(0),
            1 => Some(self.limbs[0]),
            _ => None,
        }
    }

    /// Create a big integer from bytes (big-endian)
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        let mut limbs = Vec::with_capacity(bytes.len() / 8 + 1);
        for chunk in bytes.rchunks(8) {
            let limb = chunk.iter().fold(0 as Limb, |acc, &b| (acc << 8) | b as Limb);
            limbs.push(limb);
        }
        Self::from_limbs(limbs)
    }

    /// Big-endian bytes, left-padded with zeros to at least `min_len`
    pub fn to_bytes_be(&self, min_len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.limbs.len() * 8);
        for limb in self.limbs.iter().rev() {
            out.extend_from_slice(&limb.to_be_bytes());
        }
        let first = out.iter().position(|&b| b != 0).unwrap_or(out.len());
        out.drain(..first);
        if out.len() < min_len {
            let mut padded = vec![0u8; min_len - out.len()];
            padded.extend_from_slice(&out);
            out.zeroize();
            out = padded;
        }
        out
    }

    pub fn checked_sub(&self, other: &RsaBigInt) -> Result<RsaBigInt, RsaError> {
        if self < other {
            return Err(RsaError::Underflow);
        }
        let mut limbs = self.limbs.clone();
        let borrow = sub_assign(&mut limbs, &other.limbs);
        debug_assert_eq!(borrow, 0);
        Ok(Self::from_limbs(limbs))
    }

    pub fn shl_bits(&self, bits: usize) -> RsaBigInt {
        if self.is_zero() {
            return Self::zero();
        }
        let (whole, part) = (bits / LIMB_BITS, (bits % LIMB_BITS) as u32);
        let mut limbs = vec![0; whole];
        limbs.extend(shl_limbs(&self.limbs, part));
        Self::from_limbs(limbs)
    }

    pub fn shr_bits(&self, bits: usize) -> RsaBigInt {
        let (whole, part) = (bits / LIMB_BITS, (bits % LIMB_BITS) as u32);
        if whole >= self.limbs.len() {
            return Self::zero();
        }
        Self::from_limbs(shr_limbs(&self.limbs[whole..], part))
    }

    /// Quotient and remainder
    pub fn div_rem(&self, divisor: &RsaBigInt) -> Result<(RsaBigInt, RsaBigInt), RsaError> {
        if divisor.is_zero() {
            return Err(RsaError::DivisionByZero);
        }
        Ok(self.div_rem_nonzero(divisor))
    }

    /// Remainder modulo a single word, used by trial division
    pub fn rem_u64(&self, divisor: u64) -> Result<u64, RsaError> {
        if divisor == 0 {
            return Err(RsaError::DivisionByZero);
        }
        Ok(self.div_rem_limb(divisor).1)
    }

    fn div_rem_limb(&self, divisor: Limb) -> (RsaBigInt, Limb) {
        let mut q = vec![0; self.limbs.len()];
        let mut r: u128 = 0;
        for i in (0..self.limbs.len()).rev() {
            let cur = (r << LIMB_BITS) | self.limbs[i] as u128;
            q[i] = (cur / divisor as u128) as Limb;
            r = cur % divisor as u128;
        }
        (Self::from_limbs(q), r as Limb)
    }

    // Knuth, TAOCP vol. 2, 4.3.1 Algorithm D. divisor must be non-zero.
    fn div_rem_nonzero(&self, divisor: &RsaBigInt) -> (RsaBigInt, RsaBigInt) {
        if self < divisor {
            return (Self::zero(), self.clone());
        }
        if divisor.limbs.len() == 1 {
            let (q, r) = self.div_rem_limb(divisor.limbs[0]);
            return (q, Self::from_u64(r));
        }

        let n = divisor.limbs.len();
        let m = self.limbs.len() - n;
        let shift = divisor.limbs[n - 1].leading_zeros();
        let normalized = shl_limbs(&divisor.limbs, shift);
        let v = &normalized[..n];
        let mut u = shl_limbs(&self.limbs, shift);
        let mut q = vec![0 as Limb; m + 1];
        let base: u128 = 1 << LIMB_BITS;

        for j in (0..=m).rev() {
            let num = ((u[j + n] as u128) << LIMB_BITS) | u[j + n - 1] as u128;
            let mut qhat = num / v[n - 1] as u128;
            let mut rhat = num % v[n - 1] as u128;
            while qhat >= base
                || qhat * v[n - 2] as u128 > ((rhat << LIMB_BITS) | u[j + n - 2] as u128)
            {
                qhat -= 1;
                rhat += v[n - 1] as u128;
                if rhat >= base {
                    break;
                }
            }

            let (mut borrow, mut carry) = (0, 0);
            for i in 0..n {
                let (lo, hi) = mac(0, qhat as Limb, v[i], carry);
                carry = hi;
                let (d, br) = sbb(u[i + j], lo, borrow);
                u[i + j] = d;
                borrow = br;
            }
            let (d, borrow) = sbb(u[j + n], carry, borrow);
            u[j + n] = d;

            let mut qj = qhat as Limb;
            if borrow != 0 {
                // qhat was one too large, add the divisor back
                qj -= 1;
                let mut c = 0;
                for i in 0..n {
                    let (s, cc) = adc(u[i + j], v[i], c);
                    u[i + j] = s;
                    c = cc;
                }
                u[j + n] = u[j + n].wrapping_add(c);
            }
            q[j] = qj;
        }

        let r = shr_limbs(&u[..n], shift);
        u.zeroize();
        (Self::from_limbs(q), Self::from_limbs(r))
    }

    /// self mod modulus
    pub fn mod_reduce(&self, modulus: &RsaBigInt) -> Result<RsaBigInt, RsaError> {
        Ok(self.div_rem(modulus)?.1)
    }

    /// (self * other) mod modulus
    pub fn mod_mul(&self, other: &RsaBigInt, modulus: &RsaBigInt) -> Result<RsaBigInt, RsaError> {
        (self * other).mod_reduce(modulus)
    }

    /// Modular exponentiation: self^exponent mod modulus
    ///
    /// Square-and-multiply over every bit of the exponent's limbs. The
    /// multiply is always performed and its result kept through a
    /// constant-time select, so the sequence of operations does not depend
    /// on the exponent's bit pattern. Odd moduli use Montgomery reduction.
    pub fn mod_pow(&self, exponent: &RsaBigInt, modulus: &RsaBigInt) -> Result<RsaBigInt, RsaError> {
        if modulus.is_zero() {
            return Err(RsaError::DivisionByZero);
        }
        if modulus.is_one() {
            return Ok(Self::zero());
        }
        if modulus.is_odd() {
            let ctx = Montgomery::new(modulus);
            let base = ctx.to_mont(self);
            return Ok(ctx.from_mont(&ctx.pow(&base, exponent)));
        }

        let width = modulus.limbs.len();
        let base = self.mod_reduce(modulus)?;
        let mut acc = Self::one().limbs_padded(width);
        for i in (0..exponent.limbs.len() * LIMB_BITS).rev() {
            let current = Self::from_limbs(acc.clone());
            let squared = current.mod_mul(&current, modulus)?;
            let multiplied = squared.mod_mul(&base, modulus)?;
            acc = squared.limbs_padded(width);
            let bit = exponent.bit(i) as u8;
            conditional_assign(&mut acc, &multiplied.limbs_padded(width), Choice::from(bit));
        }
        Ok(Self::from_limbs(acc))
    }

    /// Modular inverse by the extended Euclidean algorithm
    ///
    /// Tracks only the coefficient of `self`; Bezout coefficients alternate in
    /// sign, so magnitudes are accumulated and the sign kept as a flag.
    pub fn mod_inverse(&self, modulus: &RsaBigInt) -> Result<RsaBigInt, RsaError> {
        if modulus.is_zero() {
            return Err(RsaError::NotInvertible);
        }
        let (mut r0, mut r1) = (modulus.clone(), self.mod_reduce(modulus)?);
        let (mut t0, mut t1) = (Self::zero(), Self::one());
        let (mut t0_neg, mut t1_neg) = (false, false);

        while !r1.is_zero() {
            let (q, r2) = r0.div_rem_nonzero(&r1);
            let t2 = &t0 + &(&q * &t1);
            r0 = std::mem::replace(&mut r1, r2);
            t0 = std::mem::replace(&mut t1, t2);
            let t2_neg = !t1_neg;
            t0_neg = std::mem::replace(&mut t1_neg, t2_neg);
        }

        if !r0.is_one() {
            return Err(RsaError::NotInvertible);
        }
        let t = t0.mod_reduce(modulus)?;
        if t0_neg && !t.is_zero() {
            modulus.checked_sub(&t)
        } else {
            Ok(t)
        }
    }

    pub fn gcd(&self, other: &RsaBigInt) -> RsaBigInt {
        let (mut a, mut b) = (self.clone(), other.clone());
        while !b.is_zero() {
            let r = a.div_rem_nonzero(&b).1;
            a = std::mem::replace(&mut b, r);
        }
        a
    }

    pub fn lcm(&self, other: &RsaBigInt) -> RsaBigInt {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        let g = self.gcd(other);
        &self.div_rem_nonzero(&g).0 * other
    }

    /// Uniformly random integer of exactly `bits` bits (top bit set)
    pub fn random_bits<R: RngCore + CryptoRng>(bits: usize, rng: &mut R) -> Result<RsaBigInt, RsaError> {
        Self::random_inner(bits, rng, true, false)
    }

    /// Random odd integer of exactly `bits` bits, a prime candidate
    pub fn random_odd_bits<R: RngCore + CryptoRng>(bits: usize, rng: &mut R) -> Result<RsaBigInt, RsaError> {
        Self::random_inner(bits, rng, true, true)
    }

    /// Uniformly random integer in [0, bound) by rejection sampling
    pub fn random_below<R: RngCore + CryptoRng>(bound: &RsaBigInt, rng: &mut R) -> Result<RsaBigInt, RsaError> {
        if bound.is_zero() {
            return Err(RsaError::DivisionByZero);
        }
        // Each draw is accepted with probability > 1/2
        for _ in 0..256 {
            let candidate = Self::random_inner(bound.bit_length(), rng, false, false)?;
            if &candidate < bound {
                return Ok(candidate);
            }
        }
        Err(RsaError::RngUnavailable(
            "rejection sampling never produced a value below the bound".to_string(),
        ))
    }

    fn random_inner<R: RngCore + CryptoRng>(
        bits: usize,
        rng: &mut R,
        force_top: bool,
        force_odd: bool,
    ) -> Result<RsaBigInt, RsaError> {
        if bits == 0 {
            return Ok(Self::zero());
        }
        let len = (bits + 7) / 8;
        let excess = len * 8 - bits;
        let mut buf = vec![0u8; len];
        fill_random(rng, &mut buf)?;

        buf[0] &= 0xff >> excess;
        if force_top {
            buf[0] |= 0x80 >> excess;
        }
        if force_odd {
            buf[len - 1] |= 1;
        }
        let value = Self::from_bytes_be(&buf);
        buf.zeroize();
        Ok(value)
    }
}

fn shl_limbs(a: &[Limb], shift: u32) -> Vec<Limb> {
    let mut out = vec![0; a.len() + 1];
    if shift == 0 {
        out[..a.len()].copy_from_slice(a);
        return out;
    }
    let mut carry = 0;
    for (i, &x) in a.iter().enumerate() {
        out[i] = (x << shift) | carry;
        carry = x >> (LIMB_BITS as u32 - shift);
    }
    out[a.len()] = carry;
    out
}

fn shr_limbs(a: &[Limb], shift: u32) -> Vec<Limb> {
    if shift == 0 {
        return a.to_vec();
    }
    (0..a.len())
        .map(|i| {
            let hi = a.get(i + 1).map_or(0, |&x| x << (LIMB_BITS as u32 - shift));
            (a[i] >> shift) | hi
        })
        .collect()
}

/// Montgomery arithmetic modulo a fixed odd modulus
pub(crate) struct Montgomery {
    modulus: RsaBigInt,
    n: Vec<Limb>,
    n0_inv: Limb,
    // R mod n
    one: Vec<Limb>,
    // R^2 mod n
    r2: Vec<Limb>,
}

impl Montgomery {
    /// `modulus` must be odd and greater than one
    pub(crate) fn new(modulus: &RsaBigInt) -> Self {
        debug_assert!(modulus.is_odd() && !modulus.is_one());
        let k = modulus.limbs.len();
        let r = RsaBigInt::one().shl_bits(k * LIMB_BITS);
        let one = r.div_rem_nonzero(modulus).1;
        let r2 = one.mod_mul_nonzero(&one, modulus);
        Self {
            modulus: modulus.clone(),
            n: modulus.limbs.clone(),
            n0_inv: montgomery_n0_inv(modulus.limbs[0]),
            one: one.limbs_padded(k),
            r2: r2.limbs_padded(k),
        }
    }

    pub(crate) fn to_mont(&self, x: &RsaBigInt) -> Vec<Limb> {
        let k = self.n.len();
        let reduced = x.div_rem_nonzero(&self.modulus).1;
        let mut out = vec![0; k];
        mont_mul(&mut out, &reduced.limbs_padded(k), &self.r2, &self.n, self.n0_inv);
        out
    }

    pub(crate) fn from_mont(&self, x: &[Limb]) -> RsaBigInt {
        let k = self.n.len();
        let mut unit = vec![0; k];
        unit[0] = 1;
        let mut out = vec![0; k];
        mont_mul(&mut out, x, &unit, &self.n, self.n0_inv);
        RsaBigInt::from_limbs(out)
    }

    pub(crate) fn one(&self) -> &[Limb] {
        &self.one
    }

    pub(crate) fn mul(&self, a: &[Limb], b: &[Limb]) -> Vec<Limb> {
        let mut out = vec![0; self.n.len()];
        mont_mul(&mut out, a, b, &self.n, self.n0_inv);
        out
    }

    /// base^exponent in the Montgomery domain, fixed operation sequence
    pub(crate) fn pow(&self, base: &[Limb], exponent: &RsaBigInt) -> Vec<Limb> {
        let k = self.n.len();
        let mut acc = self.one.clone();
        let mut squared = vec![0; k];
        let mut multiplied = vec![0; k];
        for i in (0..exponent.limbs.len() * LIMB_BITS).rev() {
            mont_mul(&mut squared, &acc, &acc, &self.n, self.n0_inv);
            mont_mul(&mut multiplied, &squared, base, &self.n, self.n0_inv);
            acc.copy_from_slice(&squared);
            let bit = ((exponent.limbs[i / LIMB_BITS] >> (i % LIMB_BITS)) & 1) as u8;
            conditional_assign(&mut acc, &multiplied, Choice::from(bit));
        }
        squared.zeroize();
        multiplied.zeroize();
        acc
    }
}

impl RsaBigInt {
    fn mod_mul_nonzero(&self, other: &RsaBigInt, modulus: &RsaBigInt) -> RsaBigInt {
        (self * other).div_rem_nonzero(modulus).1
    }
}

impl Ord for RsaBigInt {
    fn cmp(&self, other: &Self) -> Ordering {
        self.limbs
            .len()
            .cmp(&other.limbs.len())
            .then_with(|| self.limbs.iter().rev().cmp(other.limbs.iter().rev()))
    }
}

impl PartialOrd for RsaBigInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> Add<&'a RsaBigInt> for &'a RsaBigInt {
    type Output = RsaBigInt;

    fn add(self, rhs: &'a RsaBigInt) -> RsaBigInt {
        let (long, short) = if self.limbs.len() >= rhs.limbs.len() {
            (&self.limbs, &rhs.limbs)
        } else {
            (&rhs.limbs, &self.limbs)
        };
        let mut out = Vec::with_capacity(long.len() + 1);
        let mut carry = 0;
        for (i, &x) in long.iter().enumerate() {
            let (s, c) = adc(x, short.get(i).copied().unwrap_or(0), carry);
            out.push(s);
            carry = c;
        }
        out.push(carry);
        RsaBigInt::from_limbs(out)
    }
}

impl<'a> Mul<&'a RsaBigInt> for &'a RsaBigInt {
    type Output = RsaBigInt;

    fn mul(self, rhs: &'a RsaBigInt) -> RsaBigInt {
        if self.is_zero() || rhs.is_zero() {
            return RsaBigInt::zero();
        }
        let mut out = vec![0; self.limbs.len() + rhs.limbs.len()];
        mul_accumulate(&mut out, &self.limbs, &rhs.limbs);
        RsaBigInt::from_limbs(out)
    }
}

impl From<u64> for RsaBigInt {
    fn from(n: u64) -> Self {
        Self::from_u64(n)
    }
}

impl Zeroize for RsaBigInt {
    fn zeroize(&mut self) {
        self.limbs.zeroize();
    }
}

impl fmt::LowerHex for RsaBigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.pad_integral(true, "0x", "0");
        }
        let mut s = format!("{:x}", self.limbs[self.limbs.len() - 1]);
        for limb in self.limbs.iter().rev().skip(1) {
            s.push_str(&format!("{:016x}", limb));
        }
        f.pad_integral(true, "0x", &s)
    }
}

impl fmt::Display for RsaBigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const TEN_POW_19: Limb = 10_000_000_000_000_000_000;
        if self.is_zero() {
            return f.pad_integral(true, "", "0");
        }
        let mut chunks = Vec::new();
        let mut rest = self.clone();
        while !rest.is_zero() {
            let (q, r) = rest.div_rem_limb(TEN_POW_19);
            chunks.push(r);
            rest = q;
        }
        let mut s = chunks.pop().map(|c| c.to_string()).unwrap_or_default();
        for c in chunks.iter().rev() {
            s.push_str(&format!("{:019}", c));
        }
        f.pad_integral(true, "", &s)
    }
}

impl fmt::Debug for RsaBigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RsaBigInt({:#x})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::{BigUint, RandBigInt};
    use num_integer::Integer;
    use num_traits::{One, Zero};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn to_ref(x: &RsaBigInt) -> BigUint {
        BigUint::from_bytes_be(&x.to_bytes_be(0))
    }

    fn from_ref(x: &BigUint) -> RsaBigInt {
        RsaBigInt::from_bytes_be(&x.to_bytes_be())
    }

    fn random_pair(rng: &mut StdRng) -> (BigUint, BigUint) {
        let a_bits = rng.gen_range(1..700);
        let b_bits = rng.gen_range(1..700);
        (rng.gen_biguint(a_bits), rng.gen_biguint(b_bits))
    }

    #[test]
    fn test_canonical_form() {
        assert!(RsaBigInt::from_u64(0).is_zero());
        assert_eq!(RsaBigInt::from_bytes_be(&[0, 0, 0]), RsaBigInt::zero());
        assert_eq!(RsaBigInt::from_bytes_be(&[0, 0, 1]), RsaBigInt::one());
        assert_eq!(RsaBigInt::from_limbs(vec![5, 0, 0]).limbs(), &[5]);
        assert_eq!(RsaBigInt::zero().bit_length(), 0);
    }

    #[test]
    fn test_bytes_be() {
        let n = RsaBigInt::from_bytes_be(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);
        assert_eq!(n.limbs(), &[0x0203040506070809, 0x01]);
        assert_eq!(n.bit_length(), 65);
        assert_eq!(n.to_bytes_be(0), vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(n.to_bytes_be(12), vec![0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        // min_len never truncates
        assert_eq!(n.to_bytes_be(4).len(), 9);
        assert_eq!(RsaBigInt::zero().to_bytes_be(3), vec![0, 0, 0]);
    }

    #[test]
    fn test_arithmetic_matches_reference() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let (a, b) = random_pair(&mut rng);
            let (x, y) = (from_ref(&a), from_ref(&b));

            assert_eq!(to_ref(&(&x + &y)), &a + &b);
            assert_eq!(to_ref(&(&x * &y)), &a * &b);
            assert_eq!(x.cmp(&y), a.cmp(&b));
            if a >= b {
                assert_eq!(to_ref(&x.checked_sub(&y).unwrap()), &a - &b);
            } else {
                assert_eq!(x.checked_sub(&y), Err(RsaError::Underflow));
            }
            if !b.is_zero() {
                let (q, r) = x.div_rem(&y).unwrap();
                let (rq, rr) = a.div_rem(&b);
                assert_eq!(to_ref(&q), rq);
                assert_eq!(to_ref(&r), rr);
            }
            assert_eq!(to_ref(&x.gcd(&y)), a.gcd(&b));
        }
    }

    #[test]
    fn test_div_rem_add_back_case() {
        // Divisor with a top limb forcing qhat correction
        let a = BigUint::from_bytes_be(&[0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3]);
        let b = BigUint::from_bytes_be(&[0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        let (q, r) = from_ref(&a).div_rem(&from_ref(&b)).unwrap();
        assert_eq!(to_ref(&q), &a / &b);
        assert_eq!(to_ref(&r), &a % &b);
    }

    #[test]
    fn test_shifts() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let a = rng.gen_biguint(300);
            let s = rng.gen_range(0..200usize);
            assert_eq!(to_ref(&from_ref(&a).shl_bits(s)), &a << s);
            assert_eq!(to_ref(&from_ref(&a).shr_bits(s)), &a >> s);
        }
    }

    #[test]
    fn test_mod_pow() {
        // 3^5 mod 7 = 243 mod 7 = 5
        let result = RsaBigInt::from_u64(3)
            .mod_pow(&RsaBigInt::from_u64(5), &RsaBigInt::from_u64(7))
            .unwrap();
        assert_eq!(result, RsaBigInt::from_u64(5));

        let zero_exp = RsaBigInt::from_u64(9)
            .mod_pow(&RsaBigInt::zero(), &RsaBigInt::from_u64(7))
            .unwrap();
        assert!(zero_exp.is_one());

        assert_eq!(
            RsaBigInt::from_u64(2).mod_pow(&RsaBigInt::one(), &RsaBigInt::zero()),
            Err(RsaError::DivisionByZero)
        );
    }

    #[test]
    fn test_mod_pow_matches_reference() {
        let mut rng = StdRng::seed_from_u64(42);
        for i in 0..40 {
            let mut m = rng.gen_biguint(512);
            // alternate between Montgomery (odd) and plain (even) paths
            if i % 2 == 0 {
                m |= BigUint::one();
            } else {
                m <<= 1u32;
            }
            if m <= BigUint::one() {
                continue;
            }
            let base = rng.gen_biguint(600);
            let exp = rng.gen_biguint(300);
            let expected = base.modpow(&exp, &m);
            let got = from_ref(&base).mod_pow(&from_ref(&exp), &from_ref(&m)).unwrap();
            assert_eq!(to_ref(&got), expected);
        }
    }

    #[test]
    fn test_mod_inverse() {
        // 3 * 5 = 15 ≡ 1 mod 7, so inverse of 3 mod 7 is 5
        let a = RsaBigInt::from_u64(3);
        let m = RsaBigInt::from_u64(7);
        let inv = a.mod_inverse(&m).unwrap();
        assert_eq!(inv, RsaBigInt::from_u64(5));
        assert!(a.mod_mul(&inv, &m).unwrap().is_one());

        assert_eq!(
            RsaBigInt::from_u64(6).mod_inverse(&RsaBigInt::from_u64(9)),
            Err(RsaError::NotInvertible)
        );
    }

    #[test]
    fn test_mod_inverse_matches_reference() {
        let mut rng = StdRng::seed_from_u64(1234);
        let mut checked = 0;
        while checked < 50 {
            let m = rng.gen_biguint(400) | BigUint::one();
            let a = rng.gen_biguint(400);
            if !a.gcd(&m).is_one() {
                continue;
            }
            let inv = to_ref(&from_ref(&a).mod_inverse(&from_ref(&m)).unwrap());
            assert!(inv < m);
            assert!(((&a * &inv) % &m).is_one());
            checked += 1;
        }
    }

    #[test]
    fn test_lcm() {
        let a = RsaBigInt::from_u64(12);
        let b = RsaBigInt::from_u64(18);
        assert_eq!(a.lcm(&b), RsaBigInt::from_u64(36));
        assert!(a.lcm(&RsaBigInt::zero()).is_zero());
    }

    #[test]
    fn test_random_bits() {
        let mut rng = StdRng::seed_from_u64(99);
        for bits in [1usize, 7, 8, 63, 64, 65, 512, 1023] {
            let x = RsaBigInt::random_bits(bits, &mut rng).unwrap();
            assert_eq!(x.bit_length(), bits);
            let y = RsaBigInt::random_odd_bits(bits, &mut rng).unwrap();
            assert_eq!(y.bit_length(), bits);
            assert!(y.is_odd());
        }

        let bound = RsaBigInt::from_u64(1000);
        for _ in 0..100 {
            assert!(RsaBigInt::random_below(&bound, &mut rng).unwrap() < bound);
        }
    }

    #[test]
    fn test_display() {
        let n = from_ref(&"123456789012345678901234567890123456789".parse::<BigUint>().unwrap());
        assert_eq!(n.to_string(), "123456789012345678901234567890123456789");
        assert_eq!(format!("{:x}", RsaBigInt::from_u64(255)), "ff");
        assert_eq!(format!("{:#x}", RsaBigInt::zero()), "0x0");
        assert_eq!(RsaBigInt::zero().to_string(), "0");
    }

    #[test]
    fn test_mod_pow_time_independent_of_exponent_weight() {
        use std::time::{Duration, Instant};

        let mut rng = StdRng::seed_from_u64(77);
        let modulus = RsaBigInt::random_odd_bits(1024, &mut rng).unwrap();
        let base = RsaBigInt::random_below(&modulus, &mut rng).unwrap();
        // same limb count, 1024 set bits against one
        let dense = RsaBigInt::one().shl_bits(1024).checked_sub(&RsaBigInt::one()).unwrap();
        let sparse = RsaBigInt::one().shl_bits(1023);
        assert_eq!(dense.limbs().len(), sparse.limbs().len());

        let median = |exponent: &RsaBigInt| {
            let mut samples: Vec<Duration> = (0..21)
                .map(|_| {
                    let start = Instant::now();
                    let _ = base.mod_pow(exponent, &modulus).unwrap();
                    start.elapsed()
                })
                .collect();
            samples.sort();
            samples[samples.len() / 2]
        };

        // warm up
        let _ = median(&dense);
        let ratio = median(&dense).as_secs_f64() / median(&sparse).as_secs_f64();
        assert!((0.5..2.0).contains(&ratio), "timing ratio {}", ratio);
    }

    #[test]
    fn test_zeroize() {
        let mut n = RsaBigInt::from_u64(0xdead_beef);
        n.zeroize();
        assert!(n.is_zero());
    }
}
