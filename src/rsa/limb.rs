// Limb Kernels
// Word-level carry/borrow arithmetic and Montgomery multiplication used by RsaBigInt

use subtle::{Choice, ConditionallySelectable};

/// A single 64-bit digit, least significant first inside a big integer
pub type Limb = u64;

pub const LIMB_BITS: usize = 64;

/// a + b + carry, returns (sum, carry)
#[inline(always)]
pub fn adc(a: Limb, b: Limb, carry: Limb) -> (Limb, Limb) {
    let t = a as u128 + b as u128 + carry as u128;
    (t as Limb, (t >> LIMB_BITS) as Limb)
}

/// a - b - borrow, returns (difference, borrow) where borrow is 0 or 1
#[inline(always)]
pub fn sbb(a: Limb, b: Limb, borrow: Limb) -> (Limb, Limb) {
    let t = (a as u128).wrapping_sub(b as u128 + borrow as u128);
    (t as Limb, ((t >> LIMB_BITS) as Limb) & 1)
}

/// acc + a * b + carry, returns (low, high)
#[inline(always)]
pub fn mac(acc: Limb, a: Limb, b: Limb, carry: Limb) -> (Limb, Limb) {
    let t = acc as u128 + (a as u128 * b as u128) + carry as u128;
    (t as Limb, (t >> LIMB_BITS) as Limb)
}

/// Schoolbook product: result += a * b
/// `result` must hold at least a.len() + b.len() limbs
pub fn mul_accumulate(result: &mut [Limb], a: &[Limb], b: &[Limb]) {
    debug_assert!(result.len() >= a.len() + b.len());
    for (i, &ai) in a.iter().enumerate() {
        let mut carry = 0;
        for (j, &bj) in b.iter().enumerate() {
            let (lo, hi) = mac(result[i + j], ai, bj, carry);
            result[i + j] = lo;
            carry = hi;
        }
        let mut k = i + b.len();
        while carry != 0 && k < result.len() {
            let (sum, c) = adc(result[k], carry, 0);
            result[k] = sum;
            carry = c;
            k += 1;
        }
    }
}

/// In-place a -= b over equal-length slices, returns the final borrow
pub fn sub_assign(a: &mut [Limb], b: &[Limb]) -> Limb {
    let mut borrow = 0;
    for (i, ai) in a.iter_mut().enumerate() {
        let bi = b.get(i).copied().unwrap_or(0);
        let (d, br) = sbb(*ai, bi, borrow);
        *ai = d;
        borrow = br;
    }
    borrow
}

/// dst = src when choice is set, without branching on choice
pub fn conditional_assign(dst: &mut [Limb], src: &[Limb], choice: Choice) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        d.conditional_assign(s, choice);
    }
}

/// -n0^(-1) mod 2^64 for an odd n0, by Newton iteration
pub fn montgomery_n0_inv(n0: Limb) -> Limb {
    debug_assert!(n0 & 1 == 1);
    let mut inv: Limb = 1;
    for _ in 0..6 {
        inv = inv.wrapping_mul(2u64.wrapping_sub(n0.wrapping_mul(inv)));
    }
    inv.wrapping_neg()
}

/// Montgomery product out = a * b * R^(-1) mod n, R = 2^(64 * n.len())
///
/// CIOS variant. `a`, `b` and `out` are n.len() limbs and fully reduced.
/// The final subtraction is applied with a constant-time select.
pub fn mont_mul(out: &mut [Limb], a: &[Limb], b: &[Limb], n: &[Limb], n0_inv: Limb) {
    let k = n.len();
    let mut t = vec![0 as Limb; k + 2];

    for i in 0..k {
        let mut carry = 0;
        for j in 0..k {
            let (lo, hi) = mac(t[j], a[j], b[i], carry);
            t[j] = lo;
            carry = hi;
        }
        let (s, c) = adc(t[k], carry, 0);
        t[k] = s;
        t[k + 1] = c;

        let m = t[0].wrapping_mul(n0_inv);
        let (_, mut carry) = mac(t[0], m, n[0], 0);
        for j in 1..k {
            let (lo, hi) = mac(t[j], m, n[j], carry);
            t[j - 1] = lo;
            carry = hi;
        }
        let (s, c) = adc(t[k], carry, 0);
        t[k - 1] = s;
        t[k] = t[k + 1] + c;
    }

    // t < 2n here; subtract n once if t >= n
    let mut reduced = t[..k].to_vec();
    let borrow = sub_assign(&mut reduced, n);
    let (_, borrow) = sbb(t[k], 0, borrow);
    out.copy_from_slice(&t[..k]);
    conditional_assign(out, &reduced, Choice::from((borrow ^ 1) as u8));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adc_sbb_carry() {
        assert_eq!(adc(u64::MAX, 1, 0), (0, 1));
        assert_eq!(adc(u64::MAX, u64::MAX, 1), (u64::MAX, 1));
        assert_eq!(sbb(0, 1, 0), (u64::MAX, 1));
        assert_eq!(sbb(5, 3, 1), (1, 0));
    }

    #[test]
    fn test_mac() {
        let (lo, hi) = mac(u64::MAX, u64::MAX, u64::MAX, u64::MAX);
        // (2^64-1)^2 + 2*(2^64-1) = 2^128 - 1
        assert_eq!((lo, hi), (u64::MAX, u64::MAX));
    }

    #[test]
    fn test_mul_accumulate() {
        let mut result = [0u64; 4];
        mul_accumulate(&mut result, &[u64::MAX, u64::MAX], &[u64::MAX, u64::MAX]);
        // (2^128 - 1)^2 = 2^256 - 2^129 + 1
        assert_eq!(result, [1, 0, u64::MAX - 1, u64::MAX]);
    }

    #[test]
    fn test_montgomery_n0_inv() {
        for n0 in [1u64, 3, 0xffff_ffff_ffff_fff1, 0x1234_5678_9abc_def1] {
            let inv = montgomery_n0_inv(n0);
            assert_eq!(n0.wrapping_mul(inv), u64::MAX);
        }
    }

    #[test]
    fn test_mont_mul_single_limb() {
        // n = 97, R = 2^64; mont_mul(aR, bR) = abR
        let n = [97u64];
        let n0_inv = montgomery_n0_inv(97);
        let r = ((1u128 << 64) % 97) as u64;
        let to_mont = |x: u64| ((x as u128 * r as u128) % 97) as u64;

        let mut out = [0u64];
        mont_mul(&mut out, &[to_mont(12)], &[to_mont(34)], &n, n0_inv);
        assert_eq!(out[0], to_mont(12 * 34 % 97));
    }
}
