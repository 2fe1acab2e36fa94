//! # 576-bit modular arithmetic
//!
//! Fixed-width integers modulo `m = 2^576 - 2^240 + 1`, stored as nine
//! little-endian 64-bit limbs.
//!
//! Products are reduced without division: writing a 1152-bit product as
//! `H * 2^576 + L`, the congruence `2^576 = 2^240 - 1 (mod m)` folds it into
//! `L + (H << 240) - H`, which is repeated until the value fits in 576 bits
//! and finished with at most one subtraction of `m`.
//!
//! This is not a general bignum type, only the operations the LCG form of
//! RANLUX needs.

use core::cmp::Ordering;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const LIMBS: usize = 9;
pub const BITS: usize = LIMBS * 64;
pub const BYTES: usize = LIMBS * 8;

const MAX: u64 = u64::MAX;

/// A 576-bit unsigned integer, limb 0 least significant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackedBigInt(pub [u64; LIMBS]);

/// `m = 2^576 - 2^240 + 1`
pub const MODULUS: PackedBigInt = PackedBigInt([1, 0, 0, 0xffff_0000_0000_0000, MAX, MAX, MAX, MAX, MAX]);

/// `a = m - (m - 1) / 2^24`, the inverse of `2^24` modulo `m`.
///
/// One multiplication by `a` is one step of the subtract-with-borrow
/// recurrence.
pub const BASE_MULTIPLIER: PackedBigInt =
    PackedBigInt([1, 0, 0, 0xffff_0000_0100_0000, MAX, MAX, MAX, MAX, 0xffff_feff_ffff_ffff]);

impl PackedBigInt {
    pub const ZERO: Self = Self([0; LIMBS]);
    pub const ONE: Self = Self([1, 0, 0, 0, 0, 0, 0, 0, 0]);

    #[inline]
    pub fn from_u64(v: u64) -> Self {
        let mut r = Self::ZERO;
        r.0[0] = v;
        r
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&l| l == 0)
    }

    #[inline]
    pub fn limbs(&self) -> &[u64; LIMBS] {
        &self.0
    }

    /// Raw little-endian byte image, the format streamed to external
    /// statistical test suites.
    pub fn to_le_bytes(&self) -> [u8; BYTES] {
        let mut out = [0u8; BYTES];

        for (chunk, limb) in out.chunks_exact_mut(8).zip(self.0.iter()) {
            chunk.copy_from_slice(&limb.to_le_bytes());
        }

        out
    }

    pub fn from_le_bytes(bytes: &[u8; BYTES]) -> Self {
        let mut limbs = [0u64; LIMBS];
        rand_core::le::read_u64_into(bytes, &mut limbs);

        Self(limbs)
    }

    #[inline]
    pub(crate) fn overflowing_add(&self, rhs: &Self) -> (Self, bool) {
        let mut r = [0u64; LIMBS];
        let mut carry = false;

        for i in 0..LIMBS {
            let (s0, c0) = self.0[i].overflowing_add(rhs.0[i]);
            let (s1, c1) = s0.overflowing_add(carry as u64);

            r[i] = s1;
            carry = c0 | c1;
        }

        (Self(r), carry)
    }

    #[inline]
    pub(crate) fn overflowing_sub(&self, rhs: &Self) -> (Self, bool) {
        let mut r = [0u64; LIMBS];
        let mut borrow = false;

        for i in 0..LIMBS {
            let (d0, b0) = self.0[i].overflowing_sub(rhs.0[i]);
            let (d1, b1) = d0.overflowing_sub(borrow as u64);

            r[i] = d1;
            borrow = b0 | b1;
        }

        (Self(r), borrow)
    }

    /// Logical right shift by `n < 576` bits.
    pub(crate) fn shr(&self, n: usize) -> Self {
        debug_assert!(n < BITS);

        let words = n / 64;
        let bits = n % 64;
        let mut r = [0u64; LIMBS];

        for i in 0..LIMBS - words {
            let lo = self.0[i + words] >> bits;
            let hi = if bits != 0 && i + words + 1 < LIMBS {
                self.0[i + words + 1] << (64 - bits)
            } else {
                0
            };

            r[i] = lo | hi;
        }

        Self(r)
    }

    /// Subtracts `m` once if the value is not already canonical.
    #[inline]
    pub(crate) fn reduce_once(self) -> Self {
        if self >= MODULUS {
            self.overflowing_sub(&MODULUS).0
        } else {
            self
        }
    }

    /// Full 1152-bit product.
    #[inline]
    fn mul_wide(&self, rhs: &Self) -> [u64; 2 * LIMBS] {
        let mut t = [0u64; 2 * LIMBS];

        for i in 0..LIMBS {
            let a = self.0[i] as u128;
            let mut carry: u128 = 0;

            for j in 0..LIMBS {
                let cur = t[i + j] as u128 + a * rhs.0[j] as u128 + carry;

                t[i + j] = cur as u64;
                carry = cur >> 64;
            }

            t[i + LIMBS] = carry as u64;
        }

        t
    }

    /// `self * rhs mod m`, both operands canonical.
    pub fn mul_mod(&self, rhs: &Self) -> Self {
        reduce(self.mul_wide(rhs))
    }

    /// `self^exp mod m` by left-to-right square-and-multiply.
    ///
    /// `exp == 0` yields one.
    pub fn pow_mod(&self, exp: u64) -> Self {
        if exp == 0 {
            return Self::ONE;
        }

        let top = 63 - exp.leading_zeros();
        let mut r = *self;

        for bit in (0..top).rev() {
            r = r.mul_mod(&r);

            if (exp >> bit) & 1 == 1 {
                r = r.mul_mod(self);
            }
        }

        r
    }
}

/// Folds a 1152-bit value modulo `m` using `2^576 = 2^240 - 1`.
fn reduce(mut w: [u64; 2 * LIMBS]) -> PackedBigInt {
    while w[LIMBS..].iter().any(|&l| l != 0) {
        let mut out = [0u64; 2 * LIMBS];
        let mut acc: i128 = 0;

        for i in 0..2 * LIMBS {
            let lo = if i < LIMBS { w[i] } else { 0 };
            let hi = if i < LIMBS { w[LIMBS + i] } else { 0 };

            // limb `i` of `H << 240`, i.e. a shift by 3 limbs and 48 bits
            let s0 = if (3..3 + LIMBS).contains(&i) { w[LIMBS + i - 3] << 48 } else { 0 };
            let s1 = if (4..4 + LIMBS).contains(&i) { w[LIMBS + i - 4] >> 16 } else { 0 };

            acc += lo as i128 + (s0 | s1) as i128 - hi as i128;
            out[i] = acc as u64;
            acc >>= 64;
        }

        debug_assert_eq!(acc, 0, "fold must stay non-negative");
        w = out;
    }

    let mut r = [0u64; LIMBS];
    r.copy_from_slice(&w[..LIMBS]);

    PackedBigInt(r).reduce_once()
}

/// `A = a^p mod m`, the transition of `p` recurrence steps.
#[inline]
pub fn multiplier(p: u64) -> PackedBigInt {
    BASE_MULTIPLIER.pow_mod(p)
}

impl Ord for PackedBigInt {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for PackedBigInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::LowerHex for PackedBigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for limb in self.0.iter().rev() {
            write!(f, "{:016x}", limb)?;
        }

        Ok(())
    }
}

impl fmt::Debug for PackedBigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackedBigInt(0x{:x})", self)
    }
}
