//! Bit-packing between the three representations of one RANLUX position:
//!
//! * unpacked: 24 lanes of 24 bits plus the borrow bit,
//! * 18 dense 32-bit words for raw output,
//! * the 576-bit LCG state modulo `m`.
//!
//! Lanes are ordered oldest first: `lanes[0]` is `x[n-24]`, `lanes[23]` is
//! `x[n-1]`. Laid side by side they form the base-2^24 digits `D` of a 576-bit
//! integer (lane `j` at bit `24 j`). With that digit image the LCG state is
//!
//! ```text
//! X = D - (D >> 336) + c  (mod m)
//! ```
//!
//! i.e. the lanes minus the ten newest lanes shifted down by fourteen lanes,
//! plus the borrow. Multiplying `X` by `a = 2^-24 mod m` corresponds to
//! exactly one step of the subtract-with-borrow recurrence.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bigint::{PackedBigInt, LIMBS};

/// Lanes in one RANLUX window.
pub const LANES: usize = 24;

/// Significant bits per lane.
pub const LANE_BITS: u32 = 24;

pub const LANE_MASK: u32 = (1 << LANE_BITS) - 1;

/// 32-bit words produced from one 24-lane window.
pub const WORDS_PER_BATCH: usize = LANES * LANE_BITS as usize / 32;

/// The short lag `s` of `x[n] = x[n-s] - x[n-r] - c`, `r = 24`.
pub(crate) const SHORT_LAG: usize = 10;

/// Bit offset of the `r - s` lane shift in the LCG image.
const LAG_SHIFT: usize = (LANES - SHORT_LAG) * LANE_BITS as usize;

/// One logical RANLUX stream position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnpackedState {
    /// Oldest lane first, only the low 24 bits are significant.
    pub lanes: [u32; LANES],
    /// Borrow produced by the newest lane.
    pub carry: bool,
}

impl UnpackedState {
    #[inline]
    pub fn new(lanes: [u32; LANES], carry: bool) -> Self {
        Self { lanes, carry }
    }

    /// True iff every lane lies in `[0, 2^24)`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.lanes.iter().all(|&l| l <= LANE_MASK)
    }

    /// The 576-bit integer whose base-2^24 digits are the lanes.
    pub fn digits(&self) -> PackedBigInt {
        let mut out = [0u64; LIMBS];
        let mut acc: u128 = 0;
        let mut bits = 0u32;
        let mut k = 0usize;

        for &lane in self.lanes.iter() {
            acc |= ((lane & LANE_MASK) as u128) << bits;
            bits += LANE_BITS;

            if bits >= 64 {
                out[k] = acc as u64;
                acc >>= 64;
                bits -= 64;
                k += 1;
            }
        }

        debug_assert_eq!(k, LIMBS);
        PackedBigInt(out)
    }

    /// Inverse of [`UnpackedState::digits`].
    pub fn from_digits(d: &PackedBigInt, carry: bool) -> Self {
        let mut lanes = [0u32; LANES];

        for (j, lane) in lanes.iter_mut().enumerate() {
            let bit = j * LANE_BITS as usize;
            let word = bit / 64;
            let off = bit % 64;

            let mut v = d.0[word] >> off;

            if off + LANE_BITS as usize > 64 {
                v |= d.0[word + 1] << (64 - off);
            }

            *lane = (v as u32) & LANE_MASK;
        }

        Self { lanes, carry }
    }

    /// LCG image of this position, canonical in `[0, m)`.
    pub fn to_lcg(&self) -> PackedBigInt {
        let d = self.digits();
        let (x, _) = d.overflowing_sub(&d.shr(LAG_SHIFT));

        let x = if self.carry {
            x.overflowing_add(&PackedBigInt::ONE).0
        } else {
            x
        };

        x.reduce_once()
    }

    /// Recovers the lanes and borrow from an LCG state.
    ///
    /// The map to the LCG is two-to-one: `(D, c = 1)` and `(D + 1, c = 0)`
    /// share an image and generate identical futures. The borrow is chosen
    /// so that it agrees with the newest lane: a borrow out of
    /// `x[n-1] = x[n-11] - x[n-25] - c` forces `x[n-1] >= x[n-11]`, no borrow
    /// forces `x[n-1] <= x[n-11]`.
    ///
    /// `x` is reduced modulo `m` first. A value with no lane preimage at all
    /// yields the all-zero state; compare `to_lcg()` of the result with `x`
    /// to detect that when loading arbitrary words.
    pub fn from_lcg(x: &PackedBigInt) -> Self {
        let x = x.reduce_once();

        match (solve_digits(&x, false), solve_digits(&x, true)) {
            (Some(s), _) if borrow_consistent(&s) => s,
            (_, Some(s)) if borrow_consistent(&s) => s,

            // lanes no recurrence step produced, any preimage will do
            (Some(s), _) | (None, Some(s)) => s,
            (None, None) => UnpackedState::default(),
        }
    }
}

/// Solves `D - (D >> 336) = x - c` for the digit image `D`.
fn solve_digits(x: &PackedBigInt, carry: bool) -> Option<UnpackedState> {
    let v = if carry {
        let (v, borrow) = x.overflowing_sub(&PackedBigInt::ONE);

        if borrow {
            return None;
        }

        v
    } else {
        *x
    };

    // d_{k+1} = v + (d_k >> 336) increases monotonically to the least fixed point
    let mut d = v.overflowing_add(&v.shr(LAG_SHIFT)).0;

    for _ in 0..4 {
        let next = v.overflowing_add(&d.shr(LAG_SHIFT)).0;

        if next == d {
            break;
        }

        d = next;
    }

    if d.overflowing_sub(&d.shr(LAG_SHIFT)).0 != v {
        return None;
    }

    Some(UnpackedState::from_digits(&d, carry))
}

#[inline]
fn borrow_consistent(s: &UnpackedState) -> bool {
    let newest = s.lanes[LANES - 1];
    let lagged = s.lanes[LANES - 1 - SHORT_LAG];

    !((newest > lagged && !s.carry) || (newest < lagged && s.carry))
}

/// `toLCGState`: lanes and borrow to the 576-bit LCG state.
#[inline]
pub fn to_lcg_state(lanes: &[u32; LANES], carry: bool) -> PackedBigInt {
    UnpackedState::new(*lanes, carry).to_lcg()
}

/// `toSWBState`: 576-bit LCG state to lanes and borrow.
///
/// Non-canonical input is reduced modulo `m`. Input that no lane state maps
/// to comes back as the all-zero state, see [`UnpackedState::from_lcg`].
#[inline]
pub fn to_swb_state(x: &PackedBigInt) -> UnpackedState {
    UnpackedState::from_lcg(x)
}

/// Packs 24 lanes into 18 dense words, four lanes per three words:
///
/// ```text
/// w0 = x0 << 8  | x1 >> 16
/// w1 = x1 << 16 | x2 >> 8
/// w2 = x2 << 24 | x3
/// ```
///
/// `lane(j)` supplies lane `j`, so strided SIMD storage packs without a copy.
#[inline(always)]
pub(crate) fn pack_words_with(lane: impl Fn(usize) -> u32, out: &mut [u32]) {
    debug_assert!(out.len() >= WORDS_PER_BATCH);

    let mut j = 0;
    let mut i = 0;

    while i < WORDS_PER_BATCH {
        let x0 = lane(j);
        let x1 = lane(j + 1);
        let x2 = lane(j + 2);
        let x3 = lane(j + 3);

        out[i] = (x0 << 8) | (x1 >> 16);
        out[i + 1] = (x1 << 16) | (x2 >> 8);
        out[i + 2] = (x2 << 24) | x3;

        i += 3;
        j += 4;
    }
}

/// Packs 24 lanes into 18 dense 32-bit words.
#[inline]
pub fn pack_words(lanes: &[u32; LANES], out: &mut [u32; WORDS_PER_BATCH]) {
    pack_words_with(|j| lanes[j], out);
}
