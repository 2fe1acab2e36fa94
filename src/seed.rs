//! Classical seed expansion.
//!
//! The 24 initial lanes come from the multiplicative congruential generator
//! `s <- 40014 * s mod 2147483563` (Schrage's decomposition, no 64-bit
//! product needed), each output reduced to 24 bits.

use crate::pack::{UnpackedState, LANES, LANE_MASK};

/// Seed used when none (or zero) is given.
pub const DEFAULT_SEED: u32 = 314_159_265;

const LCG_MULT: i64 = 40014;
const LCG_Q: i64 = 53668;
const LCG_R: i64 = 12211;
const LCG_MOD: i64 = 2_147_483_563;

/// Maps any integer seed onto the classical unsigned 31-bit seed space.
///
/// Negative values wrap modulo 2^31 (as an unsigned reinterpretation would),
/// and zero selects [`DEFAULT_SEED`].
#[inline]
pub fn normalize_seed(seed: i64) -> u32 {
    let s = seed.rem_euclid(1 << 31) as u32;

    if s == 0 {
        DEFAULT_SEED
    } else {
        s
    }
}

/// Seed expansion sequence, one 24-bit word per call.
pub(crate) struct SeedLcg(i64);

impl SeedLcg {
    #[inline(always)]
    pub(crate) fn new(seed: u32) -> Self {
        Self(seed as i64)
    }

    #[inline(always)]
    pub(crate) fn next_word(&mut self) -> u32 {
        let k = self.0 / LCG_Q;
        let mut s = LCG_MULT * (self.0 - k * LCG_Q) - k * LCG_R;

        if s < 0 {
            s += LCG_MOD;
        }

        self.0 = s;
        (s as u32) & LANE_MASK
    }

    /// Expands the next 24 words into a lane state.
    ///
    /// The first word produced becomes the newest lane and the 24th the
    /// oldest, and the borrow starts set iff the oldest lane is zero.
    pub(crate) fn next_state(&mut self) -> UnpackedState {
        let mut lanes = [0u32; LANES];

        for i in 0..LANES {
            lanes[LANES - 1 - i] = self.next_word();
        }

        UnpackedState {
            lanes,
            carry: lanes[0] == 0,
        }
    }
}

/// Initial lane state for `seed` (already normalized).
#[inline]
pub fn seed_state(seed: u32) -> UnpackedState {
    SeedLcg::new(seed).next_state()
}
