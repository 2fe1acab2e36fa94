//! # RANLUX++
//!
//! The RANLUX sequence as a linear congruential generator: the state is one
//! integer `X` modulo `m = 2^576 - 2^240 + 1`, and a refill computes
//! `X <- X * A mod m` with `A = a^p`, which is `p` recurrence steps in one
//! multiplication. Skip distances far beyond the classical 389 cost nothing
//! extra per refill, hence the default `p = 2048`.
//!
//! Deviates are cut from the 576 state bits: 24 bits per `f32`, 52 bits per
//! `f64`, 32 or 64 bits per raw word, lowest bits first. A draw that does not
//! fit in the remaining bits of the state triggers the next refill.
//! Deviates therefore come from the LCG image itself, not from its unpacked
//! lanes; [`Generator::export_words`] is the path that unpacks.

use core::fmt;
use core::num::NonZeroU64;

use rand_core::{impls, RngCore, SeedableRng};

use crate::bigint::{multiplier, PackedBigInt, BASE_MULTIPLIER, BITS};
use crate::error::{Error, Result};
use crate::pack::{pack_words, to_swb_state, UnpackedState, WORDS_PER_BATCH};
use crate::seed::{normalize_seed, seed_state, DEFAULT_SEED};
use crate::{Generator, Luxury};

/// Skip distance used when none is given.
pub const DEFAULT_SKIP: u64 = 2048;

const F32_BITS: u32 = 24;
const F64_BITS: u32 = 52;

#[derive(Clone)]
pub struct RanluxPP {
    state: PackedBigInt,
    multiplier: PackedBigInt,
    skip: u64,
    /// Next unused bit of `state`, `BITS` once exhausted.
    pos: usize,
    /// Recurrence steps since seeding or the last state load.
    steps: u64,
}

impl RanluxPP {
    /// Seeds the classical way and precomputes `A = a^p`.
    ///
    /// The seed is taken modulo `2^31` (zero selecting [`DEFAULT_SEED`]);
    /// `p == 0` is a configuration error.
    pub fn new(seed: i64, p: u64) -> Result<Self> {
        check_skip(p)?;

        Ok(Self::from_parts(normalize_seed(seed), p))
    }

    /// Like [`RanluxPP::new`] with the skip distance of `luxury`.
    pub fn with_luxury(seed: i64, luxury: Luxury) -> Result<Self> {
        Self::new(seed, luxury.skip_distance()? as u64)
    }

    /// Continues the stream of an unpacked subtract-with-borrow state.
    pub fn from_state(s: &UnpackedState, p: u64) -> Result<Self> {
        check_skip(p)?;

        let mut r = Self::from_parts(DEFAULT_SEED, p);
        r.load(s);

        Ok(r)
    }

    fn from_parts(seed: u32, p: u64) -> Self {
        debug!("RanluxPP: precomputing a^{p} mod m");

        Self {
            state: seed_state(seed).to_lcg(),
            multiplier: multiplier(p),
            skip: p,
            pos: BITS,
            steps: 0,
        }
    }

    /// Reseeds, keeping the multiplier.
    pub fn seed(&mut self, seed: i64) {
        self.state = seed_state(normalize_seed(seed)).to_lcg();
        self.pos = BITS;
        self.steps = 0;
    }

    /// Replaces the state by the image of `s`.
    pub fn load(&mut self, s: &UnpackedState) {
        self.state = s.to_lcg();
        self.pos = BITS;
        self.steps = 0;
    }

    /// Switches to skip distance `p`, recomputing the multiplier.
    pub fn reconfigure(&mut self, p: u64) -> Result<()> {
        let p = NonZeroU64::new(p).ok_or_else(|| Error::InvalidConfiguration("skip distance must be positive".into()))?;

        self.set_skip(p);

        Ok(())
    }

    pub(crate) fn set_skip(&mut self, p: NonZeroU64) {
        let p = p.get();

        if p != self.skip {
            debug!("RanluxPP: skip distance {} -> {p}", self.skip);

            self.multiplier = multiplier(p);
            self.skip = p;
        }

        self.pos = BITS;
    }

    #[inline]
    pub fn skip_distance(&self) -> u64 {
        self.skip
    }

    /// Current LCG state.
    #[inline]
    pub fn state(&self) -> &PackedBigInt {
        &self.state
    }

    /// Mutable LCG state; the next draw starts a fresh batch from it.
    #[inline]
    pub fn state_mut(&mut self) -> &mut PackedBigInt {
        self.pos = BITS;
        &mut self.state
    }

    /// The precomputed `A = a^p mod m`.
    #[inline]
    pub fn multiplier(&self) -> &PackedBigInt {
        &self.multiplier
    }

    /// Lanes and borrow of the current state.
    #[inline]
    pub fn unpacked(&self) -> UnpackedState {
        to_swb_state(&self.state)
    }

    /// One refill: `X <- X * A mod m`, i.e. `p` recurrence steps.
    #[inline]
    pub fn next_state(&mut self) {
        self.state = self.state.mul_mod(&self.multiplier);
        self.steps = self.steps.wrapping_add(self.skip);
        self.pos = 0;
    }

    /// Advances by an arbitrary number of recurrence steps. The bit cursor
    /// is kept, so the next draw reads the following bits of the moved state.
    pub fn advance(&mut self, steps: u64) {
        if steps == 0 {
            return;
        }

        let jump = if steps == self.skip {
            self.multiplier
        } else {
            BASE_MULTIPLIER.pow_mod(steps)
        };

        self.state = self.state.mul_mod(&jump);
        self.steps = self.steps.wrapping_add(steps);
    }

    /// Next `w` bits of the stream, `1 <= w <= 64`.
    ///
    /// ## Panics
    ///
    /// If `w` is outside `1..=64`.
    #[inline]
    pub fn next_bits(&mut self, w: u32) -> u64 {
        assert!((1..=64).contains(&w), "can only extract 1..=64 bits, got {w}");

        let w = w as usize;

        if self.pos + w > BITS {
            self.next_state();
        }

        let limbs = self.state.limbs();
        let idx = self.pos / 64;
        let off = self.pos % 64;

        let mut v = limbs[idx] >> off;

        if off != 0 && off + w > 64 {
            v |= limbs[idx + 1] << (64 - off);
        }

        self.pos += w;

        if w == 64 {
            v
        } else {
            v & ((1u64 << w) - 1)
        }
    }

    /// Next single-precision deviate in `[0, 1)`.
    #[inline]
    pub fn draw_f32(&mut self) -> f32 {
        self.next_bits(F32_BITS) as f32 * (1.0 / (1u64 << F32_BITS) as f32)
    }

    /// Next double-precision deviate in `[0, 1)`.
    #[inline]
    pub fn draw_f64(&mut self) -> f64 {
        self.next_bits(F64_BITS) as f64 * (1.0 / (1u64 << F64_BITS) as f64)
    }

    pub fn fill_f32(&mut self, out: &mut [f32]) {
        for v in out.iter_mut() {
            *v = self.draw_f32();
        }
    }

    pub fn fill_f64(&mut self, out: &mut [f64]) {
        for v in out.iter_mut() {
            *v = self.draw_f64();
        }
    }

    /// Checks that the current state is the image of `swb`.
    ///
    /// Both sides are compared as canonical LCG values, so the two unpacked
    /// states that share an image are accepted alike.
    pub fn compare_with_swb(&self, swb: &UnpackedState) -> Result<()> {
        let expected = swb.to_lcg();

        if expected == self.state {
            return Ok(());
        }

        let first = (0..crate::bigint::LIMBS).find(|&i| expected.0[i] != self.state.0[i]).unwrap_or(0);

        Err(Error::StateMismatch {
            step: self.steps,
            detail: format!(
                "limb {first}: lcg {:#018x}, swb image {:#018x}",
                self.state.0[first], expected.0[first]
            ),
        })
    }
}

#[inline]
fn check_skip(p: u64) -> Result<()> {
    if p == 0 {
        return Err(Error::InvalidConfiguration("skip distance must be positive".into()));
    }

    Ok(())
}

impl Default for RanluxPP {
    fn default() -> Self {
        Self::from_parts(DEFAULT_SEED, DEFAULT_SKIP)
    }
}

impl fmt::Debug for RanluxPP {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RanluxPP")
            .field("skip", &self.skip)
            .field("pos", &self.pos)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl Generator for RanluxPP {
    fn width(&self) -> usize {
        1
    }

    fn reseed(&mut self, seed: i64, luxury: Luxury) -> Result<()> {
        self.reconfigure(luxury.skip_distance()? as u64)?;
        self.seed(seed);

        Ok(())
    }

    fn draw(&mut self) -> f32 {
        self.draw_f32()
    }

    fn fill(&mut self, out: &mut [f32]) {
        self.fill_f32(out)
    }

    fn advance(&mut self, steps: u64) {
        RanluxPP::advance(self, steps)
    }

    /// The 24 lanes of the current state packed like the SWB engines do.
    fn export_words(&self, out: &mut [u32]) -> usize {
        assert!(out.len() >= WORDS_PER_BATCH, "export buffer needs {WORDS_PER_BATCH} words");

        let mut words = [0u32; WORDS_PER_BATCH];
        pack_words(&self.unpacked().lanes, &mut words);
        out[..WORDS_PER_BATCH].copy_from_slice(&words);

        WORDS_PER_BATCH
    }
}

impl RngCore for RanluxPP {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.next_bits(32) as u32
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.next_bits(64)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }
}

impl SeedableRng for RanluxPP {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::from_parts(normalize_seed(u32::from_le_bytes(seed) as i64), DEFAULT_SKIP)
    }
}
