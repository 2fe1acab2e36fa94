//! Subtract-with-borrow engines: [`Ranlux`] (one stream), [`Ranlux4`] and
//! [`Ranlux8`] (four or eight independent streams in SIMD lanes).
//!
//! Every engine starts with an exhausted batch, so the first draw advances
//! `p` steps and then delivers the 24 newest values of each lane. SIMD
//! engines deliver the lanes interleaved: draw `i` comes from lane
//! `i % WIDTH`.

use core::fmt;

use rand_core::{impls, RngCore, SeedableRng};

use crate::error::{Error, Result};
use crate::pack::{UnpackedState, LANES};
use crate::seed::{normalize_seed, DEFAULT_SEED};
use crate::simd::{Lanes4, Lanes8};
use crate::state::State;
use crate::{Generator, LaneSeeding, Luxury, LUXURY_TABLE};

/// Validated skip distance for the SWB engines.
fn checked_skip(luxury: Luxury) -> Result<u32> {
    let p = luxury.skip_distance()?;

    if p < LANES as u32 {
        return Err(Error::InvalidConfiguration(format!(
            "skip distance {p} is below one full window of {LANES}"
        )));
    }

    Ok(p)
}

macro_rules! swb_engine {
    ($(#[$doc:meta])* $name:ident, $lanes:ty, $width:expr) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name {
            state: State<$lanes>,
            mode: LaneSeeding,
        }

        impl $name {
            /// Lanes (independent streams) in this engine.
            pub const WIDTH: usize = $width;

            /// 32-bit words produced by [`Self::export_words`].
            pub const EXPORT_WORDS: usize = State::<$lanes>::WORDS_LEN;

            /// Seeds every lane independently from `seed`.
            ///
            /// The seed is taken modulo `2^31`, zero selecting
            /// [`DEFAULT_SEED`].
            pub fn new(seed: i64, luxury: Luxury) -> Result<Self> {
                Self::with_lanes(seed, luxury, LaneSeeding::Independent)
            }

            pub fn with_lanes(seed: i64, luxury: Luxury, mode: LaneSeeding) -> Result<Self> {
                let skip = checked_skip(luxury)?;

                Ok(Self::from_parts(normalize_seed(seed), skip, mode))
            }

            #[inline]
            fn from_parts(seed: u32, skip: u32, mode: LaneSeeding) -> Self {
                Self {
                    state: State::new(seed, mode, skip),
                    mode,
                }
            }

            /// Reseeds all lanes, keeping the luxury setting.
            pub fn seed(&mut self, seed: i64, mode: LaneSeeding) {
                self.mode = mode;
                self.state.reseed(normalize_seed(seed), mode);
            }

            /// Changes the skip distance and restarts the batch cursor.
            pub fn configure(&mut self, luxury: Luxury) -> Result<()> {
                let skip = checked_skip(luxury)?;

                trace!("{}: skip distance {} -> {}", stringify!($name), self.state.skip(), skip);
                self.state.set_skip(skip);

                Ok(())
            }

            #[inline]
            pub fn skip_distance(&self) -> u32 {
                self.state.skip()
            }

            /// Luxury level matching the current skip distance, if any.
            pub fn luxury_level(&self) -> Option<u8> {
                LUXURY_TABLE.iter().position(|&p| p == self.state.skip()).map(|l| l as u8)
            }

            #[inline(always)]
            pub fn draw(&mut self) -> f32 {
                self.state.draw_f32()
            }

            #[inline]
            pub fn fill(&mut self, out: &mut [f32]) {
                self.state.fill(out)
            }

            /// Advances every lane by `steps`; the next draw reads the
            /// following slot of the moved window.
            #[inline]
            pub fn advance(&mut self, steps: u64) {
                self.state.advance(steps)
            }

            /// Packs the current window of every lane into 18 words per
            /// lane, lane-major.
            ///
            /// ## Panics
            ///
            /// If `out` is shorter than [`Self::EXPORT_WORDS`].
            #[inline]
            pub fn export_words(&self, out: &mut [u32]) -> usize {
                self.state.export_words(out)
            }

            /// Current window and borrow of lane `lane`.
            pub fn lane_state(&self, lane: usize) -> UnpackedState {
                self.state.lane_state(lane)
            }

            /// Replaces lane `lane`; the next draw starts a fresh batch.
            pub fn load_lane(&mut self, lane: usize, s: &UnpackedState) {
                self.state.load_lane(lane, s)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::from_parts(DEFAULT_SEED, LUXURY_TABLE[3], LaneSeeding::Independent)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("width", &Self::WIDTH)
                    .field("skip", &self.state.skip())
                    .field("lanes", &self.mode)
                    .finish_non_exhaustive()
            }
        }

        impl Generator for $name {
            fn width(&self) -> usize {
                Self::WIDTH
            }

            fn reseed(&mut self, seed: i64, luxury: Luxury) -> Result<()> {
                self.configure(luxury)?;
                self.seed(seed, self.mode);

                Ok(())
            }

            fn draw(&mut self) -> f32 {
                self.state.draw_f32()
            }

            fn fill(&mut self, out: &mut [f32]) {
                self.state.fill(out)
            }

            fn advance(&mut self, steps: u64) {
                self.state.advance(steps)
            }

            fn export_words(&self, out: &mut [u32]) -> usize {
                self.state.export_words(out)
            }
        }

        impl RngCore for $name {
            #[inline(always)]
            fn next_u32(&mut self) -> u32 {
                self.state.next_word()
            }

            #[inline(always)]
            fn next_u64(&mut self) -> u64 {
                impls::next_u64_via_u32(self)
            }

            fn fill_bytes(&mut self, dest: &mut [u8]) {
                impls::fill_bytes_via_next(self, dest)
            }
        }

        impl SeedableRng for $name {
            type Seed = [u8; 4];

            /// Little-endian seed, default luxury.
            fn from_seed(seed: Self::Seed) -> Self {
                Self::from_parts(normalize_seed(u32::from_le_bytes(seed) as i64), LUXURY_TABLE[3], LaneSeeding::Independent)
            }
        }
    };
}

swb_engine!(
    /// Scalar RANLUX engine, one stream.
    ///
    /// ```
    /// use ranlux::{Luxury, Ranlux};
    ///
    /// let mut a = Ranlux::new(1, Luxury::Level(4)).unwrap();
    /// let saved = a.state();
    /// let x = a.draw();
    ///
    /// let mut b = Ranlux::new(99, Luxury::Level(4)).unwrap();
    /// b.load(&saved);
    /// assert_eq!(b.draw(), x);
    /// ```
    Ranlux,
    u32,
    1
);

swb_engine!(
    /// Four independent RANLUX streams (SSE2 on x86_64, NEON on aarch64).
    Ranlux4,
    Lanes4,
    4
);

swb_engine!(
    /// Eight independent RANLUX streams (AVX2 when enabled at build time).
    Ranlux8,
    Lanes8,
    8
);

impl Ranlux {
    /// Current window and borrow, oldest lane first.
    #[inline]
    pub fn state(&self) -> UnpackedState {
        self.state.lane_state(0)
    }

    /// Continues from `s`: the next draw advances one batch from it.
    #[inline]
    pub fn load(&mut self, s: &UnpackedState) {
        self.state.load_lane(0, s)
    }

    /// Advances `s` in place by `steps` recurrence steps.
    pub fn skip_state(s: &mut UnpackedState, steps: u64) {
        let mut c = s.carry as u32;

        crate::engine::advance(&mut s.lanes, &mut c, steps);
        s.carry = c != 0;
    }
}
