//! RANLUX subtract-with-borrow generators.
//!
//! * [`Ranlux`], [`Ranlux4`], [`Ranlux8`]: the recurrence
//!   `x[n] = x[n-10] - x[n-24] - c mod 2^24` with luxury skipping, one
//!   stream per lane.
//! * [`RanluxPP`]: the same sequence as an LCG modulo `2^576 - 2^240 + 1`,
//!   skipping any distance with one multiplication.
//! * [`legacy`]: the classical `rluxgo`/`rluxut`/`rluxin`/`rluxat`/`ranlux`
//!   API on top of either engine.
//!
//! ```
//! use ranlux::{Luxury, Ranlux};
//!
//! let mut rng = Ranlux::new(3124, Luxury::Level(3)).unwrap();
//! let u = rng.draw();
//! assert!((0.0..1.0).contains(&u));
//! ```

#[macro_use]
mod log_macros;

mod engine;
mod simd;
mod state;

pub mod bigint;
pub mod error;
pub mod legacy;
pub mod pack;
pub mod ranluxpp;
pub mod seed;
pub mod swb;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use bigint::{multiplier, PackedBigInt, MODULUS};
pub use error::{Error, Result};
pub use legacy::{Legacy, LegacyPP, LegacyRanlux};
pub use pack::{pack_words, to_lcg_state, to_swb_state, UnpackedState};
pub use ranluxpp::RanluxPP;
pub use seed::DEFAULT_SEED;
pub use swb::{Ranlux, Ranlux4, Ranlux8};

/// Sub-steps per delivered batch of 24, by luxury level.
pub const LUXURY_TABLE: [u32; 5] = [24, 48, 97, 223, 389];

/// How many recurrence steps a refill advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Luxury {
    /// Classical level `0..=4`, see [`LUXURY_TABLE`].
    Level(u8),
    /// Explicit skip distance `p`.
    Distance(u32),
}

impl Luxury {
    pub const DEFAULT: Luxury = Luxury::Level(3);

    /// Skip distance `p` for this setting.
    ///
    /// Levels above 4 are rejected here; the classical fallback to the
    /// nearest level only applies in [`legacy`].
    pub fn skip_distance(&self) -> Result<u32> {
        match *self {
            Luxury::Level(l) => LUXURY_TABLE
                .get(l as usize)
                .copied()
                .ok_or_else(|| Error::InvalidConfiguration(format!("luxury level {l} is not in 0..=4"))),

            Luxury::Distance(p) => Ok(p),
        }
    }
}

impl Default for Luxury {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Initialization of the lanes of a SIMD engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LaneSeeding {
    /// Each lane gets its own stream; lane 0 is the scalar stream.
    #[default]
    Independent,
    /// Every lane runs the scalar stream (for cross-checking).
    Replicated,
}

/// Runtime-selectable engine description.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GeneratorConfig {
    pub seed: i64,
    pub luxury: Luxury,
    /// Lanes per engine, one of 1, 4 or 8.
    pub width: usize,
    pub lanes: LaneSeeding,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED as i64,
            luxury: Luxury::DEFAULT,
            width: 1,
            lanes: LaneSeeding::Independent,
        }
    }
}

impl GeneratorConfig {
    /// Validates the configuration and constructs the engine it names.
    pub fn build(&self) -> Result<Box<dyn Generator>> {
        debug!("building {}-wide generator: seed {}, {:?}", self.width, self.seed, self.luxury);

        match self.width {
            1 => Ok(Box::new(Ranlux::new(self.seed, self.luxury)?)),
            4 => Ok(Box::new(Ranlux4::with_lanes(self.seed, self.luxury, self.lanes)?)),
            8 => Ok(Box::new(Ranlux8::with_lanes(self.seed, self.luxury, self.lanes)?)),

            w => Err(Error::InvalidConfiguration(format!("width {w} is not one of 1, 4, 8"))),
        }
    }
}

/// Operations shared by every engine, whatever its width.
pub trait Generator {
    /// Independent streams served by this engine.
    fn width(&self) -> usize;

    /// Reseeds and reconfigures, discarding all buffered output.
    fn reseed(&mut self, seed: i64, luxury: Luxury) -> Result<()>;

    /// Next deviate in `[0, 1)`.
    fn draw(&mut self) -> f32;

    fn fill(&mut self, out: &mut [f32]) {
        for v in out.iter_mut() {
            *v = self.draw();
        }
    }

    /// Advances every stream by `steps` recurrence steps.
    fn advance(&mut self, steps: u64);

    /// Packs the current window into `out`, returning the number of words
    /// written (`width() * 18`).
    fn export_words(&self, out: &mut [u32]) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luxury_table_lookup() {
        let p: Vec<u32> = (0..5).map(|l| Luxury::Level(l).skip_distance().unwrap()).collect();

        assert_eq!(p, [24, 48, 97, 223, 389]);
        assert_eq!(Luxury::default().skip_distance(), Ok(223));
        assert_eq!(Luxury::Distance(2048).skip_distance(), Ok(2048));
    }

    #[test]
    fn test_luxury_level_above_4_is_rejected() {
        assert!(matches!(Luxury::Level(5).skip_distance(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_config_builds_each_width() {
        for width in [1, 4, 8] {
            let g = GeneratorConfig { width, ..Default::default() }.build().unwrap();

            assert_eq!(g.width(), width);
        }
    }

    #[test]
    fn test_config_rejects_bad_width() {
        let err = GeneratorConfig { width: 2, ..Default::default() }.build().err();

        assert!(matches!(err, Some(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_config_built_scalar_matches_direct_engine() {
        let mut g = GeneratorConfig { seed: 1, luxury: Luxury::Level(4), ..Default::default() }.build().unwrap();
        let mut r = Ranlux::new(1, Luxury::Level(4)).unwrap();

        for _ in 0..100 {
            assert_eq!(g.draw().to_bits(), r.draw().to_bits());
        }
    }
}
