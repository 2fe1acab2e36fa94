//! # Classical API
//!
//! `rluxgo`, `rluxut`, `rluxin`, `rluxat` and `ranlux` with the exact
//! behaviour of the historical single-precision routine: luxury fallbacks,
//! the 25-word state vector, the position counter and the padding of tiny
//! values. Any [`SkipEngine`] does the stepping, so [`Ranlux`] and
//! [`RanluxPP`] back the same contract and give identical output.
//!
//! The historical routine keeps its window in a ring of 24 cells with two
//! pointers `i24` (oldest cell, overwritten next) and `j24` (14 cells behind
//! it), both moving downwards. Here the window is kept oldest first and
//! only the ring phase is tracked, which is all the state vector needs.
//!
//! ```
//! use ranlux::LegacyRanlux;
//!
//! let mut gen = LegacyRanlux::default();
//! let mut out = [0f32; 5];
//! gen.ranlux(&mut out);
//! assert!((out[0] - 0.539_818_17).abs() < 1e-7);
//! ```

use core::num::NonZeroU64;

use crate::error::{Error, Result};
use crate::pack::{UnpackedState, LANES, LANE_MASK, SHORT_LAG};
use crate::ranluxpp::RanluxPP;
use crate::seed::{seed_state, DEFAULT_SEED};
use crate::swb::Ranlux;
use crate::LUXURY_TABLE;

/// Highest classical luxury level.
const MAX_LEVEL: i32 = 4;

/// Largest accepted explicit p-value.
const MAX_P: i32 = 2000;

/// Position counter split of `rluxat`/`rluxgo`.
const KOUNT_BITS: u32 = 30;

const TWO_M24: f64 = 1.0 / (1u64 << 24) as f64;
const TWO_M48: f64 = TWO_M24 * TWO_M24;

/// Values below this many 2^-24 units get 24 more bits.
const PAD_BELOW: u32 = 1 << 12;

/// Something that moves an unpacked window forward by whole steps.
pub trait SkipEngine {
    /// Advances `s` by `steps` recurrence steps.
    fn skip(&mut self, s: &mut UnpackedState, steps: u64);

    /// Called whenever the per-batch skip changes to `steps`.
    fn prepare(&mut self, _steps: u64) {}
}

impl SkipEngine for Ranlux {
    #[inline]
    fn skip(&mut self, s: &mut UnpackedState, steps: u64) {
        Ranlux::skip_state(s, steps);
    }
}

/// Jumps with one multiplication, then replays the last window step by
/// step: an LCG value fixes the window only up to the borrow twin of its
/// oldest lane, and the classical output reads that lane.
impl SkipEngine for RanluxPP {
    fn skip(&mut self, s: &mut UnpackedState, steps: u64) {
        let window = LANES as u64;

        if steps > window {
            self.load(s);
            self.advance(steps - window);
            *s = self.unpacked();
        }

        Ranlux::skip_state(s, steps.min(window));
    }

    fn prepare(&mut self, steps: u64) {
        if let Some(jump) = NonZeroU64::new(steps.saturating_sub(LANES as u64)) {
            self.set_skip(jump);
        }
    }
}

/// Classical generator over the skipping engine `E`.
#[derive(Debug, Clone)]
pub struct Legacy<E: SkipEngine> {
    engine: E,
    state: UnpackedState,
    /// 1-based ring position of the oldest lane, the classical `i24`.
    i24: u32,
    /// Numbers delivered in the current batch of 24.
    in24: u32,
    /// Level `0..=4` or an explicit p-value.
    luxlev: i32,
    nskip: u32,
    inseed: i32,
    /// Numbers generated so far, delivered and skipped.
    kount: u64,
    initialized: bool,
}

/// Classical API backed by the scalar engine.
pub type LegacyRanlux = Legacy<Ranlux>;

/// Classical API backed by the 576-bit LCG engine.
pub type LegacyPP = Legacy<RanluxPP>;

impl<E: SkipEngine + Default> Legacy<E> {
    /// Initialized as `rluxgo(luxury, seed, 0, 0)`.
    pub fn new(seed: i32, luxury: i32) -> Self {
        let mut gen = Self::with_engine(E::default());
        gen.rluxgo(luxury, seed, 0, 0);

        gen
    }
}

impl<E: SkipEngine + Default> Default for Legacy<E> {
    /// Uninitialized; the first `ranlux` call performs the default
    /// initialization (level 3, seed 314159265).
    fn default() -> Self {
        Self::with_engine(E::default())
    }
}

impl<E: SkipEngine> Legacy<E> {
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine,
            state: seed_state(DEFAULT_SEED),
            i24: LANES as u32,
            in24: 0,
            luxlev: 3,
            nskip: LUXURY_TABLE[3] - LANES as u32,
            inseed: DEFAULT_SEED as i32,
            kount: 0,
            initialized: false,
        }
    }

    #[inline]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Current window and borrow, oldest lane first.
    #[inline]
    pub fn state(&self) -> &UnpackedState {
        &self.state
    }

    /// Numbers skipped after every 24 delivered.
    #[inline]
    pub fn nskip(&self) -> u32 {
        self.nskip
    }

    #[inline]
    fn j24(&self) -> u32 {
        (self.i24 - 1 + SHORT_LAG as u32) % LANES as u32 + 1
    }

    fn set_luxury(&mut self, luxlev: i32, nskip: u32) {
        self.luxlev = luxlev;
        self.nskip = nskip;
        self.engine.prepare(nskip as u64);
    }

    /// Steps the window and the ring phase together.
    fn step(&mut self, steps: u64) {
        if steps == 0 {
            return;
        }

        self.engine.skip(&mut self.state, steps);

        let back = (steps % LANES as u64) as u32;
        self.i24 = (self.i24 - 1 + LANES as u32 - back) % LANES as u32 + 1;
    }

    /// Full (re)initialization.
    ///
    /// * `lux`: negative selects level 3, `0..=4` a level, `24..=2000` an
    ///   explicit p-value (mapped back to a level when it is one of the
    ///   table values); anything else falls back to level 4.
    /// * `ins`: positive seeds are used as is, anything else selects the
    ///   default seed 314159265.
    /// * `k1 + k2 * 2^30` numbers are skipped, as reported by
    ///   [`Legacy::rluxat`].
    pub fn rluxgo(&mut self, lux: i32, ins: i32, k1: i32, k2: i32) {
        let (luxlev, nskip) = if lux < 0 {
            (3, LUXURY_TABLE[3] - LANES as u32)
        } else if lux <= MAX_LEVEL {
            (lux, LUXURY_TABLE[lux as usize] - LANES as u32)
        } else if lux < LANES as i32 || lux > MAX_P {
            warn!("RANLUX: illegal luxury rluxgo: {lux}, using level {MAX_LEVEL}");

            (MAX_LEVEL, LUXURY_TABLE[MAX_LEVEL as usize] - LANES as u32)
        } else {
            let level = LUXURY_TABLE.iter().position(|&p| p == lux as u32);
            info!("RANLUX: p-value set by rluxgo to: {lux}");

            (level.map_or(lux, |l| l as i32), lux as u32 - LANES as u32)
        };

        self.set_luxury(luxlev, nskip);
        info!("RANLUX: luxury level set by rluxgo: {luxlev}, p = {}", nskip + LANES as u32);

        let seed = if ins > 0 {
            ins
        } else {
            if ins < 0 {
                warn!("RANLUX: illegal initialization by rluxgo, negative input seed {ins}");
            }

            DEFAULT_SEED as i32
        };

        info!("RANLUX: initialized by rluxgo from seed {seed}");

        self.inseed = seed;
        self.state = seed_state(seed as u32);
        self.i24 = LANES as u32;
        self.in24 = 0;
        self.initialized = true;

        let kount = (k1.max(0) as u64) + ((k2.max(0) as u64) << KOUNT_BITS);
        self.kount = kount;

        if kount == 0 {
            return;
        }

        info!("RANLUX: skipping {kount} numbers ({k2} * 2^{KOUNT_BITS} + {k1})");
        self.step(kount);

        let in24 = kount % (self.nskip as u64 + LANES as u64);

        if in24 >= LANES as u64 {
            warn!("RANLUX: illegal restart position {in24}, restarting at the start of a batch");
            self.in24 = 0;
        } else {
            self.in24 = in24 as u32;
        }
    }

    /// Fills `out` with deviates in `(0, 1)`.
    pub fn ranlux(&mut self, out: &mut [f32]) {
        if !self.initialized {
            info!("RANLUX: default initialization");
            self.rluxgo(3, 0, 0, 0);
        }

        let mut done = 0;

        while done < out.len() {
            let take = (LANES - self.in24 as usize).min(out.len() - done);
            let old = self.state;

            self.step(take as u64);

            // the new values are the `take` newest lanes
            for (t, v) in out[done..done + take].iter_mut().enumerate() {
                let k = LANES - take + t;

                let lagged = if k >= 9 {
                    self.state.lanes[k - 9]
                } else {
                    old.lanes[k + take - 9]
                };

                *v = deviate(self.state.lanes[k], lagged);
            }

            done += take;
            self.in24 += take as u32;
            self.kount += take as u64;

            if self.in24 == LANES as u32 {
                self.in24 = 0;
                self.kount += self.nskip as u64;
                self.step(self.nskip as u64);
            }
        }
    }

    /// The classical 25-word state vector: the 24 ring cells, then
    /// `i24 + 100 j24 + 10^4 in24 + 10^6 luxlev`, negated if the borrow is
    /// set.
    pub fn rluxut(&self) -> [i32; 25] {
        let mut v = [0i32; 25];
        let i = self.i24 as usize - 1;

        for (cell, w) in v[..LANES].iter_mut().enumerate() {
            *w = self.state.lanes[(i + LANES - cell) % LANES] as i32;
        }

        let packed = self.i24 as i32 + 100 * self.j24() as i32 + 10_000 * self.in24 as i32 + 1_000_000 * self.luxlev;
        v[LANES] = if self.state.carry { -packed } else { packed };

        v
    }

    /// Restores a vector produced by [`Legacy::rluxut`].
    ///
    /// Counters are left alone and the seed is reported as `-1` afterwards.
    /// A vector no generator could have produced is rejected.
    pub fn rluxin(&mut self, v: &[i32; 25]) -> Result<()> {
        if let Some(bad) = v[..LANES].iter().find(|&&w| w < 0 || w as u32 > LANE_MASK) {
            return Err(Error::InvalidStateVector(format!("ring cell {bad} is not a 24-bit value")));
        }

        let carry = v[LANES] < 0;
        let isd = v[LANES].unsigned_abs();

        let i24 = isd % 100;
        let j24 = isd / 100 % 100;
        let in24 = isd / 10_000 % 100;
        let lux = (isd / 1_000_000) as i32;

        if !(1..=LANES as u32).contains(&i24) {
            return Err(Error::InvalidStateVector(format!("pointer i24 = {i24} outside 1..=24")));
        }

        if j24 != (i24 - 1 + SHORT_LAG as u32) % LANES as u32 + 1 {
            return Err(Error::InvalidStateVector(format!("pointer j24 = {j24} does not trail i24 = {i24}")));
        }

        if in24 >= LANES as u32 {
            return Err(Error::InvalidStateVector(format!("batch position {in24} outside 0..24")));
        }

        let (luxlev, nskip) = if lux <= MAX_LEVEL {
            (lux, LUXURY_TABLE[lux as usize] - LANES as u32)
        } else if lux >= LANES as i32 {
            (lux, lux as u32 - LANES as u32)
        } else {
            warn!("RANLUX: illegal luxury rluxin: {lux}, using level {MAX_LEVEL}");

            (MAX_LEVEL, LUXURY_TABLE[MAX_LEVEL as usize] - LANES as u32)
        };

        self.set_luxury(luxlev, nskip);
        info!("RANLUX: restarted with luxury {luxlev}, p = {}", nskip + LANES as u32);

        let i = i24 as usize - 1;
        let lanes = core::array::from_fn(|j| v[(i + LANES - j) % LANES] as u32);

        self.state = UnpackedState::new(lanes, carry);
        self.i24 = i24;
        self.in24 = in24;
        self.inseed = -1;
        self.initialized = true;

        Ok(())
    }

    /// `(luxury, seed, k1, k2)`: the arguments of the `rluxgo` call that
    /// restarts at the current position.
    pub fn rluxat(&self) -> (i32, i32, i32, i32) {
        let mask = (1u64 << KOUNT_BITS) - 1;

        (
            self.luxlev,
            self.inseed,
            (self.kount & mask) as i32,
            (self.kount >> KOUNT_BITS) as i32,
        )
    }
}

/// Scales `u` into `(0, 1)`, padding values below `2^-12` with the lagged
/// lane as 24 extra bits.
#[inline]
fn deviate(u: u32, lagged: u32) -> f32 {
    if u >= PAD_BELOW {
        return (u as f64 * TWO_M24) as f32;
    }

    let r = (u as f64 * TWO_M24 + lagged as f64 * TWO_M48) as f32;

    if r == 0.0 {
        TWO_M48 as f32
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draws<E: SkipEngine>(g: &mut Legacy<E>, n: usize) -> Vec<f32> {
        let mut out = vec![0f32; n];
        g.ranlux(&mut out);

        out
    }

    #[test]
    fn test_deviate_padding() {
        assert_eq!(deviate(0, 0), TWO_M48 as f32, "zero is never returned");
        assert_eq!(deviate(4096, 77), 4096.0 / 16_777_216.0, "no padding from 2^-12 up");
        assert_eq!(deviate(100, 5), (100.0 * TWO_M24 + 5.0 * TWO_M48) as f32);
        assert!(deviate(0, 3) > 0.0);
    }

    #[test]
    fn test_luxury_fallbacks() {
        let mut g = LegacyRanlux::default();

        g.rluxgo(-5, 1, 0, 0);
        assert_eq!((g.rluxat().0, g.nskip()), (3, 199));

        g.rluxgo(7, 1, 0, 0);
        assert_eq!((g.rluxat().0, g.nskip()), (4, 365), "values between 4 and 24 fall back to level 4");

        g.rluxgo(3000, 1, 0, 0);
        assert_eq!((g.rluxat().0, g.nskip()), (4, 365));

        g.rluxgo(97, 1, 0, 0);
        assert_eq!((g.rluxat().0, g.nskip()), (2, 73), "table p-values map back to their level");

        g.rluxgo(75, 1, 0, 0);
        assert_eq!((g.rluxat().0, g.nskip()), (75, 51));
    }

    #[test]
    fn test_pp_jump_follows_nskip() {
        let mut g = LegacyPP::new(1, 3);
        assert_eq!(g.engine().skip_distance(), 199 - 24);

        g.rluxgo(4, 1, 0, 0);
        assert_eq!(g.engine().skip_distance(), 365 - 24);

        g.rluxgo(75, 1, 0, 0);
        assert_eq!(g.engine().skip_distance(), 51 - 24);

        // level 0 skips nothing beyond the replayed window
        g.rluxgo(0, 1, 0, 0);
        assert_eq!(g.engine().skip_distance(), 51 - 24, "no jump to precompute at level 0");
    }

    #[test]
    fn test_seed_fallback() {
        let mut a = LegacyRanlux::new(-12, 3);
        let mut b = LegacyRanlux::new(0, 3);
        let mut c = LegacyRanlux::new(314_159_265, 3);

        assert_eq!(a.rluxat().1, 314_159_265);
        assert_eq!(draws(&mut a, 50), draws(&mut c, 50));
        assert_eq!(draws(&mut b, 50), draws(&mut LegacyRanlux::new(314_159_265, 3), 50));
    }

    #[test]
    fn test_fresh_vector_layout() {
        let g = LegacyRanlux::new(1, 0);
        let v = g.rluxut();
        let s = seed_state(1);

        // cell k holds the k-th seed word, the oldest lane is the 24th
        assert_eq!(v[0] as u32, s.lanes[23]);
        assert_eq!(v[23] as u32, s.lanes[0]);
        assert_eq!(v[24].unsigned_abs(), 24 + 100 * 10);
    }

    #[test]
    fn test_ring_phase_follows_steps() {
        let mut g = LegacyRanlux::new(1, 0);
        let _ = draws(&mut g, 5);

        let v = g.rluxut();
        let packed = v[24].unsigned_abs();

        assert_eq!(packed % 100, 19, "i24 moves down one cell per number");
        assert_eq!(packed / 100 % 100, 5);
        assert_eq!(packed / 10_000 % 100, 5);
    }

    #[test]
    fn test_rluxin_rejects_garbage() {
        let mut g = LegacyRanlux::new(1, 3);
        let good = g.rluxut();

        let mut v = good;
        v[3] = 1 << 24;
        assert!(matches!(g.rluxin(&v), Err(Error::InvalidStateVector(_))));

        let mut v = good;
        v[24] = 3_000_025;
        assert!(g.rluxin(&v).is_err(), "i24 = 25");

        let mut v = good;
        v[24] = 3_000_324;
        assert!(g.rluxin(&v).is_err(), "j24 not trailing i24");

        let mut v = good;
        v[24] = 3_241_024;
        assert!(g.rluxin(&v).is_err(), "in24 = 24");

        assert_eq!(g.rluxin(&good), Ok(()));
    }

    #[test]
    fn test_rluxin_keeps_counters_and_drops_seed() {
        let mut g = LegacyRanlux::new(5, 1);
        let _ = draws(&mut g, 30);

        let v = g.rluxut();
        let before = g.rluxat();

        g.rluxin(&v).unwrap();
        let after = g.rluxat();

        assert_eq!((after.0, after.1, after.2, after.3), (before.0, -1, before.2, before.3));
    }

    #[test]
    fn test_illegal_restart_position_resets_batch() {
        // position 30 of a level 1 batch (24 delivered, 24 skipped) is a skipped one
        let mut g = LegacyRanlux::default();
        g.rluxgo(1, 1, 30, 0);

        assert_eq!(g.rluxut()[24].unsigned_abs() / 10_000 % 100, 0);
        assert_eq!(g.rluxat().2, 30);
    }

    #[test]
    fn test_engines_agree() {
        let mut a = LegacyRanlux::new(1, 4);
        let mut b = LegacyPP::new(1, 4);

        assert_eq!(draws(&mut a, 1000), draws(&mut b, 1000));
        assert_eq!(a.rluxut(), b.rluxut());

        a.rluxgo(300, 7, 12345, 0);
        b.rluxgo(300, 7, 12345, 0);

        assert_eq!(draws(&mut a, 500), draws(&mut b, 500));
        assert_eq!(a.rluxut(), b.rluxut());
    }
}
