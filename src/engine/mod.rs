pub(crate) mod portable;

#[cfg(target_arch = "x86_64")]
pub(crate) mod sse2;

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub(crate) mod avx2;

#[cfg(target_arch = "aarch64")]
pub(crate) mod neon;

use crate::pack::{UnpackedState, LANES};
use crate::seed::SeedLcg;
use crate::LaneSeeding;

/// Widest lane type any engine uses.
pub(crate) const MAX_WIDTH: usize = 8;

/// An N-lane vector of 32-bit words holding 24-bit RANLUX values.
///
/// # Safety
///
/// Implementors must have the size and layout of `[u32; WIDTH]`, so that a
/// `[Self; 24]` can be read as `24 * WIDTH` words in index-major order.
pub(crate) unsafe trait Lanes: Copy {
    const WIDTH: usize;

    fn splat(v: u32) -> Self;

    /// Loads lanes from `w[..WIDTH]`.
    fn from_words(w: &[u32]) -> Self;

    /// Lane-wise `(a - b - borrow) mod 2^24` and the outgoing borrow (0/1).
    fn sub_borrow(a: Self, b: Self, borrow: Self) -> (Self, Self);
}

/// 24 steps of `x[n] = x[n-10] - x[n-24] - c` in place.
///
/// Slot `i` holds `x[n-24+i]`; the new value for slot `i` reads slot
/// `i + 14` before it is overwritten (`i < 10`) and slot `i - 10` after
/// (`i >= 10`), so the window stays oldest-first without any rotation.
#[inline(always)]
pub(crate) fn batch<V: Lanes>(x: &mut [V; LANES], c: &mut V) {
    for i in 0..10 {
        let (r, b) = V::sub_borrow(x[i + 14], x[i], *c);

        x[i] = r;
        *c = b;
    }

    for i in 10..LANES {
        let (r, b) = V::sub_borrow(x[i - 10], x[i], *c);

        x[i] = r;
        *c = b;
    }
}

/// `n < 24` steps followed by a rotation back to oldest-first order.
#[inline(always)]
fn partial<V: Lanes>(x: &mut [V; LANES], c: &mut V, n: usize) {
    debug_assert!(n < LANES);

    for i in 0..n {
        let j = if i < 10 { i + 14 } else { i - 10 };
        let (r, b) = V::sub_borrow(x[j], x[i], *c);

        x[i] = r;
        *c = b;
    }

    x.rotate_left(n);
}

/// Advances every lane by `steps` recurrence steps.
#[inline]
pub(crate) fn advance<V: Lanes>(x: &mut [V; LANES], c: &mut V, steps: u64) {
    let full = steps / LANES as u64;
    let rest = (steps % LANES as u64) as usize;

    //
    // NOTE: Manual 4-way unroll of full windows for throughput
    //

    let mut k = 0u64;

    while k + 4 <= full {
        batch(x, c);
        batch(x, c);
        batch(x, c);
        batch(x, c);

        k += 4;
    }

    while k < full {
        batch(x, c);
        k += 1;
    }

    if rest != 0 {
        partial(x, c, rest);
    }
}

/// Builds the initial window of every lane from one seed.
///
/// Independent lanes take consecutive 24-word blocks of the seed sequence
/// (lane 0 sees exactly the scalar seeding); replicated lanes all take the
/// first block.
pub(crate) fn init_engine_state<V: Lanes>(seed: u32, mode: LaneSeeding) -> ([V; LANES], V) {
    debug_assert!(V::WIDTH <= MAX_WIDTH, "lane width exceeds MAX_WIDTH");

    let mut lcg = SeedLcg::new(seed);

    if mode == LaneSeeding::Replicated {
        let s = lcg.next_state();

        return (core::array::from_fn(|j| V::splat(s.lanes[j])), V::splat(s.carry as u32));
    }

    let mut lanes = [UnpackedState::default(); MAX_WIDTH];

    for lane in lanes[..V::WIDTH].iter_mut() {
        *lane = lcg.next_state();
    }

    let mut w = [0u32; MAX_WIDTH];

    let x = core::array::from_fn(|j| {
        for k in 0..V::WIDTH {
            w[k] = lanes[k].lanes[j];
        }

        V::from_words(&w[..V::WIDTH])
    });

    for k in 0..V::WIDTH {
        w[k] = lanes[k].carry as u32;
    }

    (x, V::from_words(&w[..V::WIDTH]))
}

#[cfg(test)]
mod tests {
    use super::portable::Portable;
    use super::*;
    use crate::pack::LANE_MASK;
    use crate::seed::seed_state;

    /// One step at a time on an oldest-first window.
    fn naive(s: &UnpackedState, steps: u64) -> UnpackedState {
        let mut lanes = s.lanes;
        let mut c = s.carry as u32;

        for _ in 0..steps {
            let t = lanes[14].wrapping_sub(lanes[0]).wrapping_sub(c);
            c = t >> 31;

            lanes.rotate_left(1);
            lanes[LANES - 1] = t & LANE_MASK;
        }

        UnpackedState::new(lanes, c == 1)
    }

    fn scalar_advance(s: &UnpackedState, steps: u64) -> UnpackedState {
        let mut x = s.lanes;
        let mut c = s.carry as u32;

        advance(&mut x, &mut c, steps);
        UnpackedState::new(x, c == 1)
    }

    #[test]
    fn test_batched_advance_matches_naive_recurrence() {
        let s = seed_state(314_159_265);

        for steps in [0u64, 1, 5, 10, 14, 23, 24, 25, 48, 97, 223, 389, 1000] {
            assert_eq!(scalar_advance(&s, steps), naive(&s, steps), "diverged at {steps} steps");
        }
    }

    #[test]
    fn test_advance_is_additive() {
        let s = seed_state(3124);
        let once = scalar_advance(&s, 223 + 389);
        let twice = scalar_advance(&scalar_advance(&s, 223), 389);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_lanes_stay_within_24_bits() {
        let mut s = seed_state(1);

        for _ in 0..100 {
            s = scalar_advance(&s, 97);
            assert!(s.is_valid());
        }
    }

    #[test]
    fn test_replicated_seeding_fills_every_lane_alike() {
        let (x, c) = init_engine_state::<Portable<4>>(3124, LaneSeeding::Replicated);
        let scalar = seed_state(3124);

        for j in 0..LANES {
            assert_eq!(x[j].0, [scalar.lanes[j]; 4]);
        }

        assert_eq!(c.0, [scalar.carry as u32; 4]);
    }

    #[test]
    fn test_independent_seeding_diversifies_lanes() {
        let (x, _) = init_engine_state::<Portable<8>>(3124, LaneSeeding::Independent);
        let scalar = seed_state(3124);

        assert!((0..LANES).all(|j| x[j].0[0] == scalar.lanes[j]), "lane 0 must match scalar seeding");

        for k in 1..8 {
            assert!((0..LANES).any(|j| x[j].0[k] != x[j].0[0]), "lane {k} duplicates lane 0");
        }
    }
}
