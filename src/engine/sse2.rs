//! # SSE2 Engine
//!
//! Four independent streams, one per 32-bit lane of an `__m128i`.

use super::Lanes;
use crate::pack::LANE_MASK;
use core::arch::x86_64::*;

#[derive(Clone, Copy)]
#[repr(transparent)]
pub(crate) struct Sse2(__m128i);

unsafe impl Lanes for Sse2 {
    const WIDTH: usize = 4;

    #[inline(always)]
    fn splat(v: u32) -> Self {
        unsafe { Self(_mm_set1_epi32(v as i32)) }
    }

    #[inline(always)]
    fn from_words(w: &[u32]) -> Self {
        assert!(w.len() >= Self::WIDTH);

        unsafe { Self(_mm_loadu_si128(w.as_ptr() as *const __m128i)) }
    }

    #[inline(always)]
    fn sub_borrow(a: Self, b: Self, borrow: Self) -> (Self, Self) {
        unsafe { sub_borrow(a.0, b.0, borrow.0) }
    }
}

#[inline(always)]
#[allow(unsafe_op_in_unsafe_fn)]
/// Lane-wise subtract with borrow
///
/// ## Algo
///
/// ```md
/// t      = a - b - c          (wrapping, 32 bit)
/// out    = t & (2^24 - 1)
/// borrow = t >> 31            (logical, sign bit of t)
/// ```
unsafe fn sub_borrow(a: __m128i, b: __m128i, c: __m128i) -> (Sse2, Sse2) {
    let mask = _mm_set1_epi32(LANE_MASK as i32);
    let t = _mm_sub_epi32(_mm_sub_epi32(a, b), c);

    (Sse2(_mm_and_si128(t, mask)), Sse2(_mm_srli_epi32(t, 31)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::portable::Portable;

    fn words(v: Sse2) -> [u32; 4] {
        let mut out = [0u32; 4];
        unsafe { _mm_storeu_si128(out.as_mut_ptr() as *mut __m128i, v.0) };

        out
    }

    mod engine {
        use super::*;

        #[test]
        fn test_splat_fills_every_lane() {
            assert_eq!(words(Sse2::splat(0xabcdef)), [0xabcdef; 4]);
        }

        #[test]
        fn test_from_words_keeps_lane_order() {
            assert_eq!(words(Sse2::from_words(&[1, 2, 3, 4])), [1, 2, 3, 4]);
        }

        #[test]
        fn test_sub_borrow_matches_portable() {
            let a = [0u32, 10, LANE_MASK, 12345];
            let b = [0u32, 11, 0, 12345];
            let c = [1u32, 0, 1, 0];

            let (r, borrow) = Sse2::sub_borrow(Sse2::from_words(&a), Sse2::from_words(&b), Sse2::from_words(&c));
            let (pr, pb) = Portable::sub_borrow(Portable(a), Portable(b), Portable(c));

            assert_eq!(words(r), pr.0, "difference lanes differ from portable");
            assert_eq!(words(borrow), pb.0, "borrow lanes differ from portable");
        }

        #[test]
        fn test_advance_matches_portable() {
            let mut x: [Sse2; 24] = core::array::from_fn(|j| Sse2::from_words(&[j as u32 * 7919, 3, j as u32, 1 << 23]));
            let mut c = Sse2::splat(1);

            let mut px: [Portable<4>; 24] = core::array::from_fn(|j| Portable([j as u32 * 7919, 3, j as u32, 1 << 23]));
            let mut pc = Portable::splat(1);

            crate::engine::advance(&mut x, &mut c, 389);
            crate::engine::advance(&mut px, &mut pc, 389);

            for j in 0..24 {
                assert_eq!(words(x[j]), px[j].0, "lane word {j} diverged");
            }

            assert_eq!(words(c), pc.0);
        }
    }
}
