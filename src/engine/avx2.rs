//! # AVX2 Engine
//!
//! Eight independent streams in one `__m256i`. Only compiled when the
//! target enables `avx2` at build time.

use super::Lanes;
use crate::pack::LANE_MASK;
use core::arch::x86_64::*;

#[derive(Clone, Copy)]
#[repr(transparent)]
pub(crate) struct Avx2(__m256i);

unsafe impl Lanes for Avx2 {
    const WIDTH: usize = 8;

    #[inline(always)]
    fn splat(v: u32) -> Self {
        unsafe { Self(_mm256_set1_epi32(v as i32)) }
    }

    #[inline(always)]
    fn from_words(w: &[u32]) -> Self {
        assert!(w.len() >= Self::WIDTH);

        unsafe { Self(_mm256_loadu_si256(w.as_ptr() as *const __m256i)) }
    }

    #[inline(always)]
    fn sub_borrow(a: Self, b: Self, borrow: Self) -> (Self, Self) {
        unsafe {
            let mask = _mm256_set1_epi32(LANE_MASK as i32);
            let t = _mm256_sub_epi32(_mm256_sub_epi32(a.0, b.0), borrow.0);

            (Self(_mm256_and_si256(t, mask)), Self(_mm256_srli_epi32(t, 31)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::portable::Portable;

    fn words(v: Avx2) -> [u32; 8] {
        let mut out = [0u32; 8];
        unsafe { _mm256_storeu_si256(out.as_mut_ptr() as *mut __m256i, v.0) };

        out
    }

    #[test]
    fn test_from_words_keeps_lane_order() {
        let w = [1, 2, 3, 4, 5, 6, 7, 8];

        assert_eq!(words(Avx2::from_words(&w)), w);
    }

    #[test]
    fn test_advance_matches_portable() {
        let seed = |j: usize| core::array::from_fn::<u32, 8, _>(|k| ((j * 31 + k * 977) as u32).wrapping_mul(40014) & LANE_MASK);

        let mut x: [Avx2; 24] = core::array::from_fn(|j| Avx2::from_words(&seed(j)));
        let mut c = Avx2::splat(0);

        let mut px: [Portable<8>; 24] = core::array::from_fn(|j| Portable(seed(j)));
        let mut pc = Portable::splat(0);

        crate::engine::advance(&mut x, &mut c, 223 * 3 + 5);
        crate::engine::advance(&mut px, &mut pc, 223 * 3 + 5);

        for j in 0..24 {
            assert_eq!(words(x[j]), px[j].0, "lane word {j} diverged");
        }

        assert_eq!(words(c), pc.0);
    }
}
