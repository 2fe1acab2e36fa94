//! # Portable Engine
//!
//! Plain lane arrays, used where no SIMD backend is available and as the
//! scalar (`u32`, one lane) engine.

use super::Lanes;
use crate::pack::LANE_MASK;

#[inline(always)]
fn sub_borrow_word(a: u32, b: u32, borrow: u32) -> (u32, u32) {
    // a, b < 2^24 so the wrapped difference is negative iff bit 31 is set
    let t = a.wrapping_sub(b).wrapping_sub(borrow);

    (t & LANE_MASK, t >> 31)
}

unsafe impl Lanes for u32 {
    const WIDTH: usize = 1;

    #[inline(always)]
    fn splat(v: u32) -> Self {
        v
    }

    #[inline(always)]
    fn from_words(w: &[u32]) -> Self {
        w[0]
    }

    #[inline(always)]
    fn sub_borrow(a: Self, b: Self, borrow: Self) -> (Self, Self) {
        sub_borrow_word(a, b, borrow)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub(crate) struct Portable<const W: usize>(pub(crate) [u32; W]);

unsafe impl<const W: usize> Lanes for Portable<W> {
    const WIDTH: usize = W;

    #[inline(always)]
    fn splat(v: u32) -> Self {
        Self([v; W])
    }

    #[inline(always)]
    fn from_words(w: &[u32]) -> Self {
        let mut out = [0u32; W];
        out.copy_from_slice(&w[..W]);

        Self(out)
    }

    #[inline(always)]
    fn sub_borrow(a: Self, b: Self, borrow: Self) -> (Self, Self) {
        let mut r = [0u32; W];
        let mut c = [0u32; W];

        for k in 0..W {
            (r[k], c[k]) = sub_borrow_word(a.0[k], b.0[k], borrow.0[k]);
        }

        (Self(r), Self(c))
    }
}
