//! # NEON Engine
//!
//! Four independent streams in one `uint32x4_t`.

use super::Lanes;
use crate::pack::LANE_MASK;
use core::arch::aarch64::*;

#[derive(Clone, Copy)]
#[repr(transparent)]
pub(crate) struct Neon(uint32x4_t);

unsafe impl Lanes for Neon {
    const WIDTH: usize = 4;

    #[inline(always)]
    fn splat(v: u32) -> Self {
        unsafe { Self(vdupq_n_u32(v)) }
    }

    #[inline(always)]
    fn from_words(w: &[u32]) -> Self {
        assert!(w.len() >= Self::WIDTH);

        unsafe { Self(vld1q_u32(w.as_ptr())) }
    }

    #[inline(always)]
    fn sub_borrow(a: Self, b: Self, borrow: Self) -> (Self, Self) {
        unsafe { sub_borrow(a.0, b.0, borrow.0) }
    }
}

#[inline(always)]
#[allow(unsafe_op_in_unsafe_fn)]
/// `t = a - b - c`, low 24 bits out, sign bit of `t` as the new borrow
unsafe fn sub_borrow(a: uint32x4_t, b: uint32x4_t, c: uint32x4_t) -> (Neon, Neon) {
    let t = vsubq_u32(vsubq_u32(a, b), c);

    (Neon(vandq_u32(t, vdupq_n_u32(LANE_MASK))), Neon(vshrq_n_u32::<31>(t)))
}
