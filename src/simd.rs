//! Compile-time choice of the lane types behind the 4- and 8-wide engines.
//!
//! x86_64 always has SSE2 and aarch64 always has NEON, so the 4-wide engine
//! uses them unconditionally. The 8-wide engine needs AVX2 at build time
//! (`-C target-feature=+avx2` or `target-cpu=native`); without it the lanes
//! fall back to plain arrays, which produce identical output.

#[cfg(target_arch = "x86_64")]
pub(crate) type Lanes4 = crate::engine::sse2::Sse2;

#[cfg(target_arch = "aarch64")]
pub(crate) type Lanes4 = crate::engine::neon::Neon;

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub(crate) type Lanes4 = crate::engine::portable::Portable<4>;

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub(crate) type Lanes8 = crate::engine::avx2::Avx2;

#[cfg(not(all(target_arch = "x86_64", target_feature = "avx2")))]
pub(crate) type Lanes8 = crate::engine::portable::Portable<8>;
