//! Metric kernels, one submodule per instruction-set tier.
//!
//! # Module Structure
//!
//! - `serial`: portable baseline, covers every (metric, datatype) pair
//! - `x86_avx2`: AVX2 + FMA (+ F16C for half precision), x86_64 only
//! - `x86_avx512`: AVX-512 F + BW with masked tails, x86_64 only
//! - `neon`: Advanced SIMD, aarch64 only
//!
//! Every tier exposes `resolve(kind, datatype) -> Option<KernelFn>`; the
//! dispatcher only asks a tier once its capability bits are known to be
//! present, which is what makes calling the `unsafe` pointers sound.
//!
//! # Tails and reduction order
//!
//! Kernels accept any dimension. Whole vector blocks go through the SIMD
//! body, the remainder through a scalar loop (AVX-512 uses masked loads
//! instead). Partial accumulators are always combined pairwise in the same
//! order, then horizontally summed, then the scalar tail is added.

// =============================================================================
// Unsafe Invariants Reference
// =============================================================================
// SAFETY: Shared invariants for SIMD unsafe blocks in this module tree.
// - Condition 1: Pointer offsets are derived from slice pointers with loop
//   bounds proving in-range access for each lane width.
// - Condition 2: Target-featured functions are only reachable through a
//   `KernelHandle`, built after the dispatcher confirmed the tier's
//   capability bits against the detected mask.
// - Condition 3: Loads use unaligned (`loadu`/`vld1`) or masked intrinsics.
// - Condition 4: Both slices have the same length; `KernelHandle::compute`
//   checks it, `compute_unchecked` moves the obligation to the caller.
//   Every SIMD kernel also `debug_assert`s it on entry.

use half::f16;

pub(crate) mod serial;

#[cfg(all(target_arch = "x86_64", feature = "avx2"))]
pub(crate) mod x86_avx2;

#[cfg(all(target_arch = "x86_64", feature = "avx512"))]
pub(crate) mod x86_avx512;

#[cfg(all(target_arch = "aarch64", feature = "neon"))]
pub(crate) mod neon;

/// Kernel over two dense vectors producing a real score.
pub(crate) type DenseFn<T> = unsafe fn(&[T], &[T]) -> f32;

/// Kernel over two bit-packed vectors producing a bit count.
pub(crate) type CountFn = unsafe fn(&[u8], &[u8]) -> u64;

/// Typed kernel pointer, one variant per element type and result shape.
#[derive(Clone, Copy)]
pub(crate) enum KernelFn {
    F64(DenseFn<f64>),
    F32(DenseFn<f32>),
    F16(DenseFn<f16>),
    I8(DenseFn<i8>),
    B1(DenseFn<u8>),
    B1Count(CountFn),
}

/// Integer SIMD kernels move their 32-bit lane sums into an `i64` total
/// after this many loop iterations, well before a lane can overflow.
#[cfg(any(
    all(target_arch = "x86_64", any(feature = "avx2", feature = "avx512")),
    all(target_arch = "aarch64", feature = "neon")
))]
pub(crate) const I8_SPILL_INTERVAL: usize = 1024;

/// Cosine similarity from the three single-pass sums.
///
/// Zero vectors are not special-cased: `0 / 0` yields NaN.
#[inline]
#[must_use]
pub(crate) fn cosine_from_parts(ab: f32, a2: f32, b2: f32) -> f32 {
    ab / (a2.sqrt() * b2.sqrt())
}

/// Double precision variant of [`cosine_from_parts`], narrowed at the end.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Reason: the public score type is f32.
pub(crate) fn cosine_from_parts_f64(ab: f64, a2: f64, b2: f64) -> f32 {
    (ab / (a2.sqrt() * b2.sqrt())) as f32
}

/// Integer sums are finalized in `f64` so large dimensions keep precision.
#[inline]
#[must_use]
#[allow(clippy::cast_precision_loss)] // Reason: i64 sums of i8 products fit f64's mantissa in practice.
pub(crate) fn cosine_from_parts_i64(ab: i64, a2: i64, b2: i64) -> f32 {
    cosine_from_parts_f64(ab as f64, a2 as f64, b2 as f64)
}

#[cfg(test)]
mod serial_tests;

#[cfg(test)]
mod cross_tier_tests;
