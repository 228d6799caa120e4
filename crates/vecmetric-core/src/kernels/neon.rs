//! ARM NEON kernel implementations for aarch64.
//!
//! 128-bit kernels for every dense datatype plus binary Hamming. Half
//! precision is widened to f32 eight elements at a time through the `half`
//! crate and accumulated with `vfmaq_f32`; `i8` is widened to 16 bits and
//! multiply-accumulated into 32-bit lanes.
//!
//! NEON is always available on aarch64, so no target feature is enabled
//! per function. The kernels are still `unsafe`: their vector loads trust
//! `a.len() == b.len()`, which debug builds assert.

// SAFETY: Numeric casts in this file are intentional and safe:
// - f64 -> f32 narrowing is the score contract
// - i64 -> f32 converts integer sums of bounded i8 products
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]

use std::arch::aarch64::*;

use half::f16;
use half::slice::HalfFloatSliceExt;

use super::{
    cosine_from_parts, cosine_from_parts_f64, cosine_from_parts_i64, serial, KernelFn,
    I8_SPILL_INTERVAL,
};
use crate::metric::{DataType, MetricKind};

pub(crate) fn resolve(kind: MetricKind, datatype: DataType) -> Option<KernelFn> {
    use MetricKind::{Cosine, Hamming, InnerProduct, SquaredEuclidean};

    let kernel = match (datatype, kind) {
        (DataType::F64, InnerProduct) => KernelFn::F64(dot_f64),
        (DataType::F64, Cosine) => KernelFn::F64(cos_f64),
        (DataType::F64, SquaredEuclidean) => KernelFn::F64(l2sq_f64),
        (DataType::F32, InnerProduct) => KernelFn::F32(dot_f32),
        (DataType::F32, Cosine) => KernelFn::F32(cos_f32),
        (DataType::F32, SquaredEuclidean) => KernelFn::F32(l2sq_f32),
        (DataType::F16, InnerProduct) => KernelFn::F16(dot_f16),
        (DataType::F16, Cosine) => KernelFn::F16(cos_f16),
        (DataType::F16, SquaredEuclidean) => KernelFn::F16(l2sq_f16),
        (DataType::I8, InnerProduct) => KernelFn::I8(dot_i8),
        (DataType::I8, Cosine) => KernelFn::I8(cos_i8),
        (DataType::I8, SquaredEuclidean) => KernelFn::I8(l2sq_i8),
        (DataType::B1, Hamming) => KernelFn::B1Count(hamming_b1),
        _ => return None,
    };
    Some(kernel)
}

// =============================================================================
// f64
// =============================================================================

/// # Safety
///
/// `a.len() == b.len()`; loads are bounded by `a.len()` only.
pub(crate) unsafe fn dot_f64(a: &[f64], b: &[f64]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut i = 0;

    // SAFETY: i + 2 <= n for both slices (equal length); vld1q_f64 is unaligned-safe.
    let mut result = unsafe {
        let mut acc0 = vdupq_n_f64(0.0);
        let mut acc1 = vdupq_n_f64(0.0);
        while i + 4 <= n {
            acc0 = vfmaq_f64(acc0, vld1q_f64(pa.add(i)), vld1q_f64(pb.add(i)));
            acc1 = vfmaq_f64(acc1, vld1q_f64(pa.add(i + 2)), vld1q_f64(pb.add(i + 2)));
            i += 4;
        }
        if i + 2 <= n {
            acc0 = vfmaq_f64(acc0, vld1q_f64(pa.add(i)), vld1q_f64(pb.add(i)));
            i += 2;
        }
        vaddvq_f64(vaddq_f64(acc0, acc1))
    };

    for j in i..n {
        result += a[j] * b[j];
    }
    result as f32
}

/// # Safety
///
/// Same contract as [`dot_f64`].
pub(crate) unsafe fn cos_f64(a: &[f64], b: &[f64]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut i = 0;

    // SAFETY: i + 2 <= n for both slices (equal length); vld1q_f64 is unaligned-safe.
    let (mut dot, mut norm_a, mut norm_b) = unsafe {
        let mut ab = vdupq_n_f64(0.0);
        let mut a2 = vdupq_n_f64(0.0);
        let mut b2 = vdupq_n_f64(0.0);
        while i + 2 <= n {
            let va = vld1q_f64(pa.add(i));
            let vb = vld1q_f64(pb.add(i));
            ab = vfmaq_f64(ab, va, vb);
            a2 = vfmaq_f64(a2, va, va);
            b2 = vfmaq_f64(b2, vb, vb);
            i += 2;
        }
        (vaddvq_f64(ab), vaddvq_f64(a2), vaddvq_f64(b2))
    };

    for j in i..n {
        let (x, y) = (a[j], b[j]);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    cosine_from_parts_f64(dot, norm_a, norm_b)
}

/// # Safety
///
/// Same contract as [`dot_f64`].
pub(crate) unsafe fn l2sq_f64(a: &[f64], b: &[f64]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut i = 0;

    // SAFETY: i + 2 <= n for both slices (equal length); vld1q_f64 is unaligned-safe.
    let mut result = unsafe {
        let mut acc = vdupq_n_f64(0.0);
        while i + 2 <= n {
            let d = vsubq_f64(vld1q_f64(pa.add(i)), vld1q_f64(pb.add(i)));
            acc = vfmaq_f64(acc, d, d);
            i += 2;
        }
        vaddvq_f64(acc)
    };

    for j in i..n {
        let d = a[j] - b[j];
        result += d * d;
    }
    result as f32
}

// =============================================================================
// f32
// =============================================================================

/// NEON f32 inner product with 4 accumulators (16 floats per iteration).
///
/// # Safety
///
/// Same contract as [`dot_f64`].
pub(crate) unsafe fn dot_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut i = 0;

    // SAFETY: Loop conditions keep every 4-lane load inside both slices;
    // vld1q_f32 handles unaligned loads safely on ARM64.
    let mut result = unsafe {
        let mut acc0 = vdupq_n_f32(0.0);
        let mut acc1 = vdupq_n_f32(0.0);
        let mut acc2 = vdupq_n_f32(0.0);
        let mut acc3 = vdupq_n_f32(0.0);
        while i + 16 <= n {
            acc0 = vfmaq_f32(acc0, vld1q_f32(pa.add(i)), vld1q_f32(pb.add(i)));
            acc1 = vfmaq_f32(acc1, vld1q_f32(pa.add(i + 4)), vld1q_f32(pb.add(i + 4)));
            acc2 = vfmaq_f32(acc2, vld1q_f32(pa.add(i + 8)), vld1q_f32(pb.add(i + 8)));
            acc3 = vfmaq_f32(acc3, vld1q_f32(pa.add(i + 12)), vld1q_f32(pb.add(i + 12)));
            i += 16;
        }
        let mut sum = vaddq_f32(vaddq_f32(acc0, acc1), vaddq_f32(acc2, acc3));
        while i + 4 <= n {
            sum = vfmaq_f32(sum, vld1q_f32(pa.add(i)), vld1q_f32(pb.add(i)));
            i += 4;
        }
        vaddvq_f32(sum)
    };

    for j in i..n {
        result += a[j] * b[j];
    }
    result
}

/// NEON fused cosine - dot product and both norms in one pass.
///
/// # Safety
///
/// Same contract as [`dot_f64`].
pub(crate) unsafe fn cos_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut i = 0;

    // SAFETY: i + 4 <= n for both slices; vld1q_f32 is unaligned-safe.
    let (mut dot, mut norm_a, mut norm_b) = unsafe {
        let mut ab = vdupq_n_f32(0.0);
        let mut a2 = vdupq_n_f32(0.0);
        let mut b2 = vdupq_n_f32(0.0);
        while i + 4 <= n {
            let va = vld1q_f32(pa.add(i));
            let vb = vld1q_f32(pb.add(i));
            ab = vfmaq_f32(ab, va, vb);
            a2 = vfmaq_f32(a2, va, va);
            b2 = vfmaq_f32(b2, vb, vb);
            i += 4;
        }
        (vaddvq_f32(ab), vaddvq_f32(a2), vaddvq_f32(b2))
    };

    for j in i..n {
        let (x, y) = (a[j], b[j]);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    cosine_from_parts(dot, norm_a, norm_b)
}

/// # Safety
///
/// Same contract as [`dot_f64`].
pub(crate) unsafe fn l2sq_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut i = 0;

    // SAFETY: i + 8 <= n (then i + 4 <= n) for both slices; vld1q_f32 is unaligned-safe.
    let mut result = unsafe {
        let mut acc0 = vdupq_n_f32(0.0);
        let mut acc1 = vdupq_n_f32(0.0);
        while i + 8 <= n {
            let d0 = vsubq_f32(vld1q_f32(pa.add(i)), vld1q_f32(pb.add(i)));
            let d1 = vsubq_f32(vld1q_f32(pa.add(i + 4)), vld1q_f32(pb.add(i + 4)));
            acc0 = vfmaq_f32(acc0, d0, d0);
            acc1 = vfmaq_f32(acc1, d1, d1);
            i += 8;
        }
        if i + 4 <= n {
            let d = vsubq_f32(vld1q_f32(pa.add(i)), vld1q_f32(pb.add(i)));
            acc0 = vfmaq_f32(acc0, d, d);
            i += 4;
        }
        vaddvq_f32(vaddq_f32(acc0, acc1))
    };

    for j in i..n {
        let d = a[j] - b[j];
        result += d * d;
    }
    result
}

// =============================================================================
// f16 (widened eight at a time into a stack buffer)
// =============================================================================

const F16_BLOCK: usize = 8;

/// Widens one block of halves and loads it as two f32 vectors.
#[inline]
fn load_f16x8(src: &[f16]) -> (float32x4_t, float32x4_t) {
    let mut buf = [0.0_f32; F16_BLOCK];
    src.convert_to_f32_slice(&mut buf);
    // SAFETY: buf holds exactly 8 floats; each load reads 4.
    unsafe { (vld1q_f32(buf.as_ptr()), vld1q_f32(buf.as_ptr().add(4))) }
}

/// # Safety
///
/// Same contract as [`dot_f64`].
pub(crate) unsafe fn dot_f16(a: &[f16], b: &[f16]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut acc = [zero_f32x4(), zero_f32x4()];
    let blocks = a.len() / F16_BLOCK * F16_BLOCK;

    for (ca, cb) in a[..blocks]
        .chunks_exact(F16_BLOCK)
        .zip(b[..blocks].chunks_exact(F16_BLOCK))
    {
        let (a_lo, a_hi) = load_f16x8(ca);
        let (b_lo, b_hi) = load_f16x8(cb);
        // SAFETY: register-only arithmetic, NEON is baseline on aarch64.
        unsafe {
            acc[0] = vfmaq_f32(acc[0], a_lo, b_lo);
            acc[1] = vfmaq_f32(acc[1], a_hi, b_hi);
        }
    }

    // SAFETY: register-only reduction.
    let head = unsafe { vaddvq_f32(vaddq_f32(acc[0], acc[1])) };
    head + serial::dot_f16(&a[blocks..], &b[blocks..])
}

/// # Safety
///
/// Same contract as [`dot_f64`].
pub(crate) unsafe fn cos_f16(a: &[f16], b: &[f16]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut ab = zero_f32x4();
    let mut a2 = zero_f32x4();
    let mut b2 = zero_f32x4();
    let blocks = a.len() / F16_BLOCK * F16_BLOCK;

    for (ca, cb) in a[..blocks]
        .chunks_exact(F16_BLOCK)
        .zip(b[..blocks].chunks_exact(F16_BLOCK))
    {
        let (a_lo, a_hi) = load_f16x8(ca);
        let (b_lo, b_hi) = load_f16x8(cb);
        // SAFETY: register-only arithmetic, NEON is baseline on aarch64.
        unsafe {
            ab = vfmaq_f32(vfmaq_f32(ab, a_lo, b_lo), a_hi, b_hi);
            a2 = vfmaq_f32(vfmaq_f32(a2, a_lo, a_lo), a_hi, a_hi);
            b2 = vfmaq_f32(vfmaq_f32(b2, b_lo, b_lo), b_hi, b_hi);
        }
    }

    // SAFETY: register-only reduction.
    let (mut dot, mut norm_a, mut norm_b) =
        unsafe { (vaddvq_f32(ab), vaddvq_f32(a2), vaddvq_f32(b2)) };
    for (x, y) in a[blocks..].iter().zip(&b[blocks..]) {
        let (x, y) = (x.to_f32(), y.to_f32());
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    cosine_from_parts(dot, norm_a, norm_b)
}

/// # Safety
///
/// Same contract as [`dot_f64`].
pub(crate) unsafe fn l2sq_f16(a: &[f16], b: &[f16]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut acc = [zero_f32x4(), zero_f32x4()];
    let blocks = a.len() / F16_BLOCK * F16_BLOCK;

    for (ca, cb) in a[..blocks]
        .chunks_exact(F16_BLOCK)
        .zip(b[..blocks].chunks_exact(F16_BLOCK))
    {
        let (a_lo, a_hi) = load_f16x8(ca);
        let (b_lo, b_hi) = load_f16x8(cb);
        // SAFETY: register-only arithmetic, NEON is baseline on aarch64.
        unsafe {
            let d_lo = vsubq_f32(a_lo, b_lo);
            let d_hi = vsubq_f32(a_hi, b_hi);
            acc[0] = vfmaq_f32(acc[0], d_lo, d_lo);
            acc[1] = vfmaq_f32(acc[1], d_hi, d_hi);
        }
    }

    // SAFETY: register-only reduction.
    let head = unsafe { vaddvq_f32(vaddq_f32(acc[0], acc[1])) };
    head + serial::l2sq_f16(&a[blocks..], &b[blocks..])
}

#[inline]
fn zero_f32x4() -> float32x4_t {
    // SAFETY: NEON is baseline on aarch64.
    unsafe { vdupq_n_f32(0.0) }
}

// =============================================================================
// i8
// =============================================================================

/// Multiply-accumulates the widened 16-lane block `x * y` into `acc`.
///
/// # Safety
///
/// Register-only; NEON is baseline on aarch64.
#[inline]
unsafe fn mlal_i8x16(acc: int32x4_t, x: int8x16_t, y: int8x16_t) -> int32x4_t {
    let (x_lo, x_hi) = (vmovl_s8(vget_low_s8(x)), vmovl_high_s8(x));
    let (y_lo, y_hi) = (vmovl_s8(vget_low_s8(y)), vmovl_high_s8(y));
    let acc = vmlal_s16(acc, vget_low_s16(x_lo), vget_low_s16(y_lo));
    let acc = vmlal_high_s16(acc, x_lo, y_lo);
    let acc = vmlal_s16(acc, vget_low_s16(x_hi), vget_low_s16(y_hi));
    vmlal_high_s16(acc, x_hi, y_hi)
}

/// # Safety
///
/// Same contract as [`dot_f64`].
pub(crate) unsafe fn dot_i8(a: &[i8], b: &[i8]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut total = 0_i64;
    let mut i = 0;

    // SAFETY: i + 16 <= n for both slices; vld1q_s8 is unaligned-safe.
    unsafe {
        let mut acc = vdupq_n_s32(0);
        let mut pending = 0;
        while i + 16 <= n {
            acc = mlal_i8x16(acc, vld1q_s8(pa.add(i)), vld1q_s8(pb.add(i)));
            i += 16;
            pending += 1;
            if pending == I8_SPILL_INTERVAL {
                total += i64::from(vaddvq_s32(acc));
                acc = vdupq_n_s32(0);
                pending = 0;
            }
        }
        total += i64::from(vaddvq_s32(acc));
    }

    for j in i..n {
        total += i64::from(a[j]) * i64::from(b[j]);
    }
    total as f32
}

/// # Safety
///
/// Same contract as [`dot_f64`].
pub(crate) unsafe fn cos_i8(a: &[i8], b: &[i8]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let (mut dot, mut norm_a, mut norm_b) = (0_i64, 0_i64, 0_i64);
    let mut i = 0;

    // SAFETY: i + 16 <= n for both slices; vld1q_s8 is unaligned-safe.
    unsafe {
        let mut ab = vdupq_n_s32(0);
        let mut a2 = vdupq_n_s32(0);
        let mut b2 = vdupq_n_s32(0);
        let mut pending = 0;
        while i + 16 <= n {
            let va = vld1q_s8(pa.add(i));
            let vb = vld1q_s8(pb.add(i));
            ab = mlal_i8x16(ab, va, vb);
            a2 = mlal_i8x16(a2, va, va);
            b2 = mlal_i8x16(b2, vb, vb);
            i += 16;
            pending += 1;
            if pending == I8_SPILL_INTERVAL {
                dot += i64::from(vaddvq_s32(ab));
                norm_a += i64::from(vaddvq_s32(a2));
                norm_b += i64::from(vaddvq_s32(b2));
                ab = vdupq_n_s32(0);
                a2 = vdupq_n_s32(0);
                b2 = vdupq_n_s32(0);
                pending = 0;
            }
        }
        dot += i64::from(vaddvq_s32(ab));
        norm_a += i64::from(vaddvq_s32(a2));
        norm_b += i64::from(vaddvq_s32(b2));
    }

    for j in i..n {
        let (x, y) = (i64::from(a[j]), i64::from(b[j]));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    cosine_from_parts_i64(dot, norm_a, norm_b)
}

/// # Safety
///
/// Same contract as [`dot_f64`].
pub(crate) unsafe fn l2sq_i8(a: &[i8], b: &[i8]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut total = 0_i64;
    let mut i = 0;

    // SAFETY: i + 16 <= n for both slices; vld1q_s8 is unaligned-safe.
    unsafe {
        let mut acc = vdupq_n_s32(0);
        let mut pending = 0;
        while i + 16 <= n {
            let va = vld1q_s8(pa.add(i));
            let vb = vld1q_s8(pb.add(i));
            let d_lo = vsubl_s8(vget_low_s8(va), vget_low_s8(vb));
            let d_hi = vsubl_high_s8(va, vb);
            acc = vmlal_s16(acc, vget_low_s16(d_lo), vget_low_s16(d_lo));
            acc = vmlal_high_s16(acc, d_lo, d_lo);
            acc = vmlal_s16(acc, vget_low_s16(d_hi), vget_low_s16(d_hi));
            acc = vmlal_high_s16(acc, d_hi, d_hi);
            i += 16;
            pending += 1;
            if pending == I8_SPILL_INTERVAL {
                total += i64::from(vaddvq_s32(acc));
                acc = vdupq_n_s32(0);
                pending = 0;
            }
        }
        total += i64::from(vaddvq_s32(acc));
    }

    for j in i..n {
        let d = i64::from(a[j]) - i64::from(b[j]);
        total += d * d;
    }
    total as f32
}

// =============================================================================
// b1
// =============================================================================

/// NEON Hamming distance: `vcntq_u8` per-byte popcount, widened horizontal
/// add per 16-byte block, serial popcount for the remainder.
///
/// # Safety
///
/// Same contract as [`dot_f64`].
pub(crate) unsafe fn hamming_b1(a: &[u8], b: &[u8]) -> u64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut total = 0_u64;
    let mut i = 0;

    while i + 16 <= n {
        // SAFETY: i + 16 <= n for both slices; vld1q_u8 is unaligned-safe.
        let bits = unsafe {
            let x = veorq_u8(vld1q_u8(pa.add(i)), vld1q_u8(pb.add(i)));
            vaddlvq_u8(vcntq_u8(x))
        };
        total += u64::from(bits);
        i += 16;
    }

    total + serial::hamming_b1(&a[i..], &b[i..])
}
