//! Portable baseline kernels.
//!
//! These functions serve as:
//! - The fallback on every target and for every allowed-capability mask
//! - Reference implementations for checking the SIMD tiers
//!
//! Accumulation is sequential, element by element, in the precision of the
//! input (f64 for `f64`, f32 for `f32`/`f16`, i64 for `i8`).

// Reason: f64 -> f32 narrowing is the score contract; counts -> f32 are small.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use half::f16;

use super::{cosine_from_parts, cosine_from_parts_f64, cosine_from_parts_i64, KernelFn};
use crate::metric::{DataType, MetricKind};

pub(crate) fn resolve(kind: MetricKind, datatype: DataType) -> Option<KernelFn> {
    use MetricKind::{Cosine, Hamming, InnerProduct, SquaredEuclidean, Tanimoto};

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
        (DataType::B1, Tanimoto) => KernelFn::B1(tanimoto_b1),
        _ => return None,
    };
    Some(kernel)
}

// =============================================================================
// f64
// =============================================================================

pub(crate) fn dot_f64(a: &[f64], b: &[f64]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum::<f64>() as f32
}

pub(crate) fn cos_f64(a: &[f64], b: &[f64]) -> f32 {
    let mut ab = 0.0_f64;
    let mut a2 = 0.0_f64;
    let mut b2 = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        ab += x * y;
        a2 += x * x;
        b2 += y * y;
    }
    cosine_from_parts_f64(ab, a2, b2)
}

pub(crate) fn l2sq_f64(a: &[f64], b: &[f64]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>() as f32
}

// =============================================================================
// f32
// =============================================================================

pub(crate) fn dot_f32(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Single pass over both vectors: dot product and both squared norms.
pub(crate) fn cos_f32(a: &[f32], b: &[f32]) -> f32 {
    let mut ab = 0.0_f32;
    let mut a2 = 0.0_f32;
    let mut b2 = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        ab += x * y;
        a2 += x * x;
        b2 += y * y;
    }
    cosine_from_parts(ab, a2, b2)
}

pub(crate) fn l2sq_f32(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

// =============================================================================
// f16 (widened to f32 before any arithmetic)
// =============================================================================

pub(crate) fn dot_f16(a: &[f16], b: &[f16]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x.to_f32() * y.to_f32()).sum()
}

pub(crate) fn cos_f16(a: &[f16], b: &[f16]) -> f32 {
    let mut ab = 0.0_f32;
    let mut a2 = 0.0_f32;
    let mut b2 = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (x.to_f32(), y.to_f32());
        ab += x * y;
        a2 += x * x;
        b2 += y * y;
    }
    cosine_from_parts(ab, a2, b2)
}

pub(crate) fn l2sq_f16(a: &[f16], b: &[f16]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x.to_f32() - y.to_f32();
            d * d
        })
        .sum()
}

// =============================================================================
// i8 (widened before multiplying; the full sum is kept)
// =============================================================================

pub(crate) fn dot_i8(a: &[i8], b: &[i8]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| i64::from(x) * i64::from(y))
        .sum::<i64>() as f32
}

pub(crate) fn cos_i8(a: &[i8], b: &[i8]) -> f32 {
    let mut ab = 0_i64;
    let mut a2 = 0_i64;
    let mut b2 = 0_i64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (i64::from(x), i64::from(y));
        ab += x * y;
        a2 += x * x;
        b2 += y * y;
    }
    cosine_from_parts_i64(ab, a2, b2)
}

pub(crate) fn l2sq_i8(a: &[i8], b: &[i8]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = i64::from(x) - i64::from(y);
            d * d
        })
        .sum::<i64>() as f32
}

// =============================================================================
// b1
// =============================================================================

pub(crate) fn hamming_b1(a: &[u8], b: &[u8]) -> u64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| u64::from((x ^ y).count_ones()))
        .sum()
}

/// `|a ∧ b| / |a ∨ b|`; two vectors with no set bits are identical (1.0).
pub(crate) fn tanimoto_b1(a: &[u8], b: &[u8]) -> f32 {
    let (intersection, union) = a
        .iter()
        .zip(b)
        .fold((0_u64, 0_u64), |(inter, uni), (x, y)| {
            (
                inter + u64::from((x & y).count_ones()),
                uni + u64::from((x | y).count_ones()),
            )
        });
    if union == 0 {
        1.0
    } else {
        intersection as f32 / union as f32
    }
}
