//! AVX2+FMA kernel implementations for x86_64.
//!
//! Floating-point kernels run two 256-bit accumulators for ILP on inner
//! product and squared L2, three on cosine. Half precision is widened with
//! F16C (`vcvtph2ps`) and accumulated in f32. `i8` is sign-extended to 16
//! bits and multiplied with `vpmaddwd`. Binary Hamming uses a fixed-width
//! 32-byte loop with a nibble-LUT popcount.
//!
//! All functions require the `AVX2` capability (AVX2 + FMA), half precision
//! additionally `AVX2_FP16` (F16C).

// SAFETY: Numeric casts in this file are intentional and safe:
// - f64 -> f32 narrowing is the score contract
// - i64 -> f32 converts integer sums of bounded i8 products
// - u64 lane sums from `vpsadbw` are non-negative
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::wildcard_imports)]

use std::arch::x86_64::*;

use half::f16;

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
// Horizontal reductions
// =============================================================================

/// `[a0..a7] -> a0+..+a7`, upper 128 bits folded onto the lower first.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn hsum_ps(v: __m256) -> f32 {
    let hi = _mm256_extractf128_ps(v, 1);
    let lo = _mm256_castps256_ps128(v);
    let sum128 = _mm_add_ps(lo, hi);
    let shuf = _mm_movehdup_ps(sum128);
    let sums = _mm_add_ps(sum128, shuf);
    let shuf2 = _mm_movehl_ps(sums, sums);
    _mm_cvtss_f32(_mm_add_ss(sums, shuf2))
}

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn hsum_pd(v: __m256d) -> f64 {
    let hi = _mm256_extractf128_pd(v, 1);
    let lo = _mm256_castpd256_pd128(v);
    let sum128 = _mm_add_pd(lo, hi);
    let shuf = _mm_unpackhi_pd(sum128, sum128);
    _mm_cvtsd_f64(_mm_add_sd(sum128, shuf))
}

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn hsum_epi32(v: __m256i) -> i64 {
    let hi = _mm256_extracti128_si256(v, 1);
    let lo = _mm256_castsi256_si128(v);
    let sum128 = _mm_add_epi32(lo, hi);
    let sum64 = _mm_add_epi32(sum128, _mm_shuffle_epi32(sum128, 0b01_00_11_10));
    let sum32 = _mm_add_epi32(sum64, _mm_shuffle_epi32(sum64, 0b10_11_00_01));
    i64::from(_mm_cvtsi128_si32(sum32))
}

// =============================================================================
// f64
// =============================================================================

/// AVX2 f64 inner product, 8 doubles per iteration over two accumulators.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX2+FMA (the `AVX2` capability bit)
/// - `a.len() == b.len()`
#[target_feature(enable = "avx2", enable = "fma")]
pub(crate) unsafe fn dot_f64(a: &[f64], b: &[f64]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc0 = _mm256_setzero_pd();
    let mut acc1 = _mm256_setzero_pd();

    let mut i = 0;
    while i + 8 <= n {
        acc0 = _mm256_fmadd_pd(_mm256_loadu_pd(pa.add(i)), _mm256_loadu_pd(pb.add(i)), acc0);
        acc1 = _mm256_fmadd_pd(
            _mm256_loadu_pd(pa.add(i + 4)),
            _mm256_loadu_pd(pb.add(i + 4)),
            acc1,
        );
        i += 8;
    }
    if i + 4 <= n {
        acc0 = _mm256_fmadd_pd(_mm256_loadu_pd(pa.add(i)), _mm256_loadu_pd(pb.add(i)), acc0);
        i += 4;
    }

    let mut result = hsum_pd(_mm256_add_pd(acc0, acc1));
    for j in i..n {
        result += a[j] * b[j];
    }
    result as f32
}

/// # Safety
///
/// Same contract as [`dot_f64`].
#[target_feature(enable = "avx2", enable = "fma")]
pub(crate) unsafe fn cos_f64(a: &[f64], b: &[f64]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut ab = _mm256_setzero_pd();
    let mut a2 = _mm256_setzero_pd();
    let mut b2 = _mm256_setzero_pd();

    let mut i = 0;
    while i + 4 <= n {
        let va = _mm256_loadu_pd(pa.add(i));
        let vb = _mm256_loadu_pd(pb.add(i));
        ab = _mm256_fmadd_pd(va, vb, ab);
        a2 = _mm256_fmadd_pd(va, va, a2);
        b2 = _mm256_fmadd_pd(vb, vb, b2);
        i += 4;
    }

    let (mut dot, mut norm_a, mut norm_b) = (hsum_pd(ab), hsum_pd(a2), hsum_pd(b2));
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
#[target_feature(enable = "avx2", enable = "fma")]
pub(crate) unsafe fn l2sq_f64(a: &[f64], b: &[f64]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc0 = _mm256_setzero_pd();
    let mut acc1 = _mm256_setzero_pd();

    let mut i = 0;
    while i + 8 <= n {
        let d0 = _mm256_sub_pd(_mm256_loadu_pd(pa.add(i)), _mm256_loadu_pd(pb.add(i)));
        let d1 = _mm256_sub_pd(_mm256_loadu_pd(pa.add(i + 4)), _mm256_loadu_pd(pb.add(i + 4)));
        acc0 = _mm256_fmadd_pd(d0, d0, acc0);
        acc1 = _mm256_fmadd_pd(d1, d1, acc1);
        i += 8;
    }
    if i + 4 <= n {
        let d = _mm256_sub_pd(_mm256_loadu_pd(pa.add(i)), _mm256_loadu_pd(pb.add(i)));
        acc0 = _mm256_fmadd_pd(d, d, acc0);
        i += 4;
    }

    let mut result = hsum_pd(_mm256_add_pd(acc0, acc1));
    for j in i..n {
        let d = a[j] - b[j];
        result += d * d;
    }
    result as f32
}

// =============================================================================
// f32
// =============================================================================

/// AVX2 f32 inner product, 16 floats per iteration over two accumulators.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX2+FMA (the `AVX2` capability bit)
/// - `a.len() == b.len()`
#[target_feature(enable = "avx2", enable = "fma")]
pub(crate) unsafe fn dot_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc0 = _mm256_setzero_ps();
    let mut acc1 = _mm256_setzero_ps();

    let mut i = 0;
    while i + 16 <= n {
        acc0 = _mm256_fmadd_ps(_mm256_loadu_ps(pa.add(i)), _mm256_loadu_ps(pb.add(i)), acc0);
        acc1 = _mm256_fmadd_ps(
            _mm256_loadu_ps(pa.add(i + 8)),
            _mm256_loadu_ps(pb.add(i + 8)),
            acc1,
        );
        i += 16;
    }
    if i + 8 <= n {
        acc0 = _mm256_fmadd_ps(_mm256_loadu_ps(pa.add(i)), _mm256_loadu_ps(pb.add(i)), acc0);
        i += 8;
    }

    let mut result = hsum_ps(_mm256_add_ps(acc0, acc1));
    for j in i..n {
        result += a[j] * b[j];
    }
    result
}

/// AVX2 fused cosine - dot product and both norms in one SIMD pass.
///
/// # Safety
///
/// Same contract as [`dot_f32`].
#[target_feature(enable = "avx2", enable = "fma")]
pub(crate) unsafe fn cos_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut ab = _mm256_setzero_ps();
    let mut a2 = _mm256_setzero_ps();
    let mut b2 = _mm256_setzero_ps();

    let mut i = 0;
    while i + 8 <= n {
        let va = _mm256_loadu_ps(pa.add(i));
        let vb = _mm256_loadu_ps(pb.add(i));
        ab = _mm256_fmadd_ps(va, vb, ab);
        a2 = _mm256_fmadd_ps(va, va, a2);
        b2 = _mm256_fmadd_ps(vb, vb, b2);
        i += 8;
    }

    let (mut dot, mut norm_a, mut norm_b) = (hsum_ps(ab), hsum_ps(a2), hsum_ps(b2));
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
/// Same contract as [`dot_f32`].
#[target_feature(enable = "avx2", enable = "fma")]
pub(crate) unsafe fn l2sq_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc0 = _mm256_setzero_ps();
    let mut acc1 = _mm256_setzero_ps();

    let mut i = 0;
    while i + 16 <= n {
        let d0 = _mm256_sub_ps(_mm256_loadu_ps(pa.add(i)), _mm256_loadu_ps(pb.add(i)));
        let d1 = _mm256_sub_ps(_mm256_loadu_ps(pa.add(i + 8)), _mm256_loadu_ps(pb.add(i + 8)));
        acc0 = _mm256_fmadd_ps(d0, d0, acc0);
        acc1 = _mm256_fmadd_ps(d1, d1, acc1);
        i += 16;
    }
    if i + 8 <= n {
        let d = _mm256_sub_ps(_mm256_loadu_ps(pa.add(i)), _mm256_loadu_ps(pb.add(i)));
        acc0 = _mm256_fmadd_ps(d, d, acc0);
        i += 8;
    }

    let mut result = hsum_ps(_mm256_add_ps(acc0, acc1));
    for j in i..n {
        let d = a[j] - b[j];
        result += d * d;
    }
    result
}

// =============================================================================
// f16
// =============================================================================

/// Loads eight halves and widens them to single precision.
#[inline]
#[target_feature(enable = "avx2", enable = "f16c")]
unsafe fn load_f16x8(ptr: *const f16) -> __m256 {
    _mm256_cvtph_ps(_mm_loadu_si128(ptr.cast()))
}

/// AVX2 f16 inner product; halves are widened by F16C, FMA runs in f32.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX2+FMA+F16C (the `AVX2_FP16` capability bit)
/// - `a.len() == b.len()`
#[target_feature(enable = "avx2", enable = "fma", enable = "f16c")]
pub(crate) unsafe fn dot_f16(a: &[f16], b: &[f16]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc = _mm256_setzero_ps();

    let mut i = 0;
    while i + 8 <= n {
        acc = _mm256_fmadd_ps(load_f16x8(pa.add(i)), load_f16x8(pb.add(i)), acc);
        i += 8;
    }

    let mut result = hsum_ps(acc);
    for j in i..n {
        result += a[j].to_f32() * b[j].to_f32();
    }
    result
}

/// # Safety
///
/// Same contract as [`dot_f16`].
#[target_feature(enable = "avx2", enable = "fma", enable = "f16c")]
pub(crate) unsafe fn cos_f16(a: &[f16], b: &[f16]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut ab = _mm256_setzero_ps();
    let mut a2 = _mm256_setzero_ps();
    let mut b2 = _mm256_setzero_ps();

    let mut i = 0;
    while i + 8 <= n {
        let va = load_f16x8(pa.add(i));
        let vb = load_f16x8(pb.add(i));
        ab = _mm256_fmadd_ps(va, vb, ab);
        a2 = _mm256_fmadd_ps(va, va, a2);
        b2 = _mm256_fmadd_ps(vb, vb, b2);
        i += 8;
    }

    let (mut dot, mut norm_a, mut norm_b) = (hsum_ps(ab), hsum_ps(a2), hsum_ps(b2));
    for j in i..n {
        let (x, y) = (a[j].to_f32(), b[j].to_f32());
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    cosine_from_parts(dot, norm_a, norm_b)
}

/// # Safety
///
/// Same contract as [`dot_f16`].
#[target_feature(enable = "avx2", enable = "fma", enable = "f16c")]
pub(crate) unsafe fn l2sq_f16(a: &[f16], b: &[f16]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc = _mm256_setzero_ps();

    let mut i = 0;
    while i + 8 <= n {
        let d = _mm256_sub_ps(load_f16x8(pa.add(i)), load_f16x8(pb.add(i)));
        acc = _mm256_fmadd_ps(d, d, acc);
        i += 8;
    }

    let mut result = hsum_ps(acc);
    for j in i..n {
        let d = a[j].to_f32() - b[j].to_f32();
        result += d * d;
    }
    result
}

// =============================================================================
// i8
// =============================================================================

/// Loads sixteen signed bytes sign-extended to 16-bit lanes.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn load_i8x16(ptr: *const i8) -> __m256i {
    _mm256_cvtepi8_epi16(_mm_loadu_si128(ptr.cast()))
}

/// AVX2 i8 inner product via `vpmaddwd`, with periodic spills to `i64`.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX2 (the `AVX2` capability bit)
/// - `a.len() == b.len()`
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn dot_i8(a: &[i8], b: &[i8]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc = _mm256_setzero_si256();
    let mut total = 0_i64;
    let mut pending = 0;

    let mut i = 0;
    while i + 16 <= n {
        let prod = _mm256_madd_epi16(load_i8x16(pa.add(i)), load_i8x16(pb.add(i)));
        acc = _mm256_add_epi32(acc, prod);
        i += 16;
        pending += 1;
        if pending == I8_SPILL_INTERVAL {
            total += hsum_epi32(acc);
            acc = _mm256_setzero_si256();
            pending = 0;
        }
    }
    total += hsum_epi32(acc);

    for j in i..n {
        total += i64::from(a[j]) * i64::from(b[j]);
    }
    total as f32
}

/// # Safety
///
/// Same contract as [`dot_i8`].
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn cos_i8(a: &[i8], b: &[i8]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut ab = _mm256_setzero_si256();
    let mut a2 = _mm256_setzero_si256();
    let mut b2 = _mm256_setzero_si256();
    let (mut dot, mut norm_a, mut norm_b) = (0_i64, 0_i64, 0_i64);
    let mut pending = 0;

    let mut i = 0;
    while i + 16 <= n {
        let va = load_i8x16(pa.add(i));
        let vb = load_i8x16(pb.add(i));
        ab = _mm256_add_epi32(ab, _mm256_madd_epi16(va, vb));
        a2 = _mm256_add_epi32(a2, _mm256_madd_epi16(va, va));
        b2 = _mm256_add_epi32(b2, _mm256_madd_epi16(vb, vb));
        i += 16;
        pending += 1;
        if pending == I8_SPILL_INTERVAL {
            dot += hsum_epi32(ab);
            norm_a += hsum_epi32(a2);
            norm_b += hsum_epi32(b2);
            ab = _mm256_setzero_si256();
            a2 = _mm256_setzero_si256();
            b2 = _mm256_setzero_si256();
            pending = 0;
        }
    }
    dot += hsum_epi32(ab);
    norm_a += hsum_epi32(a2);
    norm_b += hsum_epi32(b2);

    for j in i..n {
        let (x, y) = (i64::from(a[j]), i64::from(b[j]));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    cosine_from_parts_i64(dot, norm_a, norm_b)
}

/// Differences of two i8 fit an i16 lane (|d| <= 255), so they are squared
/// with `vpmaddwd` directly.
///
/// # Safety
///
/// Same contract as [`dot_i8`].
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn l2sq_i8(a: &[i8], b: &[i8]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc = _mm256_setzero_si256();
    let mut total = 0_i64;
    let mut pending = 0;

    let mut i = 0;
    while i + 16 <= n {
        let d = _mm256_sub_epi16(load_i8x16(pa.add(i)), load_i8x16(pb.add(i)));
        acc = _mm256_add_epi32(acc, _mm256_madd_epi16(d, d));
        i += 16;
        pending += 1;
        if pending == I8_SPILL_INTERVAL {
            total += hsum_epi32(acc);
            acc = _mm256_setzero_si256();
            pending = 0;
        }
    }
    total += hsum_epi32(acc);

    for j in i..n {
        let d = i64::from(a[j]) - i64::from(b[j]);
        total += d * d;
    }
    total as f32
}

// =============================================================================
// b1
// =============================================================================

/// Fixed-width Hamming distance: whole 32-byte chunks through SIMD, the
/// remainder through the serial popcount.
///
/// Per chunk: XOR, split each byte into nibbles, look both up in a 16-entry
/// popcount table (`vpshufb`), add, then `vpsadbw` folds bytes into four u64
/// lanes.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX2 (the `AVX2` capability bit)
/// - `a.len() == b.len()`
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn hamming_b1(a: &[u8], b: &[u8]) -> u64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let lut = _mm256_setr_epi8(
        0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4, //
        0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4,
    );
    let low_nibble = _mm256_set1_epi8(0x0f);
    let zero = _mm256_setzero_si256();
    let mut acc = _mm256_setzero_si256();

    let mut i = 0;
    while i + 32 <= n {
        let x = _mm256_xor_si256(
            _mm256_loadu_si256(pa.add(i).cast()),
            _mm256_loadu_si256(pb.add(i).cast()),
        );
        let lo = _mm256_and_si256(x, low_nibble);
        let hi = _mm256_and_si256(_mm256_srli_epi16(x, 4), low_nibble);
        let counts = _mm256_add_epi8(_mm256_shuffle_epi8(lut, lo), _mm256_shuffle_epi8(lut, hi));
        acc = _mm256_add_epi64(acc, _mm256_sad_epu8(counts, zero));
        i += 32;
    }

    let mut lanes = [0_u64; 4];
    _mm256_storeu_si256(lanes.as_mut_ptr().cast(), acc);
    lanes.iter().sum::<u64>() + serial::hamming_b1(&a[i..], &b[i..])
}
