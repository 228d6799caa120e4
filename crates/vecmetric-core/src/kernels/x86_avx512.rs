//! AVX-512 (F + BW) kernel implementations for x86_64.
//!
//! Every kernel handles its remainder with a masked zeroing load, so there is
//! no scalar tail: masked-off lanes load as zero and contribute nothing to a
//! sum or a popcount. Half precision loads 32 halves at a time and converts
//! both 256-bit halves with `vcvtph2ps`.
//!
//! All functions require the `AVX512` capability.

// SAFETY: Numeric casts in this file are intentional and safe:
// - tail masks are built from a remainder strictly below the lane count
// - f64 -> f32 narrowing is the score contract
// - i64 -> f32 converts integer sums of bounded i8 products
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::wildcard_imports)]

use std::arch::x86_64::*;

use half::f16;

use super::{
    cosine_from_parts, cosine_from_parts_f64, cosine_from_parts_i64, KernelFn, I8_SPILL_INTERVAL,
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
// Tail masks (first `remaining` bits set)
// =============================================================================

#[inline]
fn mask8(remaining: usize) -> __mmask8 {
    ((1_u32 << remaining) - 1) as __mmask8
}

#[inline]
fn mask16(remaining: usize) -> __mmask16 {
    ((1_u32 << remaining) - 1) as __mmask16
}

#[inline]
fn mask32(remaining: usize) -> __mmask32 {
    ((1_u64 << remaining) - 1) as __mmask32
}

#[inline]
fn mask64(remaining: usize) -> __mmask64 {
    if remaining >= 64 {
        !0
    } else {
        (1_u64 << remaining) - 1
    }
}

// =============================================================================
// f64
// =============================================================================

/// AVX-512 f64 inner product, 8 doubles per iteration plus a masked tail.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX-512F and AVX-512BW (the `AVX512` capability bit)
/// - `a.len() == b.len()`
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn dot_f64(a: &[f64], b: &[f64]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc = _mm512_setzero_pd();

    let mut i = 0;
    while i + 8 <= n {
        acc = _mm512_fmadd_pd(_mm512_loadu_pd(pa.add(i)), _mm512_loadu_pd(pb.add(i)), acc);
        i += 8;
    }
    if i < n {
        let mask = mask8(n - i);
        let va = _mm512_maskz_loadu_pd(mask, pa.add(i));
        let vb = _mm512_maskz_loadu_pd(mask, pb.add(i));
        acc = _mm512_fmadd_pd(va, vb, acc);
    }

    _mm512_reduce_add_pd(acc) as f32
}

/// # Safety
///
/// Same contract as [`dot_f64`].
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn cos_f64(a: &[f64], b: &[f64]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut ab = _mm512_setzero_pd();
    let mut a2 = _mm512_setzero_pd();
    let mut b2 = _mm512_setzero_pd();

    let mut i = 0;
    while i < n {
        let (va, vb) = if i + 8 <= n {
            (_mm512_loadu_pd(pa.add(i)), _mm512_loadu_pd(pb.add(i)))
        } else {
            let mask = mask8(n - i);
            (
                _mm512_maskz_loadu_pd(mask, pa.add(i)),
                _mm512_maskz_loadu_pd(mask, pb.add(i)),
            )
        };
        ab = _mm512_fmadd_pd(va, vb, ab);
        a2 = _mm512_fmadd_pd(va, va, a2);
        b2 = _mm512_fmadd_pd(vb, vb, b2);
        i += 8;
    }

    cosine_from_parts_f64(
        _mm512_reduce_add_pd(ab),
        _mm512_reduce_add_pd(a2),
        _mm512_reduce_add_pd(b2),
    )
}

/// # Safety
///
/// Same contract as [`dot_f64`].
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn l2sq_f64(a: &[f64], b: &[f64]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc = _mm512_setzero_pd();

    let mut i = 0;
    while i + 8 <= n {
        let d = _mm512_sub_pd(_mm512_loadu_pd(pa.add(i)), _mm512_loadu_pd(pb.add(i)));
        acc = _mm512_fmadd_pd(d, d, acc);
        i += 8;
    }
    if i < n {
        let mask = mask8(n - i);
        let d = _mm512_sub_pd(
            _mm512_maskz_loadu_pd(mask, pa.add(i)),
            _mm512_maskz_loadu_pd(mask, pb.add(i)),
        );
        acc = _mm512_fmadd_pd(d, d, acc);
    }

    _mm512_reduce_add_pd(acc) as f32
}

// =============================================================================
// f32
// =============================================================================

/// AVX-512 f32 inner product, 32 floats per iteration over two accumulators,
/// then 16-wide blocks and a masked tail.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX-512F and AVX-512BW (the `AVX512` capability bit)
/// - `a.len() == b.len()`
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn dot_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc0 = _mm512_setzero_ps();
    let mut acc1 = _mm512_setzero_ps();

    let mut i = 0;
    while i + 32 <= n {
        acc0 = _mm512_fmadd_ps(_mm512_loadu_ps(pa.add(i)), _mm512_loadu_ps(pb.add(i)), acc0);
        acc1 = _mm512_fmadd_ps(
            _mm512_loadu_ps(pa.add(i + 16)),
            _mm512_loadu_ps(pb.add(i + 16)),
            acc1,
        );
        i += 32;
    }
    acc0 = _mm512_add_ps(acc0, acc1);

    while i + 16 <= n {
        acc0 = _mm512_fmadd_ps(_mm512_loadu_ps(pa.add(i)), _mm512_loadu_ps(pb.add(i)), acc0);
        i += 16;
    }
    if i < n {
        let mask = mask16(n - i);
        let va = _mm512_maskz_loadu_ps(mask, pa.add(i));
        let vb = _mm512_maskz_loadu_ps(mask, pb.add(i));
        acc0 = _mm512_fmadd_ps(va, vb, acc0);
    }

    _mm512_reduce_add_ps(acc0)
}

/// AVX-512 fused cosine - dot product and both norms in one SIMD pass.
///
/// # Safety
///
/// Same contract as [`dot_f32`].
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn cos_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut ab = _mm512_setzero_ps();
    let mut a2 = _mm512_setzero_ps();
    let mut b2 = _mm512_setzero_ps();

    let mut i = 0;
    while i < n {
        let (va, vb) = if i + 16 <= n {
            (_mm512_loadu_ps(pa.add(i)), _mm512_loadu_ps(pb.add(i)))
        } else {
            let mask = mask16(n - i);
            (
                _mm512_maskz_loadu_ps(mask, pa.add(i)),
                _mm512_maskz_loadu_ps(mask, pb.add(i)),
            )
        };
        ab = _mm512_fmadd_ps(va, vb, ab);
        a2 = _mm512_fmadd_ps(va, va, a2);
        b2 = _mm512_fmadd_ps(vb, vb, b2);
        i += 16;
    }

    cosine_from_parts(
        _mm512_reduce_add_ps(ab),
        _mm512_reduce_add_ps(a2),
        _mm512_reduce_add_ps(b2),
    )
}

/// # Safety
///
/// Same contract as [`dot_f32`].
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn l2sq_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc0 = _mm512_setzero_ps();
    let mut acc1 = _mm512_setzero_ps();

    let mut i = 0;
    while i + 32 <= n {
        let d0 = _mm512_sub_ps(_mm512_loadu_ps(pa.add(i)), _mm512_loadu_ps(pb.add(i)));
        let d1 = _mm512_sub_ps(
            _mm512_loadu_ps(pa.add(i + 16)),
            _mm512_loadu_ps(pb.add(i + 16)),
        );
        acc0 = _mm512_fmadd_ps(d0, d0, acc0);
        acc1 = _mm512_fmadd_ps(d1, d1, acc1);
        i += 32;
    }
    acc0 = _mm512_add_ps(acc0, acc1);

    while i + 16 <= n {
        let d = _mm512_sub_ps(_mm512_loadu_ps(pa.add(i)), _mm512_loadu_ps(pb.add(i)));
        acc0 = _mm512_fmadd_ps(d, d, acc0);
        i += 16;
    }
    if i < n {
        let mask = mask16(n - i);
        let d = _mm512_sub_ps(
            _mm512_maskz_loadu_ps(mask, pa.add(i)),
            _mm512_maskz_loadu_ps(mask, pb.add(i)),
        );
        acc0 = _mm512_fmadd_ps(d, d, acc0);
    }

    _mm512_reduce_add_ps(acc0)
}

// =============================================================================
// f16
// =============================================================================

/// Loads up to 32 halves (zeroing past `remaining`) and widens them into a
/// low and a high block of 16 floats.
#[inline]
#[target_feature(enable = "avx512f", enable = "avx512bw")]
unsafe fn load_f16x32(ptr: *const f16, remaining: usize) -> (__m512, __m512) {
    let raw = if remaining >= 32 {
        _mm512_loadu_si512(ptr.cast())
    } else {
        _mm512_maskz_loadu_epi16(mask32(remaining), ptr.cast())
    };
    let lo = _mm512_cvtph_ps(_mm512_castsi512_si256(raw));
    let hi = _mm512_cvtph_ps(_mm512_extracti64x4_epi64::<1>(raw));
    (lo, hi)
}

/// AVX-512 f16 inner product; halves are widened, FMA runs in f32.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX-512F and AVX-512BW (the `AVX512` capability bit)
/// - `a.len() == b.len()`
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn dot_f16(a: &[f16], b: &[f16]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc_lo = _mm512_setzero_ps();
    let mut acc_hi = _mm512_setzero_ps();

    let mut i = 0;
    while i < n {
        let (a_lo, a_hi) = load_f16x32(pa.add(i), n - i);
        let (b_lo, b_hi) = load_f16x32(pb.add(i), n - i);
        acc_lo = _mm512_fmadd_ps(a_lo, b_lo, acc_lo);
        acc_hi = _mm512_fmadd_ps(a_hi, b_hi, acc_hi);
        i += 32;
    }

    _mm512_reduce_add_ps(_mm512_add_ps(acc_lo, acc_hi))
}

/// # Safety
///
/// Same contract as [`dot_f16`].
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn cos_f16(a: &[f16], b: &[f16]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut ab = _mm512_setzero_ps();
    let mut a2 = _mm512_setzero_ps();
    let mut b2 = _mm512_setzero_ps();

    let mut i = 0;
    while i < n {
        let (a_lo, a_hi) = load_f16x32(pa.add(i), n - i);
        let (b_lo, b_hi) = load_f16x32(pb.add(i), n - i);
        ab = _mm512_fmadd_ps(a_hi, b_hi, _mm512_fmadd_ps(a_lo, b_lo, ab));
        a2 = _mm512_fmadd_ps(a_hi, a_hi, _mm512_fmadd_ps(a_lo, a_lo, a2));
        b2 = _mm512_fmadd_ps(b_hi, b_hi, _mm512_fmadd_ps(b_lo, b_lo, b2));
        i += 32;
    }

    cosine_from_parts(
        _mm512_reduce_add_ps(ab),
        _mm512_reduce_add_ps(a2),
        _mm512_reduce_add_ps(b2),
    )
}

/// # Safety
///
/// Same contract as [`dot_f16`].
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn l2sq_f16(a: &[f16], b: &[f16]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc_lo = _mm512_setzero_ps();
    let mut acc_hi = _mm512_setzero_ps();

    let mut i = 0;
    while i < n {
        let (a_lo, a_hi) = load_f16x32(pa.add(i), n - i);
        let (b_lo, b_hi) = load_f16x32(pb.add(i), n - i);
        let d_lo = _mm512_sub_ps(a_lo, b_lo);
        let d_hi = _mm512_sub_ps(a_hi, b_hi);
        acc_lo = _mm512_fmadd_ps(d_lo, d_lo, acc_lo);
        acc_hi = _mm512_fmadd_ps(d_hi, d_hi, acc_hi);
        i += 32;
    }

    _mm512_reduce_add_ps(_mm512_add_ps(acc_lo, acc_hi))
}

// =============================================================================
// i8
// =============================================================================

/// Loads up to 64 signed bytes (zeroing past `remaining`) sign-extended into
/// two blocks of 32 16-bit lanes.
#[inline]
#[target_feature(enable = "avx512f", enable = "avx512bw")]
unsafe fn load_i8x64(ptr: *const i8, remaining: usize) -> (__m512i, __m512i) {
    let raw = _mm512_maskz_loadu_epi8(mask64(remaining), ptr);
    let lo = _mm512_cvtepi8_epi16(_mm512_castsi512_si256(raw));
    let hi = _mm512_cvtepi8_epi16(_mm512_extracti64x4_epi64::<1>(raw));
    (lo, hi)
}

/// Sums sixteen i32 lanes in i64; the total of a spill block can exceed i32
/// even though each lane does not.
#[inline]
#[target_feature(enable = "avx512f", enable = "avx512bw")]
unsafe fn reduce_add_epi32_wide(v: __m512i) -> i64 {
    let lo = _mm512_cvtepi32_epi64(_mm512_castsi512_si256(v));
    let hi = _mm512_cvtepi32_epi64(_mm512_extracti64x4_epi64::<1>(v));
    _mm512_reduce_add_epi64(_mm512_add_epi64(lo, hi))
}

/// AVX-512 i8 inner product via `vpmaddwd`, with periodic spills to `i64`.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX-512F and AVX-512BW (the `AVX512` capability bit)
/// - `a.len() == b.len()`
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn dot_i8(a: &[i8], b: &[i8]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc = _mm512_setzero_si512();
    let mut total = 0_i64;
    let mut pending = 0;

    let mut i = 0;
    while i < n {
        let (a_lo, a_hi) = load_i8x64(pa.add(i), n - i);
        let (b_lo, b_hi) = load_i8x64(pb.add(i), n - i);
        acc = _mm512_add_epi32(acc, _mm512_madd_epi16(a_lo, b_lo));
        acc = _mm512_add_epi32(acc, _mm512_madd_epi16(a_hi, b_hi));
        i += 64;
        pending += 1;
        if pending == I8_SPILL_INTERVAL {
            total += reduce_add_epi32_wide(acc);
            acc = _mm512_setzero_si512();
            pending = 0;
        }
    }
    total += reduce_add_epi32_wide(acc);

    total as f32
}

/// # Safety
///
/// Same contract as [`dot_i8`].
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn cos_i8(a: &[i8], b: &[i8]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut ab = _mm512_setzero_si512();
    let mut a2 = _mm512_setzero_si512();
    let mut b2 = _mm512_setzero_si512();
    let (mut dot, mut norm_a, mut norm_b) = (0_i64, 0_i64, 0_i64);
    let mut pending = 0;

    let mut i = 0;
    while i < n {
        let (a_lo, a_hi) = load_i8x64(pa.add(i), n - i);
        let (b_lo, b_hi) = load_i8x64(pb.add(i), n - i);
        ab = _mm512_add_epi32(ab, _mm512_madd_epi16(a_lo, b_lo));
        ab = _mm512_add_epi32(ab, _mm512_madd_epi16(a_hi, b_hi));
        a2 = _mm512_add_epi32(a2, _mm512_madd_epi16(a_lo, a_lo));
        a2 = _mm512_add_epi32(a2, _mm512_madd_epi16(a_hi, a_hi));
        b2 = _mm512_add_epi32(b2, _mm512_madd_epi16(b_lo, b_lo));
        b2 = _mm512_add_epi32(b2, _mm512_madd_epi16(b_hi, b_hi));
        i += 64;
        pending += 1;
        if pending == I8_SPILL_INTERVAL {
            dot += reduce_add_epi32_wide(ab);
            norm_a += reduce_add_epi32_wide(a2);
            norm_b += reduce_add_epi32_wide(b2);
            ab = _mm512_setzero_si512();
            a2 = _mm512_setzero_si512();
            b2 = _mm512_setzero_si512();
            pending = 0;
        }
    }
    dot += reduce_add_epi32_wide(ab);
    norm_a += reduce_add_epi32_wide(a2);
    norm_b += reduce_add_epi32_wide(b2);

    cosine_from_parts_i64(dot, norm_a, norm_b)
}

/// # Safety
///
/// Same contract as [`dot_i8`].
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn l2sq_i8(a: &[i8], b: &[i8]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let mut acc = _mm512_setzero_si512();
    let mut total = 0_i64;
    let mut pending = 0;

    let mut i = 0;
    while i < n {
        let (a_lo, a_hi) = load_i8x64(pa.add(i), n - i);
        let (b_lo, b_hi) = load_i8x64(pb.add(i), n - i);
        let d_lo = _mm512_sub_epi16(a_lo, b_lo);
        let d_hi = _mm512_sub_epi16(a_hi, b_hi);
        acc = _mm512_add_epi32(acc, _mm512_madd_epi16(d_lo, d_lo));
        acc = _mm512_add_epi32(acc, _mm512_madd_epi16(d_hi, d_hi));
        i += 64;
        pending += 1;
        if pending == I8_SPILL_INTERVAL {
            total += reduce_add_epi32_wide(acc);
            acc = _mm512_setzero_si512();
            pending = 0;
        }
    }
    total += reduce_add_epi32_wide(acc);

    total as f32
}

// =============================================================================
// b1
// =============================================================================

/// Predicated Hamming distance: every iteration, the last one included, loads
/// up to 64 bytes under a mask, so there is no scalar remainder.
///
/// Per block: XOR, nibble-LUT popcount (`vpshufb`), then `vpsadbw` folds the
/// byte counts into eight u64 lanes.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX-512F and AVX-512BW (the `AVX512` capability bit)
/// - `a.len() == b.len()`
#[target_feature(enable = "avx512f", enable = "avx512bw")]
pub(crate) unsafe fn hamming_b1(a: &[u8], b: &[u8]) -> u64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    let (pa, pb) = (a.as_ptr(), b.as_ptr());
    let lut = _mm512_broadcast_i32x4(_mm_setr_epi8(
        0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4,
    ));
    let low_nibble = _mm512_set1_epi8(0x0f);
    let zero = _mm512_setzero_si512();
    let mut acc = _mm512_setzero_si512();

    let mut i = 0;
    while i < n {
        let mask = mask64(n - i);
        let x = _mm512_xor_si512(
            _mm512_maskz_loadu_epi8(mask, pa.add(i).cast()),
            _mm512_maskz_loadu_epi8(mask, pb.add(i).cast()),
        );
        let lo = _mm512_and_si512(x, low_nibble);
        let hi = _mm512_and_si512(_mm512_srli_epi16::<4>(x), low_nibble);
        let counts = _mm512_add_epi8(_mm512_shuffle_epi8(lut, lo), _mm512_shuffle_epi8(lut, hi));
        acc = _mm512_add_epi64(acc, _mm512_sad_epu8(counts, zero));
        i += 64;
    }

    _mm512_reduce_add_epi64(acc) as u64
}
