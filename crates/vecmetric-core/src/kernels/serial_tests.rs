//! Tests for the portable baseline kernels.

use half::f16;

use super::serial::*;
use super::KernelFn;
use crate::metric::{DataType, MetricKind};

const EPSILON: f32 = 1e-5;

fn halves(values: &[f32]) -> Vec<f16> {
    values.iter().copied().map(f16::from_f32).collect()
}

// ============================================================================
// Known vectors
// ============================================================================

#[test]
fn test_orthogonal_unit_vectors() {
    let a = [1.0_f32, 0.0, 0.0, 0.0];
    let b = [0.0_f32, 1.0, 0.0, 0.0];

    assert_eq!(dot_f32(&a, &b), 0.0);
    assert_eq!(cos_f32(&a, &b), 0.0);
    assert_eq!(l2sq_f32(&a, &b), 2.0);
}

#[test]
fn test_all_ones_against_itself() {
    let a = [1.0_f64; 4];
    assert_eq!(dot_f64(&a, &a), 4.0);
    assert!((cos_f64(&a, &a) - 1.0).abs() < EPSILON);
    assert_eq!(l2sq_f64(&a, &a), 0.0);

    let h = halves(&[1.0; 4]);
    assert_eq!(dot_f16(&h, &h), 4.0);
    assert!((cos_f16(&h, &h) - 1.0).abs() < EPSILON);
    assert_eq!(l2sq_f16(&h, &h), 0.0);

    let q = [1_i8; 4];
    assert_eq!(dot_i8(&q, &q), 4.0);
    assert!((cos_i8(&q, &q) - 1.0).abs() < EPSILON);
    assert_eq!(l2sq_i8(&q, &q), 0.0);
}

#[test]
fn test_f32_dot_three_four() {
    assert_eq!(dot_f32(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
    assert_eq!(l2sq_f32(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 27.0);
}

#[test]
fn test_cosine_opposite_vectors() {
    let a = [1.0_f32, 2.0, 3.0];
    let b = [-1.0_f32, -2.0, -3.0];
    assert!((cos_f32(&a, &b) + 1.0).abs() < EPSILON);
}

#[test]
fn test_cosine_zero_vector_is_nan() {
    let zero = [0.0_f32; 8];
    let a = [1.0_f32; 8];
    assert!(cos_f32(&zero, &a).is_nan());
    assert!(cos_f64(&[0.0; 3], &[0.0; 3]).is_nan());
    assert!(cos_i8(&[0; 5], &[1; 5]).is_nan());
}

#[test]
fn test_empty_vectors() {
    assert_eq!(dot_f32(&[], &[]), 0.0);
    assert_eq!(l2sq_f64(&[], &[]), 0.0);
    assert_eq!(hamming_b1(&[], &[]), 0);
}

// ============================================================================
// i8 widening
// ============================================================================

#[test]
fn test_i8_dot_is_not_truncated() {
    let a = [127_i8; 128];
    let expected = 127.0 * 127.0 * 128.0;
    assert_eq!(dot_i8(&a, &a), expected);
}

#[test]
fn test_i8_extremes() {
    let a = [-128_i8; 64];
    let b = [127_i8; 64];
    assert_eq!(dot_i8(&a, &b), -128.0 * 127.0 * 64.0);
    assert_eq!(l2sq_i8(&a, &b), 255.0 * 255.0 * 64.0);
    assert!((cos_i8(&a, &b) + 1.0).abs() < EPSILON);
}

// ============================================================================
// f16
// ============================================================================

#[test]
fn test_f16_matches_widened_f32() {
    let a: Vec<f32> = (0..37).map(|i| (i as f32) * 0.25 - 4.0).collect();
    let b: Vec<f32> = (0..37).map(|i| 3.0 - (i as f32) * 0.125).collect();
    let (ha, hb) = (halves(&a), halves(&b));

    // Every value above is exactly representable in half precision.
    assert_eq!(dot_f16(&ha, &hb), dot_f32(&a, &b));
    assert_eq!(l2sq_f16(&ha, &hb), l2sq_f32(&a, &b));
    assert!((cos_f16(&ha, &hb) - cos_f32(&a, &b)).abs() < EPSILON);
}

// ============================================================================
// b1
// ============================================================================

#[test]
fn test_hamming_known_bytes() {
    assert_eq!(hamming_b1(&[0b1111_0000], &[0b0000_1111]), 8);
    assert_eq!(hamming_b1(&[0b1010_1010], &[0b1010_1010]), 0);
    assert_eq!(hamming_b1(&[0xff; 10], &[0x00; 10]), 80);
}

#[test]
fn test_tanimoto() {
    assert_eq!(tanimoto_b1(&[0b1111_0000], &[0b1111_0000]), 1.0);
    assert_eq!(tanimoto_b1(&[0b1111_0000], &[0b0000_1111]), 0.0);
    assert_eq!(tanimoto_b1(&[0b1100_0000], &[0b1111_0000]), 0.5);
}

#[test]
fn test_tanimoto_all_zero_is_identical() {
    assert_eq!(tanimoto_b1(&[0; 4], &[0; 4]), 1.0);
    assert_eq!(tanimoto_b1(&[], &[]), 1.0);
}

// ============================================================================
// Coverage
// ============================================================================

#[test]
fn test_resolve_covers_every_listed_pair() {
    for datatype in [DataType::F64, DataType::F32, DataType::F16, DataType::I8] {
        for kind in [
            MetricKind::InnerProduct,
            MetricKind::Cosine,
            MetricKind::SquaredEuclidean,
        ] {
            assert!(resolve(kind, datatype).is_some(), "{kind} over {datatype}");
        }
        assert!(resolve(MetricKind::Hamming, datatype).is_none());
        assert!(resolve(MetricKind::Tanimoto, datatype).is_none());
    }

    assert!(matches!(
        resolve(MetricKind::Hamming, DataType::B1),
        Some(KernelFn::B1Count(_))
    ));
    assert!(matches!(
        resolve(MetricKind::Tanimoto, DataType::B1),
        Some(KernelFn::B1(_))
    ));
    assert!(resolve(MetricKind::InnerProduct, DataType::B1).is_none());
}
