//! Tests for the typed convenience API.

use half::f16;

use crate::metric::DataType;
use crate::spatial::{BinarySimilarity, SpatialSimilarity};
use crate::view::Element;

const EPSILON: f32 = 1e-5;

#[test]
fn test_f32_metrics() {
    let a = [1.0_f32, 2.0, 3.0];
    let b = [4.0_f32, 5.0, 6.0];
    assert_eq!(f32::dot(&a, &b), Some(32.0));
    assert_eq!(f32::sqeuclidean(&a, &b), Some(27.0));
    let euclidean = f32::euclidean(&a, &b).unwrap();
    assert!((euclidean - 27.0_f32.sqrt()).abs() < EPSILON);

    let expected_cos = 32.0 / (14.0_f32.sqrt() * 77.0_f32.sqrt());
    assert!((f32::cosine(&a, &b).unwrap() - expected_cos).abs() < EPSILON);
}

#[test]
fn test_every_dense_type_is_supported() {
    assert_eq!(f64::dot(&[1.0, 2.0], &[3.0, 4.0]), Some(11.0));
    assert_eq!(i8::dot(&[1, 2], &[3, 4]), Some(11.0));
    let a = [f16::from_f32(1.0), f16::from_f32(2.0)];
    let b = [f16::from_f32(3.0), f16::from_f32(4.0)];
    assert_eq!(f16::dot(&a, &b), Some(11.0));
    assert_eq!(f16::sqeuclidean(&a, &b), Some(8.0));
}

#[test]
fn test_length_mismatch_is_none() {
    assert_eq!(f32::dot(&[1.0, 2.0], &[1.0]), None);
    assert_eq!(f64::cosine(&[1.0], &[]), None);
    assert_eq!(i8::euclidean(&[1, 2, 3], &[1, 2]), None);
    assert_eq!(u8::hamming(&[0xff], &[]), None);
    assert_eq!(u8::tanimoto(&[0xff, 0x00], &[0xff]), None);
}

#[test]
fn test_cosine_of_zero_vector_is_nan() {
    let cos = f32::cosine(&[0.0; 4], &[1.0; 4]).unwrap();
    assert!(cos.is_nan());
}

#[test]
fn test_binary_metrics() {
    assert_eq!(u8::hamming(&[0b1111_0000], &[0b0000_1111]), Some(8));
    assert_eq!(u8::hamming(&[0b1010_1010], &[0b1010_1010]), Some(0));
    assert_eq!(u8::tanimoto(&[0b1100_0000], &[0b1111_0000]), Some(0.5));
    assert_eq!(u8::tanimoto(&[0, 0], &[0, 0]), Some(1.0));
}

#[test]
fn test_symmetry() {
    let a: Vec<f32> = (0..100).map(|i| (i as f32 * 0.37).sin()).collect();
    let b: Vec<f32> = (0..100).map(|i| (i as f32 * 0.11).cos()).collect();
    assert_eq!(f32::sqeuclidean(&a, &b), f32::sqeuclidean(&b, &a));
    let (ab, ba) = (f32::dot(&a, &b).unwrap(), f32::dot(&b, &a).unwrap());
    assert!((ab - ba).abs() < EPSILON);

    let x: Vec<u8> = (0..77).map(|i| (i * 31) as u8).collect();
    let y: Vec<u8> = (0..77).map(|i| (i * 17 + 3) as u8).collect();
    assert_eq!(u8::hamming(&x, &y), u8::hamming(&y, &x));
}

#[test]
fn test_element_tags_match_their_views() {
    fn check<T: Element + Default>(expected: DataType) {
        assert_eq!(T::DATATYPE, expected);
        assert_eq!(T::view(&[T::default(); 3]).datatype(), T::DATATYPE);
    }
    check::<f64>(DataType::F64);
    check::<f32>(DataType::F32);
    check::<f16>(DataType::F16);
    check::<i8>(DataType::I8);
    check::<u8>(DataType::B1);
}
