//! Tests for command-line vector parsing.

use half::f16;
use vecmetric_core::DataType;

use crate::vectors::{parse_pair, OwnedVector};

#[test]
fn test_parse_float_forms() {
    let expected = OwnedVector::F32(vec![1.0, -2.5, 3.0]);
    assert_eq!(OwnedVector::parse(DataType::F32, "1,-2.5,3").unwrap(), expected);
    assert_eq!(OwnedVector::parse(DataType::F32, "[1, -2.5, 3]").unwrap(), expected);
    assert_eq!(OwnedVector::parse(DataType::F32, "1 -2.5 3").unwrap(), expected);
}

#[test]
fn test_parse_half_widens_from_f32() {
    let parsed = OwnedVector::parse(DataType::F16, "0.5,2").unwrap();
    assert_eq!(
        parsed,
        OwnedVector::F16(vec![f16::from_f32(0.5), f16::from_f32(2.0)])
    );
}

#[test]
fn test_parse_bytes_with_prefixes() {
    let parsed = OwnedVector::parse(DataType::B1, "0b1111_0000,0x0f,255").unwrap();
    assert_eq!(parsed, OwnedVector::B1(vec![0xf0, 0x0f, 0xff]));
}

#[test]
fn test_empty_input_is_empty_vector() {
    assert_eq!(
        OwnedVector::parse(DataType::F64, "[]").unwrap(),
        OwnedVector::F64(Vec::new())
    );
}

#[test]
fn test_out_of_range_i8_is_rejected() {
    let err = OwnedVector::parse(DataType::I8, "1,200").unwrap_err();
    assert!(err.to_string().contains("element 1"), "{err}");
}

#[test]
fn test_pair_dimension_mismatch() {
    let err = parse_pair(DataType::F32, "1,2,3", "1,2").unwrap_err();
    assert!(err.to_string().contains("3 vs 2"), "{err}");
}

#[test]
fn test_view_reports_datatype() {
    let (a, b) = parse_pair(DataType::I8, "1,2", "3,4").unwrap();
    assert_eq!(a.view().datatype(), DataType::I8);
    assert_eq!(b.view().len(), 2);
}
