//! Tests for metric and datatype tags.

use crate::error::Error;
use crate::metric::{DataType, MetricKind};

#[test]
fn test_metric_codes_are_stable() {
    assert_eq!(MetricKind::InnerProduct.code(), b'i');
    assert_eq!(MetricKind::Cosine.code(), b'c');
    assert_eq!(MetricKind::SquaredEuclidean.code(), b'e');
    assert_eq!(MetricKind::Hamming.code(), b'b');
    assert_eq!(MetricKind::Tanimoto.code(), b't');

    for kind in MetricKind::ALL {
        assert_eq!(MetricKind::from_code(kind.code()), Some(kind));
    }
    assert_eq!(MetricKind::from_code(b'x'), None);
}

#[test]
fn test_metric_aliases_are_the_same_variant() {
    assert_eq!(MetricKind::DOT, MetricKind::InnerProduct);
    assert_eq!(MetricKind::ANGULAR, MetricKind::Cosine);
    assert_eq!(MetricKind::EUCLIDEAN, MetricKind::SquaredEuclidean);

    for (alias, kind) in [
        ("dot", MetricKind::InnerProduct),
        ("ip", MetricKind::InnerProduct),
        ("inner_product", MetricKind::InnerProduct),
        ("angular", MetricKind::Cosine),
        ("COS", MetricKind::Cosine),
        ("euclidean", MetricKind::SquaredEuclidean),
        ("l2sq", MetricKind::SquaredEuclidean),
        ("jaccard", MetricKind::Tanimoto),
    ] {
        assert_eq!(alias.parse::<MetricKind>().unwrap(), kind, "{alias}");
    }
}

#[test]
fn test_metric_serde_aliases() {
    let kind: MetricKind = serde_json::from_str(r#""angular""#).unwrap();
    assert_eq!(kind, MetricKind::Cosine);
    let kind: MetricKind = serde_json::from_str(r#""dot""#).unwrap();
    assert_eq!(kind, MetricKind::InnerProduct);
    assert_eq!(
        serde_json::to_string(&MetricKind::SquaredEuclidean).unwrap(),
        r#""squaredeuclidean""#
    );
}

#[test]
fn test_metric_display_parses_back() {
    for kind in MetricKind::ALL {
        assert_eq!(kind.to_string().parse::<MetricKind>().unwrap(), kind);
    }
}

#[test]
fn test_unknown_metric() {
    let err = "manhattan".parse::<MetricKind>().unwrap_err();
    assert!(matches!(err, Error::UnknownMetric(ref s) if s == "manhattan"));
}

#[test]
fn test_datatype_names_and_sizes() {
    let expected = [
        (DataType::F64, "f64", 8),
        (DataType::F32, "f32", 4),
        (DataType::F16, "f16", 2),
        (DataType::I8, "i8", 1),
        (DataType::B1, "b1", 1),
    ];
    for (datatype, name, size) in expected {
        assert_eq!(datatype.name(), name);
        assert_eq!(datatype.element_size(), size);
        assert_eq!(name.parse::<DataType>().unwrap(), datatype);
    }
    assert_eq!("binary".parse::<DataType>().unwrap(), DataType::B1);
    assert!(matches!(
        "u16".parse::<DataType>(),
        Err(Error::UnknownDataType(_))
    ));
}

#[test]
fn test_table_indices_are_dense() {
    for (i, kind) in MetricKind::ALL.into_iter().enumerate() {
        assert_eq!(kind.index(), i);
    }
    for (i, datatype) in DataType::ALL.into_iter().enumerate() {
        assert_eq!(datatype.index(), i);
    }
}
