//! Metric and element-type tags.
//!
//! Both enums carry stable single-byte codes. Metric names that are synonyms
//! (dot / inner product, angular / cosine, euclidean / squared euclidean)
//! parse and deserialize to the same variant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Similarity or distance function requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum MetricKind {
    /// Inner (dot) product.
    #[serde(alias = "ip", alias = "dot", alias = "inner")]
    InnerProduct = b'i',
    /// Cosine (angular) similarity.
    #[serde(alias = "cos", alias = "angular")]
    Cosine = b'c',
    /// Squared Euclidean distance.
    #[serde(alias = "l2sq", alias = "sqeuclidean", alias = "euclidean")]
    SquaredEuclidean = b'e',
    /// Hamming distance over bit-packed vectors.
    Hamming = b'b',
    /// Tanimoto (Jaccard) similarity over bit-packed vectors.
    #[serde(alias = "jaccard")]
    Tanimoto = b't',
}

impl MetricKind {
    /// Alias of [`MetricKind::InnerProduct`].
    pub const DOT: Self = Self::InnerProduct;
    /// Alias of [`MetricKind::Cosine`].
    pub const ANGULAR: Self = Self::Cosine;
    /// Alias of [`MetricKind::SquaredEuclidean`]; the square root is applied by callers.
    pub const EUCLIDEAN: Self = Self::SquaredEuclidean;

    /// Every metric, in table order.
    pub const ALL: [Self; 5] = [
        Self::InnerProduct,
        Self::Cosine,
        Self::SquaredEuclidean,
        Self::Hamming,
        Self::Tanimoto,
    ];

    /// Stable single-byte code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Looks a metric up by its single-byte code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            b'i' => Some(Self::InnerProduct),
            b'c' => Some(Self::Cosine),
            b'e' => Some(Self::SquaredEuclidean),
            b'b' => Some(Self::Hamming),
            b't' => Some(Self::Tanimoto),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InnerProduct => "innerproduct",
            Self::Cosine => "cosine",
            Self::SquaredEuclidean => "squaredeuclidean",
            Self::Hamming => "hamming",
            Self::Tanimoto => "tanimoto",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::InnerProduct => 0,
            Self::Cosine => 1,
            Self::SquaredEuclidean => 2,
            Self::Hamming => 3,
            Self::Tanimoto => 4,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "innerproduct" | "inner_product" | "inner" | "ip" | "dot" => Ok(Self::InnerProduct),
            "cosine" | "cos" | "angular" => Ok(Self::Cosine),
            "squaredeuclidean" | "squared_euclidean" | "sqeuclidean" | "l2sq" | "euclidean"
            | "l2" => Ok(Self::SquaredEuclidean),
            "hamming" => Ok(Self::Hamming),
            "tanimoto" | "jaccard" => Ok(Self::Tanimoto),
            _ => Err(Error::UnknownMetric(s.to_string())),
        }
    }
}

/// Element type of the raw buffers a kernel reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// IEEE double precision.
    F64,
    /// IEEE single precision.
    F32,
    /// IEEE half precision (`half::f16`).
    F16,
    /// Signed 8-bit integers.
    I8,
    /// Bit-packed binary vectors, eight dimensions per byte.
    #[serde(alias = "binary", alias = "bits")]
    B1,
}

impl DataType {
    /// Every datatype, in table order.
    pub const ALL: [Self; 5] = [Self::F64, Self::F32, Self::F16, Self::I8, Self::B1];

    /// Size in bytes of one stored element (one byte holds eight `B1` dimensions).
    #[must_use]
    pub const fn element_size(self) -> usize {
        match self {
            Self::F64 => 8,
            Self::F32 => 4,
            Self::F16 => 2,
            Self::I8 | Self::B1 => 1,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::I8 => "i8",
            Self::B1 => "b1",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::F64 => 0,
            Self::F32 => 1,
            Self::F16 => 2,
            Self::I8 => 3,
            Self::B1 => 4,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f64" | "float64" | "double" => Ok(Self::F64),
            "f32" | "float32" | "float" => Ok(Self::F32),
            "f16" | "float16" | "half" => Ok(Self::F16),
            "i8" | "int8" => Ok(Self::I8),
            "b1" | "binary" | "bits" => Ok(Self::B1),
            _ => Err(Error::UnknownDataType(s.to_string())),
        }
    }
}
