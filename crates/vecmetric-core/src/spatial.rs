//! Typed convenience API over the default dispatcher.
//!
//! Every function returns `None` when the two slices differ in length.
//!
//! ```
//! use vecmetric_core::{BinarySimilarity, SpatialSimilarity};
//!
//! let a = [1.0_f32, 0.0, 0.0, 0.0];
//! let b = [0.0_f32, 1.0, 0.0, 0.0];
//! assert_eq!(f32::dot(&a, &b), Some(0.0));
//! assert_eq!(f32::sqeuclidean(&a, &b), Some(2.0));
//! assert_eq!(f32::dot(&a, &b[..3]), None);
//!
//! assert_eq!(u8::hamming(&[0b1111_0000], &[0b0000_1111]), Some(8));
//! ```

use crate::dispatch::default_dispatcher;
use crate::metric::MetricKind;
use crate::view::{Element, Score};

fn compute<T: Element>(kind: MetricKind, a: &[T], b: &[T]) -> Option<Score> {
    default_dispatcher()
        .get(kind, T::DATATYPE)
        .and_then(|handle| handle.compute(T::view(a), T::view(b)))
        .ok()
}

fn real<T: Element>(kind: MetricKind, a: &[T], b: &[T]) -> Option<f32> {
    compute(kind, a, b).and_then(Score::real)
}

/// Similarity and distance over dense numeric vectors.
pub trait SpatialSimilarity: Element {
    /// Inner product.
    fn dot(a: &[Self], b: &[Self]) -> Option<f32> {
        real(MetricKind::InnerProduct, a, b)
    }

    /// Cosine similarity; NaN when either vector has zero norm.
    fn cosine(a: &[Self], b: &[Self]) -> Option<f32> {
        real(MetricKind::Cosine, a, b)
    }

    /// Squared Euclidean distance.
    fn sqeuclidean(a: &[Self], b: &[Self]) -> Option<f32> {
        real(MetricKind::SquaredEuclidean, a, b)
    }

    /// Euclidean distance.
    fn euclidean(a: &[Self], b: &[Self]) -> Option<f32> {
        Self::sqeuclidean(a, b).map(f32::sqrt)
    }
}

impl SpatialSimilarity for f64 {}
impl SpatialSimilarity for f32 {}
impl SpatialSimilarity for half::f16 {}
impl SpatialSimilarity for i8 {}

/// Metrics over bit-packed binary vectors (eight dimensions per byte).
pub trait BinarySimilarity: Element {
    /// Number of differing bits.
    fn hamming(a: &[Self], b: &[Self]) -> Option<u64>;

    /// `|a ∧ b| / |a ∨ b|`, 1.0 for two all-zero vectors.
    fn tanimoto(a: &[Self], b: &[Self]) -> Option<f32>;
}

impl BinarySimilarity for u8 {
    fn hamming(a: &[u8], b: &[u8]) -> Option<u64> {
        compute(MetricKind::Hamming, a, b).and_then(Score::count)
    }

    fn tanimoto(a: &[u8], b: &[u8]) -> Option<f32> {
        real(MetricKind::Tanimoto, a, b)
    }
}
