//! # vecmetric-core
//!
//! Similarity and distance kernels for dense and binary vectors, selected at
//! runtime for the instruction sets the running CPU supports.
//!
//! ## Features
//!
//! - **5 Metrics**: inner product, cosine, squared Euclidean, Hamming, Tanimoto
//! - **5 Element Types**: `f64`, `f32`, `f16`, `i8`, bit-packed `b1`
//! - **Runtime Dispatch**: AVX-512, AVX2, NEON and a portable baseline,
//!   chosen once per (metric, datatype) from the detected capabilities
//! - **Capability Override**: restrict tiers per call, per dispatcher, or
//!   through `VECMETRIC_ALLOWED` / a TOML file
//!
//! ## Quick Start
//!
//! ```rust
//! use vecmetric_core::{select, Capabilities, DataType, MetricKind, VectorView};
//!
//! fn main() -> vecmetric_core::Result<()> {
//!     let handle = select(MetricKind::Cosine, DataType::F32, Capabilities::all())?;
//!
//!     let a = [1.0_f32, 1.0, 1.0, 1.0];
//!     let score = handle.compute(VectorView::F32(&a), VectorView::F32(&a))?;
//!     assert!((score.as_f32() - 1.0).abs() < 1e-6);
//!
//!     // The portable kernels are always available.
//!     let serial = select(MetricKind::Cosine, DataType::F32, Capabilities::NONE)?;
//!     assert_eq!(serial.tier(), vecmetric_core::Tier::Serial);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(
    test,
    allow(
        clippy::float_cmp,
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )
)]

pub mod capability;
pub mod config;
#[cfg(test)]
mod config_tests;
pub mod detect;
pub mod dispatch;
pub mod error;
mod kernels;
pub mod metric;
#[cfg(test)]
mod metric_tests;
pub mod spatial;
#[cfg(test)]
mod spatial_tests;
pub mod view;

pub use capability::Capabilities;
pub use config::DispatchConfig;
pub use detect::{capabilities, detect};
pub use dispatch::{default_dispatcher, select, Dispatcher, KernelHandle, Tier};
pub use error::{Error, Result};
pub use metric::{DataType, MetricKind};
pub use spatial::{BinarySimilarity, SpatialSimilarity};
pub use view::{Element, Score, VectorView};
