//! Error types for vecmetric-core.

use thiserror::Error;

use crate::metric::{DataType, MetricKind};

/// Errors surfaced by dispatch, handle invocation, parsing and configuration.
#[derive(Error, Debug)]
pub enum Error {
    /// No tier, including the serial baseline, implements the requested pair.
    #[error("no kernel implements {kind} over {datatype}")]
    UnsupportedMetric {
        /// Requested metric.
        kind: MetricKind,
        /// Requested element type.
        datatype: DataType,
    },

    /// A vector view of the wrong element type was passed to a kernel handle.
    #[error("datatype mismatch: kernel expects {expected}, got {actual}")]
    DataTypeMismatch {
        /// Element type the handle was selected for.
        expected: DataType,
        /// Element type of the offending view.
        actual: DataType,
    },

    /// The two vectors do not have the same dimension.
    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch {
        /// Length of the first vector.
        left: usize,
        /// Length of the second vector.
        right: usize,
    },

    /// Unrecognised metric name.
    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    /// Unrecognised datatype name.
    #[error("unknown datatype: {0}")]
    UnknownDataType(String),

    /// Unrecognised capability name.
    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    /// Configuration could not be extracted.
    ///
    /// The figment message is part of this error's text; there is no source.
    #[error("configuration error: {0}")]
    Config(Box<figment::Error>),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

/// Result type alias for vecmetric operations.
pub type Result<T> = std::result::Result<T, Error>;
