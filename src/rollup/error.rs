//! Rollup error types

use thiserror::Error;

/// Errors from time-bucketed aggregation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RollupError {
    /// Interval is not `<N><m|h|d|w>` with N > 0
    #[error("Unsupported rollup interval '{0}': expected <N><m|h|d|w>, e.g. 1h")]
    UnsupportedInterval(String),

    /// Method is not one of avg, min, max, count, sum
    #[error("Unsupported rollup method '{0}': expected avg, min, max, count or sum")]
    UnsupportedMethod(String),

    /// Numeric method applied to a non-numeric value
    #[error("non-numeric sample at {timestamp} for method {method}")]
    NonNumeric { timestamp: String, method: String },

    /// Reduction produced a non-finite value
    #[error("non-numeric sample: overflow in bucket starting at {bucket_start}")]
    Overflow { bucket_start: String },
}

/// Result type for rollups
pub type RollupResult<T> = Result<T, RollupError>;
