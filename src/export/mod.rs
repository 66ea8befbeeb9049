//! Export Formatter
//!
//! Field-projected CSV for bulk operations:
//!
//! - **Formatter**: header and rows, one record at a time
//! - **Stream**: a producer task feeding a bounded channel, so rows are
//!   only rendered as fast as the sink consumes them

mod formatter;
mod stream;

use thiserror::Error;

pub use formatter::ExportFormatter;
pub use stream::ExportStream;

/// Errors from delimited-text rendering
#[derive(Error, Debug)]
pub enum ExportError {
    /// CSV writer failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Writer could not be flushed
    #[error("Export write error: {0}")]
    Write(String),
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;
