//! Operation error types

use thiserror::Error;

use crate::collection::{CollectionError, PagingError};
use crate::export::ExportError;
use crate::query::FilterError;
use crate::rollup::RollupError;
use crate::source::SourceError;
use crate::time::TimeError;

/// Errors returned by named operations
#[derive(Error, Debug)]
pub enum OperationError {
    #[error("Invalid query: {0}")]
    Filter(#[from] FilterError),

    #[error("Invalid time range: {0}")]
    Time(#[from] TimeError),

    #[error("Invalid cursor: {0}")]
    Paging(#[from] PagingError),

    #[error("Rollup error: {0}")]
    Rollup(#[from] RollupError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),
}

impl OperationError {
    pub(crate) fn invalid_argument(name: &str, message: impl Into<String>) -> Self {
        OperationError::InvalidArgument {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            OperationError::Filter(_) => "filter_error",
            OperationError::Time(_) => "time_error",
            OperationError::Paging(_) => "paging_error",
            OperationError::Rollup(_) => "rollup_error",
            OperationError::Export(_) => "export_error",
            OperationError::NotFound { .. } => "not_found",
            OperationError::Unavailable(_) => "upstream_unavailable",
            OperationError::InvalidArgument { .. } => "invalid_argument",
            OperationError::UnknownOperation(_) => "unknown_operation",
        }
    }

    /// Check whether repeating the call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, OperationError::Unavailable(_))
    }
}

impl From<SourceError> for OperationError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound { resource, id } => OperationError::NotFound { resource, id },
            SourceError::Unavailable(msg) => OperationError::Unavailable(msg),
            SourceError::Malformed(msg) => OperationError::Unavailable(format!("malformed upstream response: {}", msg)),
        }
    }
}

impl From<CollectionError> for OperationError {
    fn from(err: CollectionError) -> Self {
        match err {
            CollectionError::Paging(e) => OperationError::Paging(e),
            CollectionError::Source(e) => e.into(),
        }
    }
}

/// Result type for operations
pub type OperationResult<T> = Result<T, OperationError>;
