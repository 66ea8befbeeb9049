//! Collection engine error types

use thiserror::Error;

use crate::source::SourceError;

/// Cursor errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PagingError {
    /// Token could not be decoded or failed its checksum
    #[error("Invalid cursor: {0}")]
    Corrupt(String),

    /// Token was produced for a different filter or order
    #[error("cursor mismatch: the cursor was issued for a different {0}")]
    Mismatch(&'static str),

    /// Token could not be produced
    #[error("Failed to encode cursor: {0}")]
    Encode(String),
}

impl From<bincode::Error> for PagingError {
    fn from(err: bincode::Error) -> Self {
        PagingError::Corrupt(err.to_string())
    }
}

/// Result type for cursor operations
pub type PagingResult<T> = Result<T, PagingError>;

/// Errors from a collection request
#[derive(Error, Debug)]
pub enum CollectionError {
    /// Cursor rejected
    #[error(transparent)]
    Paging(#[from] PagingError),

    /// Record source failed
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Result type for collection requests
pub type CollectionResult<T> = Result<T, CollectionError>;
