//! API Error Types
//!
//! Maps operation failures to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ops::OperationError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body could not be used as an argument map
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation failed
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl ApiError {
    /// HTTP status and machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            ApiError::Operation(e) => {
                let status = match e {
                    OperationError::NotFound { .. } | OperationError::UnknownOperation(_) => {
                        StatusCode::NOT_FOUND
                    }
                    OperationError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    OperationError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, e.kind())
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let retryable = matches!(&self, ApiError::Operation(e) if e.is_retryable());

        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "API error occurred"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
                retryable,
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FilterError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::Operation(OperationError::UnknownOperation("nope".into())),
                StatusCode::NOT_FOUND,
                "unknown_operation",
            ),
            (
                ApiError::Operation(OperationError::Unavailable("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
                "upstream_unavailable",
            ),
            (
                ApiError::Operation(OperationError::InvalidArgument {
                    name: "size".into(),
                    message: "expected an integer".into(),
                }),
                StatusCode::BAD_REQUEST,
                "invalid_argument",
            ),
            (
                ApiError::Validation("body must be an object".into()),
                StatusCode::BAD_REQUEST,
                "invalid_argument",
            ),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.status_and_code(), (status, code));
        }
    }

    #[test]
    fn test_filter_error_passes_through() {
        let error = ApiError::from(OperationError::from(FilterError::NotSortable {
            field: "value".into(),
        }));
        assert_eq!(error.status_and_code().1, "filter_error");
        assert!(error.to_string().starts_with("Invalid query"));
    }
}
