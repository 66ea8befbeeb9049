//! Operation Routes
//!
//! - GET /api/v1/operations - Operation catalog
//! - GET /api/v1/operations/:name - One catalog entry
//! - POST /api/v1/operations/:name - Invoke with a JSON argument object

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::CatalogResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::ops::{describe, lookup, operations, Arguments, OperationError, OperationOutput};

/// GET /api/v1/operations
pub async fn list_operations() -> Json<CatalogResponse> {
    let entries: Vec<_> = operations().iter().map(describe).collect();
    Json(CatalogResponse {
        count: entries.len(),
        operations: entries,
    })
}

/// GET /api/v1/operations/:name
pub async fn describe_operation(Path(name): Path<String>) -> ApiResult<Json<serde_json::Value>> {
    let spec = lookup(&name).ok_or(OperationError::UnknownOperation(name))?;
    Ok(Json(describe(spec)))
}

/// POST /api/v1/operations/:name
///
/// An empty body is an empty argument map. Bulk operations stream CSV.
pub async fn call_operation(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Response> {
    let args = parse_arguments(&body)?;
    let output = state.operations.call(&name, &args).await?;
    Ok(render(&name, output))
}

fn parse_arguments(body: &[u8]) -> ApiResult<Arguments> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Arguments::new());
    }
    let json: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Request body is not valid JSON: {}", e)))?;
    Ok(Arguments::from_json(json)?)
}

fn render(name: &str, output: OperationOutput) -> Response {
    let content_type = output.content_type();
    match output {
        OperationOutput::Text(text) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], text).into_response()
        }
        OperationOutput::Export(stream) => {
            let filename = format!("fleetql_{}_{}.csv", name, Utc::now().format("%Y%m%d_%H%M%S"));
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", filename),
                    ),
                ],
                Body::from_stream(stream.into_stream()),
            )
                .into_response()
        }
        other => match other.to_json() {
            Some(value) => (StatusCode::OK, Json(value)).into_response(),
            None => ApiError::Internal("operation produced no output".to_string()).into_response(),
        },
    }
}
