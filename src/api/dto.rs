//! Data Transfer Objects
//!
//! Response types for the API endpoints.

use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy or degraded
    pub status: String,
    /// Record source status: ok or unavailable
    pub source: String,
    /// Record source backend name
    pub source_name: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}

/// Operation catalog response
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    /// Number of operations
    pub count: usize,
    /// One entry per operation
    pub operations: Vec<serde_json::Value>,
}
