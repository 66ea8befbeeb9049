//! Application State
//!
//! Shared state accessible by all API handlers.

use std::sync::Arc;
use std::time::Instant;

use crate::config::ApiConfig;
use crate::ops::Operations;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Operation dispatcher over the configured record source
    pub operations: Operations,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(operations: Operations, config: ApiConfig) -> Self {
        Self {
            operations,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
