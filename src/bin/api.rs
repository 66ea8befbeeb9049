//! fleetql API Server
//!
//! Run with: cargo run --bin fleetql-api
//!
//! # Configuration
//!
//! Loaded from `FLEETQL_CONFIG` when set, otherwise from the default
//! locations (see `fleetql config`). Environment variables:
//! - `FLEETQL_API_HOST`, `FLEETQL_API_PORT`: Bind address (default: 0.0.0.0:8086)
//! - `FLEETQL_SOURCE`: Record source backend, `fixture` or `http`
//! - `FLEETQL_FIXTURE`: Fixture file for the fixture backend
//! - `FLEETQL_BASE_URL`: Upstream URL for the http backend
//! - `RUST_LOG`: Log filter (overrides `FLEETQL_LOG_LEVEL`)

use fleetql::api::{serve, AppState};
use fleetql::config::Config;
use fleetql::telemetry::init_tracing;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::var("FLEETQL_CONFIG") {
        Ok(path) => Config::load_with_env(&PathBuf::from(path))?,
        Err(_) => Config::load_default(),
    };

    init_tracing(&config.logging);

    tracing::info!("Starting fleetql API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        backend = ?config.source.backend,
        max_page_size = config.engine.max_page_size,
        bulk_row_cap = config.engine.bulk_row_cap,
        "Engine configured"
    );

    let operations = config.operations()?;
    let state = AppState::new(operations, config.api.clone());

    tracing::info!("Starting server on {}", config.api.addr());
    serve(state).await?;

    tracing::info!("fleetql API server stopped");
    Ok(())
}
