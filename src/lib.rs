//! # fleetql
//!
//! Query engine shared by every listing operation of a device-fleet
//! management service: a small filter language, relative time ranges,
//! cursor paging, time-bucketed rollups and streamed CSV export.
//!
//! ## Modules
//!
//! - [`model`]: Records, typed values and per-resource field schemas
//! - [`query`]: Filter language parser, compiler and ordering
//! - [`time`]: Relative and absolute time range resolution
//! - [`collection`]: Generic filter/order/page engine with opaque cursors
//! - [`rollup`]: Time-bucketed aggregation over stream history
//! - [`export`]: CSV export, buffered or streamed
//! - [`resources`]: The fleet resource catalog
//! - [`source`]: Record sources (in-memory fixtures, upstream HTTP)
//! - [`ops`]: Named operation facade
//! - [`api`]: REST host with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fleetql::ops::{Arguments, OperationOutput};
//! use fleetql::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let operations = Config::load_default().operations()?;
//!
//!     let args = Arguments::new()
//!         .with("query", "connection_status='connected' and signal_percent>50")
//!         .with("orderby", "name asc")
//!         .with("size", 100);
//!
//!     if let OperationOutput::Page(page) = operations.call("list_devices", &args).await? {
//!         println!("{} of {:?} devices", page.list.len(), page.count);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod collection;
pub mod config;
pub mod export;
pub mod model;
pub mod ops;
pub mod query;
pub mod resources;
pub mod rollup;
pub mod source;
pub mod telemetry;
pub mod time;

// Re-export top-level types for convenience
pub use model::{Direction, FieldDef, FieldKind, FieldSchema, Record, Value};

pub use query::{compile, compile_at, Filter, FilterError, FilterResult, OrderSpec, Predicate};

pub use time::{TimeError, TimeRange};

pub use collection::{CollectionEngine, CollectionError, Cursor, Page, PagingError};

pub use rollup::{rollup, RollupBucket, RollupError, RollupInterval, RollupMethod, Sample};

pub use export::{ExportError, ExportFormatter, ExportStream};

pub use resources::ResourceKind;

pub use source::{FetchRequest, HttpSource, InMemorySource, RecordSource, SourceError, SourceResult};

pub use ops::{Arguments, OperationError, OperationOutput, OperationResult, OperationSettings, Operations};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError};
