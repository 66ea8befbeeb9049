//! Value & Field Model
//!
//! The typed foundation every other component works on:
//!
//! - **Value**: a typed scalar (string, number, boolean, timestamp)
//! - **Record**: one resource instance, an immutable field → value map
//! - **FieldSchema**: per-resource field definitions with operator
//!   capabilities, sortability and the stable identifier field
//!
//! Schemas are built once per process and shared read-only; records are
//! request-scoped.

mod schema;
mod types;

pub use schema::{Capabilities, Direction, FieldDef, FieldKind, FieldSchema};
pub use types::{format_timestamp, parse_timestamp, Record, Value};
