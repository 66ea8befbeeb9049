//! Collection Engine
//!
//! Turns a record source, a bound predicate and an order into:
//!
//! - **Page**: a bounded window plus an opaque, checksummed continuation
//!   cursor (peek-ahead-by-one decides whether a cursor is issued)
//! - **Scan**: the full ordered result up to a hard row cap, for bulk export

mod cursor;
mod engine;
mod error;

pub use cursor::Cursor;
pub use engine::{CollectionEngine, Page};
pub use error::{CollectionError, CollectionResult, PagingError, PagingResult};
