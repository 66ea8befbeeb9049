//! Filter Language & Ordering
//!
//! A small conjunctive filter language over schema-typed records:
//!
//! - **AST**: untyped filter expression tree
//! - **Parser**: parse query strings into the AST
//! - **Filter**: schema checking, binding and evaluation
//! - **Order**: `orderby` compilation with identifier tie-break
//!
//! # Query Language
//!
//! ```text
//! FIELD OP LITERAL [and FIELD OP LITERAL ...]
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use fleetql::query::{compile, OrderSpec};
//! use fleetql::resources::ResourceKind;
//!
//! let schema = ResourceKind::Devices.schema();
//! let filter = compile(schema, "connection_status='connected' and signal_percent>50")?;
//! let predicate = filter.bind(now_ms);
//! let order = OrderSpec::compile(schema, Some("name asc"))?;
//! ```

mod ast;
mod error;
mod filter;
mod order;
mod parser;

pub use ast::{Comparison, Expr, Literal, Operator};
pub use error::{FilterError, FilterResult};
pub use filter::{compile, compile_at, Filter, Predicate};
pub use order::{OrderSpec, SortKey};
pub use parser::parse_filter;
