//! Record Sources
//!
//! The seam between the query engine and whatever stores fleet resources:
//!
//! - **InMemorySource**: records held in memory, loadable from a JSON fixture
//! - **HttpSource**: records fetched from an upstream JSON service
//!
//! A source only hands over candidate records. Filtering, ordering and
//! paging stay in the collection engine, so every source behaves the same.
//! Sources never retry; the caller bounds each call with a timeout.

mod http;
mod memory;

pub use http::HttpSource;
pub use memory::InMemorySource;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Record, Value};
use crate::resources::ResourceKind;

/// A request for candidate records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Resource kind to fetch
    pub resource: ResourceKind,
    /// Parent identifier for scoped kinds (e.g. the stream of a history)
    pub scope: Option<String>,
}

impl FetchRequest {
    /// Unscoped request
    pub fn new(resource: ResourceKind) -> Self {
        Self {
            resource,
            scope: None,
        }
    }

    /// Builder method: restrict to one parent
    pub fn scoped(mut self, parent_id: impl Into<String>) -> Self {
        self.scope = Some(parent_id.into());
        self
    }
}

/// Errors a record source can report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Identifier is well-formed but no record has it
    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    /// Upstream unreachable, offline or timed out
    #[error("Record source unavailable: {0}")]
    Unavailable(String),

    /// Upstream answered with something that is not records
    #[error("Malformed response from record source: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Not-found error for a resource kind
    pub fn not_found(resource: ResourceKind, id: &Value) -> Self {
        SourceError::NotFound {
            resource: resource.as_str().to_string(),
            id: id.to_text(),
        }
    }
}

/// Result type for record sources
pub type SourceResult<T> = Result<T, SourceError>;

/// Common trait for all record sources
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Candidate records for a request
    async fn fetch(&self, request: &FetchRequest) -> SourceResult<Vec<Record>>;

    /// A single record by identifier
    async fn get(&self, request: &FetchRequest, id: &Value) -> SourceResult<Record> {
        let id_field = request.resource.schema().id_field();
        self.fetch(request)
            .await?
            .into_iter()
            .find(|record| record.value(id_field) == id)
            .ok_or_else(|| SourceError::not_found(request.resource, id))
    }
}

/// Convert a JSON array of objects into typed records
pub(crate) fn records_from_json(resource: ResourceKind, json: &serde_json::Value) -> SourceResult<Vec<Record>> {
    let items = json
        .as_array()
        .or_else(|| json.get("list").and_then(|l| l.as_array()))
        .ok_or_else(|| SourceError::Malformed(format!("expected an array of {} records", resource)))?;

    let schema = resource.schema();
    items
        .iter()
        .map(|item| {
            Record::from_json(schema, item)
                .ok_or_else(|| SourceError::Malformed(format!("{} record is not an object", resource)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_from_json_accepts_array_or_page() {
        let array = json!([{"id": "a"}, {"id": "b"}]);
        assert_eq!(records_from_json(ResourceKind::Devices, &array).unwrap().len(), 2);

        let page = json!({"count": 1, "list": [{"id": "a"}]});
        assert_eq!(records_from_json(ResourceKind::Devices, &page).unwrap().len(), 1);
    }

    #[test]
    fn test_records_from_json_rejects_non_objects() {
        assert!(matches!(
            records_from_json(ResourceKind::Devices, &json!([1, 2])),
            Err(SourceError::Malformed(_))
        ));
        assert!(matches!(
            records_from_json(ResourceKind::Devices, &json!({"x": 1})),
            Err(SourceError::Malformed(_))
        ));
    }
}
