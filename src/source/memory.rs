//! In-memory record source
//!
//! Backs tests and the `fixture` backend. A fixture file is a JSON object
//! mapping resource names to arrays of records:
//!
//! ```json
//! {
//!   "devices": [{"id": "00000000-00000000-00409DFF-FF000001", "name": "gw-1"}],
//!   "stream_history": [{"id": "1", "stream_id": "...", "timestamp": "2024-01-15T14:00:00Z", "value": 21.5}]
//! }
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use crate::model::Record;
use crate::resources::ResourceKind;
use crate::source::{records_from_json, FetchRequest, RecordSource, SourceError, SourceResult};

/// Records held in memory, grouped by resource kind
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: HashMap<ResourceKind, Vec<Record>>,
}

impl InMemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add records for a kind
    pub fn with_records(mut self, kind: ResourceKind, records: Vec<Record>) -> Self {
        self.records.entry(kind).or_default().extend(records);
        self
    }

    /// Add a single record
    pub fn insert(&mut self, kind: ResourceKind, record: Record) {
        self.records.entry(kind).or_default().push(record);
    }

    /// Build from a fixture document
    pub fn from_json(json: &serde_json::Value) -> SourceResult<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| SourceError::Malformed("fixture must be a JSON object".to_string()))?;

        let mut source = Self::new();
        for (name, items) in object {
            let kind: ResourceKind = name.parse().map_err(SourceError::Malformed)?;
            let records = records_from_json(kind, items)?;
            source = source.with_records(kind, records);
        }

        Ok(source)
    }

    /// Load a fixture file
    pub fn load(path: &Path) -> SourceResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SourceError::Unavailable(format!("cannot read fixture {}: {}", path.display(), e))
        })?;
        let json: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| SourceError::Malformed(e.to_string()))?;

        let source = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            records = source.len(),
            "Loaded fixture"
        );
        Ok(source)
    }

    /// Total number of records across kinds
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// Check if the source holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, request: &FetchRequest) -> SourceResult<Vec<Record>> {
        let records = self.records.get(&request.resource).map(Vec::as_slice).unwrap_or(&[]);

        let scoped = match (request.resource.scope_field(), request.scope.as_deref()) {
            (Some(field), Some(parent)) => records
                .iter()
                .filter(|r| r.value(field).to_text() == parent)
                .cloned()
                .collect(),
            _ => records.to_vec(),
        };

        Ok(scoped)
    }
}
