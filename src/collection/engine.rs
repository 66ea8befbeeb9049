//! Collection engine
//!
//! Windows a candidate record set through a predicate and an order into a
//! page. Request lifecycle:
//!
//! ```text
//! Received → FilterCompiled → OrderCompiled → Windowing → Exhausted | HasMore → Responded
//! ```
//!
//! Filter and order compilation happen before this engine is called. The
//! cursor is decoded and verified before the source is read, so malformed
//! input never reaches the record source.

use serde::Serialize;
use tracing::{debug, warn};

use crate::collection::cursor::Cursor;
use crate::collection::error::{CollectionResult, PagingResult};
use crate::model::Record;
use crate::query::{OrderSpec, Predicate};
use crate::source::{FetchRequest, RecordSource};

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// Total records matching the filter, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Effective page size
    pub size: usize,
    /// Ordered records in this page
    pub list: Vec<Record>,
    /// Continuation token, present iff more records remain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl Page {
    /// Check if more records remain beyond this page
    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }
}

/// Paging engine configuration
#[derive(Debug, Clone, Copy)]
pub struct CollectionEngine {
    max_page_size: usize,
    default_page_size: usize,
}

impl Default for CollectionEngine {
    fn default() -> Self {
        Self::new(1000, 1000)
    }
}

impl CollectionEngine {
    /// Create an engine; the default size is clamped into `[1, max]`
    pub fn new(max_page_size: usize, default_page_size: usize) -> Self {
        let max_page_size = max_page_size.max(1);
        Self {
            max_page_size,
            default_page_size: default_page_size.clamp(1, max_page_size),
        }
    }

    /// Maximum page size
    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// Clamp a requested size into `[1, max_page_size]`
    pub fn clamp_size(&self, requested: Option<i64>) -> usize {
        match requested {
            None => self.default_page_size,
            Some(n) if n < 1 => 1,
            Some(n) => usize::try_from(n)
                .unwrap_or(usize::MAX)
                .min(self.max_page_size),
        }
    }

    /// Fetch candidates from a source and return one page
    pub async fn list(
        &self,
        source: &dyn RecordSource,
        request: &FetchRequest,
        predicate: &Predicate,
        order: &OrderSpec,
        size: Option<i64>,
        cursor: Option<&str>,
    ) -> CollectionResult<Page> {
        let size = self.clamp_size(size);

        let position = match cursor.map(str::trim).filter(|c| !c.is_empty()) {
            Some(token) => {
                let cursor = Cursor::decode(token)?;
                cursor.verify(predicate, order)?;
                Some(cursor)
            }
            None => None,
        };

        debug!(
            resource = %request.resource,
            filter = predicate.canonical(),
            order = %order.canonical(),
            size,
            resumed = position.is_some(),
            "Windowing"
        );

        let records = source.fetch(request).await.map_err(|e| {
            warn!(resource = %request.resource, source = source.name(), error = %e, "Record source fetch failed");
            e
        })?;

        let id_field = request.resource.schema().id_field();
        let page = self.page(records, predicate, order, id_field, size, position.as_ref())?;

        debug!(
            returned = page.list.len(),
            count = ?page.count,
            state = if page.has_more() { "HasMore" } else { "Exhausted" },
            "Page ready"
        );

        Ok(page)
    }

    /// Window an in-memory candidate set
    ///
    /// `size` must already be clamped. Records at or before the cursor
    /// position are skipped; one extra record is kept to decide whether a
    /// continuation cursor is needed.
    pub fn page(
        &self,
        records: Vec<Record>,
        predicate: &Predicate,
        order: &OrderSpec,
        id_field: &str,
        size: usize,
        cursor: Option<&Cursor>,
    ) -> PagingResult<Page> {
        let size = size.max(1);

        let mut matched: Vec<Record> = records.into_iter().filter(|r| predicate.matches(r)).collect();
        let count = matched.len();

        if let Some(cursor) = cursor {
            matched.retain(|r| order.compare_to_key(r, cursor.last_key()).is_gt());
        }

        let window = size + 1;
        if matched.len() > window {
            matched.select_nth_unstable_by(window - 1, |a, b| order.compare(a, b));
            matched.truncate(window);
        }
        matched.sort_by(|a, b| order.compare(a, b));

        let has_more = matched.len() > size;
        matched.truncate(size);

        let cursor = match matched.last() {
            Some(last) if has_more => Some(Cursor::after(predicate, order, id_field, last).encode()?),
            _ => None,
        };

        Ok(Page {
            count: Some(count),
            size,
            list: matched,
            cursor,
        })
    }

    /// Full ordered result set, bounded by `cap`
    pub fn scan(&self, records: Vec<Record>, predicate: &Predicate, order: &OrderSpec, cap: usize) -> Vec<Record> {
        let mut matched: Vec<Record> = records.into_iter().filter(|r| predicate.matches(r)).collect();
        matched.sort_by(|a, b| order.compare(a, b));

        if matched.len() > cap {
            warn!(matched = matched.len(), cap, "Bulk result truncated at row cap");
            matched.truncate(cap);
        }

        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::PagingError;
    use crate::model::{FieldDef, FieldSchema, Value};
    use crate::query::compile_at;
    use std::collections::HashSet;

    fn schema() -> FieldSchema {
        FieldSchema::builder("devices", "id")
            .field(FieldDef::string("id").sortable())
            .field(FieldDef::string("name").sortable())
            .field(FieldDef::number("signal_percent").sortable())
            .build()
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                Record::new()
                    .with("id", format!("dev-{:03}", i))
                    .with("name", format!("n{}", i % 7))
                    .with("signal_percent", (i % 5) as f64 * 20.0)
            })
            .collect()
    }

    fn ids(list: &[Record]) -> Vec<String> {
        list.iter().map(|r| r.value("id").to_text()).collect()
    }

    /// Follow cursors until exhausted
    fn walk(engine: &CollectionEngine, data: &[Record], predicate: &Predicate, order: &OrderSpec, size: usize) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor: Option<Cursor> = None;
        loop {
            let page = engine
                .page(data.to_vec(), predicate, order, "id", size, cursor.as_ref())
                .unwrap();
            assert!(page.list.len() <= size);
            assert!(page.count.unwrap() >= page.list.len());
            out.extend(ids(&page.list));
            match page.cursor {
                Some(token) => {
                    let next = Cursor::decode(&token).unwrap();
                    next.verify(predicate, order).unwrap();
                    cursor = Some(next);
                }
                None => break,
            }
        }
        out
    }

    #[test]
    fn test_clamp_size() {
        let engine = CollectionEngine::new(1000, 100);
        assert_eq!(engine.clamp_size(None), 100);
        assert_eq!(engine.clamp_size(Some(50)), 50);
        assert_eq!(engine.clamp_size(Some(5000)), 1000);
        assert_eq!(engine.clamp_size(Some(0)), 1);
        assert_eq!(engine.clamp_size(Some(-3)), 1);
    }

    #[test]
    fn test_pages_concatenate_to_full_result() {
        let engine = CollectionEngine::default();
        let data = records(37);
        let schema = schema();
        let predicate = compile_at(&schema, "signal_percent>10", 0).unwrap();

        for orderby in [None, Some("name asc"), Some("signal_percent desc, name desc")] {
            let order = OrderSpec::compile(&schema, orderby).unwrap();
            let full = ids(&engine.scan(data.clone(), &predicate, &order, usize::MAX));

            for size in [1, 2, 3, 7, 10, 29, 100] {
                let walked = walk(&engine, &data, &predicate, &order, size);
                assert_eq!(walked, full, "orderby={orderby:?} size={size}");
                let unique: HashSet<_> = walked.iter().collect();
                assert_eq!(unique.len(), walked.len());
            }
        }
    }

    #[test]
    fn test_cursor_present_iff_more() {
        let engine = CollectionEngine::default();
        let schema = schema();
        let order = OrderSpec::compile(&schema, None).unwrap();
        let all = Predicate::always();

        let page = engine.page(records(10), &all, &order, "id", 10, None).unwrap();
        assert_eq!(page.list.len(), 10);
        assert!(page.cursor.is_none());

        let page = engine.page(records(11), &all, &order, "id", 10, None).unwrap();
        assert_eq!(page.list.len(), 10);
        assert!(page.cursor.is_some());
        assert_eq!(page.count, Some(11));
    }

    #[test]
    fn test_empty_result_is_success() {
        let engine = CollectionEngine::default();
        let schema = schema();
        let order = OrderSpec::compile(&schema, None).unwrap();
        let none = compile_at(&schema, "signal_percent>1000", 0).unwrap();

        let page = engine.page(records(5), &none, &order, "id", 10, None).unwrap();
        assert!(page.list.is_empty());
        assert_eq!(page.count, Some(0));
        assert!(!page.has_more());
    }

    #[test]
    fn test_page_serializes_without_cursor_when_exhausted() {
        let engine = CollectionEngine::default();
        let schema = schema();
        let order = OrderSpec::compile(&schema, None).unwrap();
        let page = engine.page(records(2), &Predicate::always(), &order, "id", 10, None).unwrap();

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["size"], 10);
        assert_eq!(json["list"].as_array().unwrap().len(), 2);
        assert!(json.get("cursor").is_none());
    }

    #[test]
    fn test_scan_respects_cap() {
        let engine = CollectionEngine::default();
        let schema = schema();
        let order = OrderSpec::compile(&schema, None).unwrap();
        let rows = engine.scan(records(20), &Predicate::always(), &order, 5);
        assert_eq!(ids(&rows), vec!["dev-000", "dev-001", "dev-002", "dev-003", "dev-004"]);
    }

    #[tokio::test]
    async fn test_list_rejects_cursor_before_fetch() {
        use crate::resources::ResourceKind;
        use crate::source::{InMemorySource, SourceError};
        use async_trait::async_trait;

        struct Unreachable;

        #[async_trait]
        impl RecordSource for Unreachable {
            fn name(&self) -> &str {
                "unreachable"
            }

            async fn fetch(&self, _request: &FetchRequest) -> Result<Vec<Record>, SourceError> {
                panic!("source must not be touched");
            }
        }

        let engine = CollectionEngine::default();
        let schema = ResourceKind::Devices.schema();
        let order = OrderSpec::compile(schema, None).unwrap();
        let request = FetchRequest::new(ResourceKind::Devices);

        let err = engine
            .list(&Unreachable, &request, &Predicate::always(), &order, None, Some("garbage"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::collection::CollectionError::Paging(PagingError::Corrupt(_))));

        // A real source still pages normally
        let source = InMemorySource::new().with_records(
            ResourceKind::Devices,
            vec![
                Record::new().with("id", Value::from("00000000-00000000-00000000-00000002")),
                Record::new().with("id", Value::from("00000000-00000000-00000000-00000001")),
            ],
        );
        let page = engine
            .list(&source, &request, &Predicate::always(), &order, Some(1), None)
            .await
            .unwrap();
        assert_eq!(ids(&page.list), vec!["00000000-00000000-00000000-00000001"]);
        assert!(page.has_more());
    }
}
