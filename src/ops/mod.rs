//! Named Operations
//!
//! Binds the filter language, time resolver, collection engine, rollup
//! engine and export formatter into the named operations callers invoke
//! with a flat argument map.
//!
//! Every call follows the same order: arguments are validated and the
//! filter, order and cursor compiled before the record source is touched.
//! Each source call is bounded by the fetch timeout and never retried.

pub mod args;
pub mod catalog;
pub mod error;
pub mod output;
pub mod syntax;

pub use args::Arguments;
pub use catalog::{lookup, operations, Mode, OperationKind, OperationSpec};
pub use error::{OperationError, OperationResult};
pub use output::OperationOutput;

use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::collection::{CollectionEngine, Cursor};
use crate::export::{ExportFormatter, ExportStream};
use crate::model::{Direction, FieldKind, Record, Value};
use crate::query::{compile, OrderSpec, Predicate};
use crate::resources::ResourceKind;
use crate::rollup::{rollup, RollupBucket, RollupInterval, RollupMethod, Sample};
use crate::source::{FetchRequest, RecordSource};
use crate::time::resolve;

/// Tunables for operation dispatch
#[derive(Debug, Clone)]
pub struct OperationSettings {
    /// Maximum rows in a bulk export
    pub bulk_row_cap: usize,
    /// Rendered CSV lines buffered ahead of the consumer
    pub export_buffer_rows: usize,
    /// Bound on each record source call
    pub fetch_timeout: Duration,
}

impl Default for OperationSettings {
    fn default() -> Self {
        Self {
            bulk_row_cap: 100_000,
            export_buffer_rows: 256,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Operation dispatcher
#[derive(Clone)]
pub struct Operations {
    source: Arc<dyn RecordSource>,
    engine: CollectionEngine,
    settings: OperationSettings,
}

impl Operations {
    /// Create a dispatcher over a record source
    pub fn new(source: Arc<dyn RecordSource>, engine: CollectionEngine, settings: OperationSettings) -> Self {
        Self {
            source,
            engine,
            settings,
        }
    }

    /// Record source name
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Paging engine in use
    pub fn engine(&self) -> &CollectionEngine {
        &self.engine
    }

    /// Check that the record source answers within the fetch timeout
    pub async fn probe(&self) -> OperationResult<()> {
        self.bounded(self.source.fetch(&FetchRequest::new(ResourceKind::Groups)))
            .await
            .map(|_| ())
    }

    /// Invoke an operation at the current time
    pub async fn call(&self, name: &str, args: &Arguments) -> OperationResult<OperationOutput> {
        self.call_at(name, args, chrono::Utc::now().timestamp_millis()).await
    }

    /// Invoke an operation with an injected `now` (Unix ms)
    #[tracing::instrument(skip(self, args), fields(use_case = tracing::field::Empty))]
    pub async fn call_at(&self, name: &str, args: &Arguments, now: i64) -> OperationResult<OperationOutput> {
        if let Ok(Some(use_case)) = args.text("use_case") {
            tracing::Span::current().record("use_case", use_case.as_str());
        }

        let spec = lookup(name).ok_or_else(|| OperationError::UnknownOperation(name.to_string()))?;

        let result = match spec.kind {
            OperationKind::Collection {
                resource,
                mode,
                scope_arg,
                lookback_ms,
            } => {
                self.collection(resource, mode, scope_arg, lookback_ms, args, now)
                    .await
            }
            OperationKind::Get {
                resource,
                id_arg,
                qualified,
            } => self.get(resource, id_arg, qualified, args).await,
            OperationKind::Rollup { mode } => self.rollup(mode, args, now).await,
            OperationKind::FindDeviceByName => self.find_device_by_name(args).await,
            OperationKind::SyntaxRules => Ok(OperationOutput::Text(syntax::RULES.to_string())),
            OperationKind::SyntaxHelp => Ok(OperationOutput::Text(syntax::HELP.to_string())),
            OperationKind::FieldList => {
                let resource = resource_arg(args)?;
                Ok(OperationOutput::Json(syntax::field_list(resource.schema())))
            }
            OperationKind::QueryExamples => {
                let query_type = args.text("query_type")?;
                Ok(OperationOutput::Json(syntax::examples(query_type.as_deref())?))
            }
            OperationKind::ValidateQuery => validate(args),
            OperationKind::ApiInfo => self.api_info(args),
        };

        match &result {
            Ok(_) => debug!(operation = name, "Operation complete"),
            Err(e) => debug!(operation = name, kind = e.kind(), error = %e, "Operation failed"),
        }
        result
    }

    /// Run a source call under the fetch timeout
    async fn bounded<T, E>(&self, call: impl Future<Output = Result<T, E>>) -> OperationResult<T>
    where
        E: Into<OperationError>,
    {
        match tokio::time::timeout(self.settings.fetch_timeout, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => {
                warn!(
                    source = self.source.name(),
                    timeout_ms = self.settings.fetch_timeout.as_millis() as u64,
                    "Record source call timed out"
                );
                Err(OperationError::Unavailable(format!(
                    "record source did not answer within {} ms",
                    self.settings.fetch_timeout.as_millis()
                )))
            }
        }
    }

    async fn collection(
        &self,
        resource: ResourceKind,
        mode: Mode,
        scope_arg: Option<&'static str>,
        lookback_ms: Option<i64>,
        args: &Arguments,
        now: i64,
    ) -> OperationResult<OperationOutput> {
        let schema = resource.schema();

        let filter = compile(schema, args.text("query")?.as_deref().unwrap_or(""))?;
        let mut predicate = Predicate::always();
        let mut request = FetchRequest::new(resource);

        if let (Some(arg), Some(scope_field)) = (scope_arg, resource.scope_field()) {
            let parent = args.required_text(arg)?;
            predicate = scope_predicate(resource, scope_field, arg, &parent)?;
            request = request.scoped(parent.trim());
        }

        predicate = predicate.and(filter.bind(now));

        if let (Some(lookback), Some(time_field)) = (lookback_ms, resource.time_field()) {
            predicate = predicate.and(time_window(time_field, args, now, lookback)?);
        }

        let order = order_for(resource, args)?;

        match mode {
            Mode::Page => {
                let size = args.integer("size")?;
                let cursor = args.text("cursor")?;
                // Cursor is checked before any source call
                if let Some(token) = cursor.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
                    Cursor::decode(token)?.verify(&predicate, &order)?;
                }
                if let Some(arg) = scope_arg {
                    self.verify_parent(resource, arg, args).await?;
                }

                let page = self
                    .bounded(self.engine.list(
                        self.source.as_ref(),
                        &request,
                        &predicate,
                        &order,
                        size,
                        cursor.as_deref(),
                    ))
                    .await?;
                Ok(OperationOutput::Page(page))
            }
            Mode::Bulk => {
                let formatter = ExportFormatter::new(schema, args.text("fields")?.as_deref())?;
                if let Some(arg) = scope_arg {
                    self.verify_parent(resource, arg, args).await?;
                }

                let records = self.bounded(self.source.fetch(&request)).await?;
                let rows = self
                    .engine
                    .scan(records, &predicate, &order, self.settings.bulk_row_cap);
                debug!(resource = %resource, rows = rows.len(), "Streaming export");
                Ok(OperationOutput::Export(ExportStream::spawn(
                    formatter,
                    rows,
                    self.settings.export_buffer_rows,
                )))
            }
        }
    }

    async fn get(
        &self,
        resource: ResourceKind,
        id_arg: &str,
        qualified: bool,
        args: &Arguments,
    ) -> OperationResult<OperationOutput> {
        let raw = args.required_text(id_arg)?;

        let (request, raw_id) = if qualified {
            let (parent, id) = raw
                .split_once('/')
                .filter(|(parent, id)| !parent.is_empty() && !id.is_empty())
                .ok_or_else(|| OperationError::invalid_argument(id_arg, "expected '<parent>/<name>'"))?;
            (FetchRequest::new(resource).scoped(parent), id.to_string())
        } else {
            (FetchRequest::new(resource), raw)
        };

        let id = coerce_id(resource, id_arg, &raw_id)?;
        let record = self.bounded(self.source.get(&request, &id)).await?;
        Ok(OperationOutput::Record(record))
    }

    async fn rollup(&self, mode: Mode, args: &Arguments, now: i64) -> OperationResult<OperationOutput> {
        let resource = ResourceKind::StreamRollups;
        let schema = resource.schema();
        let stream_id = args.required_text("stream_id")?;

        let interval: RollupInterval = args.text("interval")?.as_deref().unwrap_or("1h").parse()?;
        let method: RollupMethod = args.text("method")?.as_deref().unwrap_or("avg").parse()?;

        let start = args.text("start_time")?;
        let end = args.text("end_time")?;
        let range = resolve(
            now,
            start.as_deref(),
            end.as_deref(),
            catalog::ROLLUP_LOOKBACK_MS,
        )?;

        let filter = compile(schema, args.text("query")?.as_deref().unwrap_or(""))?;
        let predicate = Predicate::label(format!(
            "stream_id={} interval={} method={} window={}..{}",
            stream_id,
            interval,
            method,
            start.as_deref().unwrap_or(""),
            end.as_deref().unwrap_or("now")
        ))
        .and(filter.bind(now));
        let order = order_for(resource, args)?;

        let (formatter, cursor) = match mode {
            Mode::Bulk => (Some(ExportFormatter::new(schema, args.text("fields")?.as_deref())?), None),
            Mode::Page => {
                let cursor = match args.text("cursor")?.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
                    Some(token) => {
                        let cursor = Cursor::decode(token)?;
                        cursor.verify(&predicate, &order)?;
                        Some(cursor)
                    }
                    None => None,
                };
                (None, cursor)
            }
        };

        let history_kind = ResourceKind::StreamHistory;
        let in_stream = scope_predicate(history_kind, "stream_id", "stream_id", &stream_id)?;

        self.verify_parent(resource, "stream_id", args).await?;
        let history = self
            .bounded(
                self.source
                    .fetch(&FetchRequest::new(history_kind).scoped(stream_id.trim())),
            )
            .await?;

        let samples: Vec<Sample> = history
            .iter()
            .filter(|r| in_stream.matches(r))
            .filter_map(|r| Sample::from_record(r, "timestamp", "value"))
            .collect();
        let buckets: Vec<Record> = rollup(&samples, &range, &interval, method)?
            .iter()
            .map(RollupBucket::to_record)
            .collect();
        debug!(
            stream_id = %stream_id,
            samples = samples.len(),
            buckets = buckets.len(),
            %interval,
            %method,
            "Rolled up stream history"
        );

        match formatter {
            Some(formatter) => {
                let rows = self
                    .engine
                    .scan(buckets, &predicate, &order, self.settings.bulk_row_cap);
                Ok(OperationOutput::Export(ExportStream::spawn(
                    formatter,
                    rows,
                    self.settings.export_buffer_rows,
                )))
            }
            None => {
                let size = self.engine.clamp_size(args.integer("size")?);
                let page = self
                    .engine
                    .page(buckets, &predicate, &order, schema.id_field(), size, cursor.as_ref())?;
                Ok(OperationOutput::Page(page))
            }
        }
    }

    async fn find_device_by_name(&self, args: &Arguments) -> OperationResult<OperationOutput> {
        let search = args.required_text("device_search")?;
        let needle = search.trim().to_lowercase();
        let size = self.engine.clamp_size(args.integer("size")?);
        let order = OrderSpec::by(ResourceKind::Devices.schema(), "name", Direction::Asc)?;
        let predicate = Predicate::label(format!("name contains '{}'", needle));
        let cursor = match args.text("cursor")?.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(token) => {
                let cursor = Cursor::decode(token)?;
                cursor.verify(&predicate, &order)?;
                Some(cursor)
            }
            None => None,
        };

        let devices = self
            .bounded(self.source.fetch(&FetchRequest::new(ResourceKind::Devices)))
            .await?;
        let matches: Vec<Record> = devices
            .iter()
            .filter(|r| {
                r.value("name")
                    .as_str()
                    .map(|name| name.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .map(|r| r.project(&["id", "name"]))
            .collect();

        let page = self
            .engine
            .page(matches, &predicate, &order, "id", size, cursor.as_ref())?;
        Ok(OperationOutput::Page(page))
    }

    /// Check a scoped operation's parent identifier and existence
    async fn verify_parent(&self, resource: ResourceKind, arg: &str, args: &Arguments) -> OperationResult<()> {
        let Some(parent) = resource.parent() else {
            return Ok(());
        };
        let raw = args.required_text(arg)?;
        let id = coerce_id(parent, arg, &raw)?;
        self.bounded(self.source.get(&FetchRequest::new(parent), &id)).await?;
        Ok(())
    }

    fn api_info(&self, args: &Arguments) -> OperationResult<OperationOutput> {
        if let Some(endpoint) = args.text("endpoint")?.filter(|e| !e.trim().is_empty()) {
            let spec = lookup(endpoint.trim()).ok_or(OperationError::UnknownOperation(endpoint))?;
            return Ok(OperationOutput::Json(describe(spec)));
        }

        let families: std::collections::BTreeMap<&str, Vec<&str>> =
            operations().iter().fold(Default::default(), |mut acc, spec| {
                acc.entry(spec.family).or_default().push(spec.name);
                acc
            });

        Ok(OperationOutput::Json(json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "source": self.source.name(),
            "max_page_size": self.engine.max_page_size(),
            "bulk_row_cap": self.settings.bulk_row_cap,
            "operation_count": operations().len(),
            "operations": families,
        })))
    }
}

/// Catalog entry for one operation
pub fn describe(spec: &OperationSpec) -> serde_json::Value {
    json!({
        "name": spec.name,
        "family": spec.family,
        "summary": spec.summary,
        "resource": spec.resource(),
        "output": if spec.is_bulk() { "csv" } else { "json" },
        "parameters": spec.parameters(),
    })
}

fn resource_arg(args: &Arguments) -> OperationResult<ResourceKind> {
    match args.text("resource")? {
        Some(name) if !name.trim().is_empty() => name
            .parse()
            .map_err(|e: String| OperationError::invalid_argument("resource", e)),
        _ => Ok(ResourceKind::Devices),
    }
}

fn validate(args: &Arguments) -> OperationResult<OperationOutput> {
    let resource = resource_arg(args)?;
    let query = args.text("query")?.unwrap_or_default();
    let filter = compile(resource.schema(), &query)?;

    let text = if filter.is_always_true() {
        format!("Query is valid: empty query matches every {} record", resource)
    } else {
        format!(
            "Query is valid for {} ({} clause{}): {}",
            resource,
            filter.len(),
            if filter.len() == 1 { "" } else { "s" },
            filter.canonical()
        )
    };
    Ok(OperationOutput::Text(text))
}

/// Order from `orderby`, or from `order` on the time field
fn order_for(resource: ResourceKind, args: &Arguments) -> OperationResult<OrderSpec> {
    let schema = resource.schema();
    let orderby = args.text("orderby")?.filter(|o| !o.trim().is_empty());

    if orderby.is_none() {
        if let (Some(order), Some(time_field)) = (args.text("order")?, resource.time_field()) {
            let direction = match order.trim().to_lowercase().as_str() {
                "asc" => Direction::Asc,
                "desc" => Direction::Desc,
                _ => return Err(OperationError::invalid_argument("order", "expected 'asc' or 'desc'")),
            };
            return Ok(OrderSpec::by(schema, time_field, direction)?);
        }
    }

    Ok(OrderSpec::compile(schema, orderby.as_deref())?)
}

fn time_window(time_field: &str, args: &Arguments, now: i64, lookback_ms: i64) -> OperationResult<Predicate> {
    let start = args.text("start_time")?;
    let end = args.text("end_time")?;
    let range = resolve(now, start.as_deref(), end.as_deref(), lookback_ms)?;

    let label = format!(
        "[{}, {})",
        start.as_deref().map(str::trim).filter(|s| !s.is_empty()).unwrap_or("default"),
        end.as_deref().map(str::trim).filter(|s| !s.is_empty()).unwrap_or("now")
    );
    Ok(Predicate::time_window(time_field, range, &label))
}

/// Predicate tying a scoped record to its parent
///
/// Applied on top of the fetch scope; the value takes the child field's kind.
fn scope_predicate(resource: ResourceKind, scope_field: &str, arg: &str, parent: &str) -> OperationResult<Predicate> {
    let parent = parent.trim();
    let kind = resource
        .schema()
        .field(scope_field)
        .map(|def| def.kind)
        .unwrap_or(FieldKind::String);

    let value = match kind {
        FieldKind::Number => parent
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Value::Number)
            .ok_or_else(|| OperationError::invalid_argument(arg, format!("'{}' is not a numeric identifier", parent)))?,
        _ => Value::String(parent.to_string()),
    };
    Ok(Predicate::field_equals(scope_field, value))
}

/// Coerce an identifier argument to the id field's kind
fn coerce_id(resource: ResourceKind, arg: &str, raw: &str) -> OperationResult<Value> {
    let schema = resource.schema();
    let raw = raw.trim();
    match schema.id_kind() {
        FieldKind::Number => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Value::Number)
            .ok_or_else(|| {
                OperationError::invalid_argument(arg, format!("'{}' is not a numeric {} identifier", raw, resource))
            }),
        _ if !schema.id_matches_pattern(raw) => Err(OperationError::invalid_argument(
            arg,
            format!("'{}' is not a valid {} identifier", raw, resource),
        )),
        _ => Ok(Value::String(raw.to_string())),
    }
}
