//! Core value and record types
//!
//! - `Value`: a typed scalar with a total order for sorting
//! - `Record`: an immutable mapping from field name to `Value`

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::schema::{FieldKind, FieldSchema};

/// A typed scalar value
///
/// Timestamps are Unix milliseconds (UTC). Enum-kinded fields carry their
/// variant as a `String`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Field absent or explicitly null
    Null,
    /// Boolean
    Bool(bool),
    /// Any numeric value
    Number(f64),
    /// Text, including enum variants
    String(String),
    /// Unix timestamp in milliseconds
    Timestamp(i64),
}

impl Value {
    /// Rank used to order values of different kinds
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::Timestamp(_) => 3,
            Value::String(_) => 4,
        }
    }

    /// Total order across all values
    ///
    /// Null sorts first, then booleans, numbers, timestamps and strings.
    /// Numbers use IEEE total ordering so NaN never breaks a sort.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Get as a number, if numeric
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as a string slice, if textual
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render as delimited-text cell content
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Timestamp(ms) => format_timestamp(*ms),
        }
    }

    /// Convert to a JSON value (timestamps as RFC 3339 strings)
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(ms) => serde_json::Value::String(format_timestamp(*ms)),
        }
    }

    /// Infer a value from JSON without a schema
    pub fn infer(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        }
    }

    /// Coerce a JSON value to the given field kind
    ///
    /// Values that cannot be coerced keep their inferred kind; the record
    /// provider owns data quality, the engine only compares what it gets.
    pub fn coerce(json: &serde_json::Value, kind: FieldKind) -> Value {
        match (kind, json) {
            (_, serde_json::Value::Null) => Value::Null,
            (FieldKind::Number, serde_json::Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::Number)
                .unwrap_or_else(|_| Value::String(s.clone())),
            (FieldKind::Timestamp, serde_json::Value::String(s)) => parse_timestamp(s)
                .map(Value::Timestamp)
                .unwrap_or_else(|| Value::String(s.clone())),
            (FieldKind::Timestamp, serde_json::Value::Number(n)) => n
                .as_i64()
                .map(Value::Timestamp)
                .unwrap_or_else(|| Value::infer(json)),
            (FieldKind::Boolean, serde_json::Value::String(s)) => match s.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(s.clone()),
            },
            (FieldKind::String | FieldKind::Enum, serde_json::Value::Number(n)) => {
                Value::String(n.to_string())
            }
            (FieldKind::String | FieldKind::Enum, serde_json::Value::Bool(b)) => {
                Value::String(b.to_string())
            }
            _ => Value::infer(json),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Format a number without a trailing `.0` for integral values
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Format a millisecond timestamp as RFC 3339 (UTC, millisecond precision)
pub fn format_timestamp(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms) {
        chrono::LocalResult::Single(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        _ => ms.to_string(),
    }
}

/// Parse an absolute timestamp
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` (UTC), `YYYY-MM-DD` (UTC
/// midnight) and Unix milliseconds.
pub fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc().timestamp_millis());
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis());
    }

    if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse::<i64>().ok();
    }

    None
}

/// One resource instance
///
/// Immutable once built. Fields not present read as `Value::Null`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set a field
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Builder method: set a timestamp field
    pub fn with_timestamp(mut self, name: impl Into<String>, ms: i64) -> Self {
        self.fields.insert(name.into(), Value::Timestamp(ms));
        self
    }

    /// Build a record from a JSON object, typed by the schema
    ///
    /// Returns `None` if the JSON is not an object.
    pub fn from_json(schema: &FieldSchema, json: &serde_json::Value) -> Option<Self> {
        let object = json.as_object()?;

        let fields = object
            .iter()
            .map(|(name, raw)| {
                let value = match schema.field(name) {
                    Some(def) => Value::coerce(raw, def.kind),
                    None => Value::infer(raw),
                };
                (name.clone(), value)
            })
            .collect();

        Some(Self { fields })
    }

    /// Get a field value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a field value, reading absent fields as null
    pub fn value(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.fields.get(name).unwrap_or(&NULL)
    }

    /// Iterate over all fields
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A copy holding only the named fields
    pub fn project(&self, names: &[&str]) -> Record {
        let fields = names
            .iter()
            .filter_map(|name| self.fields.get(*name).map(|v| (name.to_string(), v.clone())))
            .collect();
        Record { fields }
    }

    /// Convert to a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, &value.to_json())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldDef;
    use serde_json::json;

    #[test]
    fn test_total_order_across_kinds() {
        let mut values = vec![
            Value::from("b"),
            Value::Number(2.0),
            Value::Null,
            Value::Timestamp(5),
            Value::Bool(true),
            Value::Number(-1.0),
            Value::from("a"),
        ];
        values.sort_by(|a, b| a.total_cmp(b));

        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Number(-1.0),
                Value::Number(2.0),
                Value::Timestamp(5),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        // 2024-01-15 14:35:42.123 UTC
        assert_eq!(
            parse_timestamp("2024-01-15T14:35:42.123Z"),
            Some(1705329342123)
        );
        assert_eq!(
            parse_timestamp("2024-01-15T14:35:42"),
            Some(1705329342000)
        );
        assert_eq!(parse_timestamp("2024-01-15"), Some(1705276800000));
        assert_eq!(parse_timestamp("1705329342123"), Some(1705329342123));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1705329342123), "2024-01-15T14:35:42.123Z");
    }

    #[test]
    fn test_record_from_json_coerces_schema_fields() {
        let schema = FieldSchema::builder("devices", "id")
            .field(FieldDef::string("id"))
            .field(FieldDef::number("signal_percent"))
            .field(FieldDef::timestamp("last_connect"))
            .build();

        let record = Record::from_json(
            &schema,
            &json!({
                "id": "00000000-00000000-00409DFF-FF000001",
                "signal_percent": "72",
                "last_connect": "2024-01-15T14:35:42.123Z",
                "mac": "00:40:9D:00:00:01"
            }),
        )
        .unwrap();

        assert_eq!(record.value("signal_percent"), &Value::Number(72.0));
        assert_eq!(record.value("last_connect"), &Value::Timestamp(1705329342123));
        assert_eq!(record.value("mac"), &Value::from("00:40:9D:00:00:01"));
        assert_eq!(record.value("missing"), &Value::Null);
    }

    #[test]
    fn test_uncoercible_values_keep_raw_kind() {
        let schema = FieldSchema::builder("samples", "id")
            .field(FieldDef::number("value"))
            .build();

        let record = Record::from_json(&schema, &json!({"id": "1", "value": "n/a"})).unwrap();
        assert_eq!(record.value("value"), &Value::from("n/a"));
    }

    #[test]
    fn test_record_serializes_timestamps_as_rfc3339() {
        let record = Record::new()
            .with("id", "a")
            .with("count", 3i64)
            .with_timestamp("ts", 1705329342123);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "a");
        assert_eq!(json["count"], 3);
        assert_eq!(json["ts"], "2024-01-15T14:35:42.123Z");
    }

    #[test]
    fn test_project_keeps_requested_fields() {
        let record = Record::new().with("id", "a").with("name", "n").with("x", 1i64);
        let projected = record.project(&["id", "name"]);
        assert_eq!(projected.len(), 2);
        assert!(projected.get("x").is_none());
    }
}
