//! Filter language reference texts and examples

use serde::Serialize;
use serde_json::json;

use crate::model::{FieldDef, FieldKind, FieldSchema};
use crate::ops::error::{OperationError, OperationResult};

pub(crate) const RULES: &str = "\
Query syntax rules

Structure:
  query   := clause (and clause)*
  clause  := FIELD OPERATOR VALUE

Operators:
  =           equal
  <           less than (numbers, timestamps)
  >           greater than (numbers, timestamps)
  contains    text contains the value
  startswith  text starts with the value

Values:
  'text'      strings use single quotes; double quotes are rejected
  42, 3.5     numbers are written bare
  true/false  booleans are written bare
  -1d         relative times (m, h, d, w) for timestamp fields
  '2024-01-15T00:00:00Z'  absolute times use single quotes

Not supported: or, not, parentheses, !=, >=, <=, ==.
Keywords are case-insensitive; field names and values are not.
An empty query matches every record.

Examples:
  connection_status='connected'
  connection_status='connected' and signal_percent>50
  type contains 'EX50'
  last_connect>-1d
";

pub(crate) const HELP: &str = "\
Quick reference
- Always wrap text values in single quotes: name='gateway-1'
- Combine clauses with and: type='EX50' and signal_percent<30
- Operators: = < > contains startswith
- Relative times: last_connect>-7d
- Use get_device_fields for field names and get_query_examples for more examples.
";

/// One example query
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueryExample {
    pub description: &'static str,
    pub query: &'static str,
}

const fn example(description: &'static str, query: &'static str) -> QueryExample {
    QueryExample { description, query }
}

/// Example categories
pub(crate) static EXAMPLES: &[(&str, &[QueryExample])] = &[
    (
        "general_filtering",
        &[
            example("Devices of one type", "type='EX50'"),
            example("Names containing a fragment", "name contains 'gateway'"),
            example("Devices in a group subtree", "group startswith '/Sites'"),
            example("Combined conditions", "type contains 'EX' and maintenance_mode=false"),
        ],
    ),
    (
        "filter_by_status",
        &[
            example("Connected devices", "connection_status='connected'"),
            example("Disconnected devices", "connection_status='disconnected'"),
            example("Devices reporting errors", "health_status='error'"),
            example(
                "Connected devices in a warning state",
                "connection_status='connected' and health_status='warning'",
            ),
        ],
    ),
    (
        "filter_by_signal",
        &[
            example("Weak signal", "signal_percent<30"),
            example("Strong signal", "signal_percent>80"),
            example("Connected with good signal", "connection_status='connected' and signal_percent>50"),
        ],
    ),
    (
        "filter_by_time",
        &[
            example("Connected in the last day", "last_connect>-1d"),
            example("Not connected for a week", "last_connect<-7d"),
            example("Connected since a date", "last_connect>'2024-01-01T00:00:00Z'"),
        ],
    ),
];

/// Examples for one category, or all of them
pub fn examples(query_type: Option<&str>) -> OperationResult<serde_json::Value> {
    match query_type.map(str::trim).filter(|t| !t.is_empty()) {
        None => {
            let all: serde_json::Map<_, _> = EXAMPLES
                .iter()
                .map(|(name, list)| (name.to_string(), json!(list)))
                .collect();
            Ok(json!({ "examples": all }))
        }
        Some(name) => EXAMPLES
            .iter()
            .find(|(category, _)| *category == name)
            .map(|(category, list)| json!({ "query_type": category, "examples": list }))
            .ok_or_else(|| {
                let known: Vec<_> = EXAMPLES.iter().map(|(c, _)| *c).collect();
                OperationError::invalid_argument(
                    "query_type",
                    format!("unknown query type '{}'; expected one of: {}", name, known.join(", ")),
                )
            }),
    }
}

fn operators(def: &FieldDef) -> Vec<&'static str> {
    let caps = def.capabilities;
    let mut ops = Vec::new();
    if caps.eq {
        ops.push("=");
    }
    if caps.compare {
        ops.extend(["<", ">"]);
    }
    if caps.contains {
        ops.push("contains");
    }
    if caps.startswith {
        ops.push("startswith");
    }
    if def.kind == FieldKind::Timestamp && caps.compare {
        ops.push("relative (-1d)");
    }
    ops
}

/// Field reference for a schema
pub fn field_list(schema: &FieldSchema) -> serde_json::Value {
    let fields: Vec<_> = schema
        .fields()
        .iter()
        .map(|def| {
            let mut entry = json!({
                "name": def.name,
                "type": def.kind.to_string(),
                "operators": operators(def),
                "sortable": def.sortable,
            });
            if def.case_insensitive {
                entry["case_insensitive"] = json!(true);
            }
            if let Some(variants) = &def.variants {
                entry["values"] = json!(variants);
            }
            if let Some(description) = &def.description {
                entry["description"] = json!(description);
            }
            entry
        })
        .collect();

    json!({
        "resource": schema.resource(),
        "id_field": schema.id_field(),
        "fields": fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::compile;
    use crate::resources::ResourceKind;

    #[test]
    fn test_every_example_compiles() {
        let schema = ResourceKind::Devices.schema();
        for (category, list) in EXAMPLES {
            for ex in *list {
                assert!(compile(schema, ex.query).is_ok(), "{}: {}", category, ex.query);
            }
        }
        for line in RULES.lines().skip_while(|l| !l.starts_with("Examples:")).skip(1) {
            assert!(compile(schema, line.trim()).is_ok(), "{}", line);
        }
    }

    #[test]
    fn test_texts_mention_quoting() {
        assert!(HELP.contains("single quotes"));
        assert!(RULES.contains("Operators"));
    }

    #[test]
    fn test_examples_by_type() {
        let value = examples(Some("filter_by_signal")).unwrap();
        assert_eq!(value["query_type"], "filter_by_signal");
        assert!(value["examples"].as_array().unwrap().len() >= 2);

        let all = examples(None).unwrap();
        assert_eq!(all["examples"].as_object().unwrap().len(), EXAMPLES.len());

        assert_eq!(examples(Some("invalid_type")).unwrap_err().kind(), "invalid_argument");
    }

    #[test]
    fn test_device_field_list() {
        let value = field_list(ResourceKind::Devices.schema());
        let names: Vec<_> = value["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap().to_string())
            .collect();
        for expected in ["id", "name", "type", "connection_status"] {
            assert!(names.iter().any(|n| n == expected), "{}", expected);
        }
        let status = &value["fields"][3];
        assert_eq!(status["values"][0], "connected");
    }
}
