//! Ordering Resolver
//!
//! Compiles `orderby` clauses like `name asc, signal_percent desc` into a
//! total order over records. The schema's identifier field is appended as
//! an ascending tie-break so paging stays deterministic when sort keys
//! repeat.

use nom::{
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{opt, recognize},
    multi::separated_list1,
    sequence::{delimited, pair, preceded},
    IResult,
};
use std::cmp::Ordering;

use crate::model::{Direction, FieldSchema, Record, Value};
use crate::query::error::{FilterError, FilterResult};

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

/// Compiled order over records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    keys: Vec<SortKey>,
}

impl OrderSpec {
    /// Compile an order-by expression
    ///
    /// Absent or blank input yields the schema default order.
    pub fn compile(schema: &FieldSchema, expr: Option<&str>) -> FilterResult<Self> {
        let expr = expr.map(str::trim).unwrap_or("");

        if expr.is_empty() {
            let keys = schema
                .default_order()
                .iter()
                .map(|(field, direction)| SortKey {
                    field: field.clone(),
                    direction: *direction,
                })
                .collect();
            return Ok(Self::with_tie_break(schema, keys));
        }

        let terms = match parse_order_list(expr) {
            Ok((rest, terms)) if rest.trim().is_empty() => terms,
            Ok((rest, _)) => {
                return Err(FilterError::syntax(
                    expr.len() - rest.len(),
                    format!("unexpected input in orderby: '{}'", rest.trim()),
                ))
            }
            Err(_) => {
                return Err(FilterError::syntax(
                    0,
                    "expected orderby of the form 'field [asc|desc], ...'",
                ))
            }
        };

        let mut keys = Vec::with_capacity(terms.len());
        for (field, direction) in terms {
            let direction = match direction.map(|d| d.to_ascii_lowercase()) {
                None => Direction::Asc,
                Some(d) if d == "asc" => Direction::Asc,
                Some(d) if d == "desc" => Direction::Desc,
                Some(d) => {
                    return Err(FilterError::syntax(
                        0,
                        format!("unknown sort direction '{}'; use asc or desc", d),
                    ))
                }
            };
            keys.push(Self::sort_key(schema, field, direction)?);
        }

        Ok(Self::with_tie_break(schema, keys))
    }

    /// Order by a single field
    pub fn by(schema: &FieldSchema, field: &str, direction: Direction) -> FilterResult<Self> {
        let key = Self::sort_key(schema, field, direction)?;
        Ok(Self::with_tie_break(schema, vec![key]))
    }

    fn sort_key(schema: &FieldSchema, field: &str, direction: Direction) -> FilterResult<SortKey> {
        let def = schema.field(field).ok_or_else(|| FilterError::UnknownField {
            field: field.to_string(),
            resource: schema.resource().to_string(),
        })?;

        if !def.sortable {
            return Err(FilterError::NotSortable {
                field: field.to_string(),
            });
        }

        Ok(SortKey {
            field: def.name.clone(),
            direction,
        })
    }

    fn with_tie_break(schema: &FieldSchema, mut keys: Vec<SortKey>) -> Self {
        let id = schema.id_field();
        if !keys.iter().any(|k| k.field == id) {
            keys.push(SortKey {
                field: id.to_string(),
                direction: Direction::Asc,
            });
        }
        Self { keys }
    }

    /// Sort keys including the identifier tie-break
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Extract the sort-key tuple of a record
    pub fn key_of(&self, record: &Record) -> Vec<Value> {
        self.keys
            .iter()
            .map(|k| record.value(&k.field).clone())
            .collect()
    }

    /// Compare two records
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for key in &self.keys {
            let ord = directed(key.direction, a.value(&key.field).total_cmp(b.value(&key.field)));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Compare a record with a previously extracted key tuple
    pub fn compare_to_key(&self, record: &Record, key: &[Value]) -> Ordering {
        for (sort_key, other) in self.keys.iter().zip(key) {
            let ord = directed(sort_key.direction, record.value(&sort_key.field).total_cmp(other));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Canonical text, e.g. `name asc,id asc`
    pub fn canonical(&self) -> String {
        self.keys
            .iter()
            .map(|k| format!("{} {}", k.field, k.direction))
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn directed(direction: Direction, ord: Ordering) -> Ordering {
    match direction {
        Direction::Asc => ord,
        Direction::Desc => ord.reverse(),
    }
}

/// Parse `field [dir] (, field [dir])*`
fn parse_order_list(input: &str) -> IResult<&str, Vec<(&str, Option<&str>)>> {
    separated_list1(
        delimited(multispace0, char(','), multispace0),
        pair(parse_field, opt(preceded(multispace1, parse_direction_word))),
    )(input)
}

fn parse_field(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '.'),
    ))(input)
}

fn parse_direction_word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphabetic())(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldDef;

    fn schema() -> FieldSchema {
        FieldSchema::builder("devices", "id")
            .field(FieldDef::string("id").sortable())
            .field(FieldDef::string("name").sortable())
            .field(FieldDef::number("signal_percent").sortable())
            .field(FieldDef::string("mac"))
            .build()
    }

    fn device(id: &str, name: &str, signal: f64) -> Record {
        Record::new()
            .with("id", id)
            .with("name", name)
            .with("signal_percent", signal)
    }

    fn sorted_ids(spec: &OrderSpec, mut records: Vec<Record>) -> Vec<String> {
        records.sort_by(|a, b| spec.compare(a, b));
        records.iter().map(|r| r.value("id").to_text()).collect()
    }

    #[test]
    fn test_default_order_is_id() {
        let spec = OrderSpec::compile(&schema(), None).unwrap();
        assert_eq!(spec.canonical(), "id asc");

        let spec = OrderSpec::compile(&schema(), Some("  ")).unwrap();
        assert_eq!(spec.canonical(), "id asc");
    }

    #[test]
    fn test_multi_key_with_directions() {
        let spec = OrderSpec::compile(&schema(), Some("signal_percent DESC, name")).unwrap();
        assert_eq!(spec.canonical(), "signal_percent desc,name asc,id asc");

        let ids = sorted_ids(
            &spec,
            vec![
                device("c", "b", 10.0),
                device("a", "a", 10.0),
                device("b", "z", 90.0),
            ],
        );
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_identifier_tie_break() {
        let spec = OrderSpec::compile(&schema(), Some("name desc")).unwrap();
        let ids = sorted_ids(
            &spec,
            vec![device("3", "x", 0.0), device("1", "x", 0.0), device("2", "x", 0.0)],
        );
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_explicit_id_key_not_duplicated() {
        let spec = OrderSpec::compile(&schema(), Some("id desc")).unwrap();
        assert_eq!(spec.keys().len(), 1);
        assert_eq!(spec.canonical(), "id desc");
    }

    #[test]
    fn test_rejects_unknown_and_unsortable() {
        assert!(matches!(
            OrderSpec::compile(&schema(), Some("colour asc")),
            Err(FilterError::UnknownField { .. })
        ));
        assert!(matches!(
            OrderSpec::compile(&schema(), Some("mac asc")),
            Err(FilterError::NotSortable { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_direction_and_syntax() {
        assert!(OrderSpec::compile(&schema(), Some("name sideways")).is_err());
        assert!(OrderSpec::compile(&schema(), Some("name asc,")).is_err());
        assert!(OrderSpec::compile(&schema(), Some("'name'")).is_err());
    }

    #[test]
    fn test_nulls_sort_first_ascending() {
        let spec = OrderSpec::compile(&schema(), Some("signal_percent")).unwrap();
        let ids = sorted_ids(
            &spec,
            vec![device("a", "a", 5.0), Record::new().with("id", "b")],
        );
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_compare_to_key() {
        let spec = OrderSpec::compile(&schema(), Some("signal_percent desc")).unwrap();
        let last = device("m", "m", 50.0);
        let key = spec.key_of(&last);

        assert_eq!(spec.compare_to_key(&device("n", "n", 40.0), &key), Ordering::Greater);
        assert_eq!(spec.compare_to_key(&device("a", "a", 50.0), &key), Ordering::Less);
        assert_eq!(spec.compare_to_key(&device("z", "z", 50.0), &key), Ordering::Greater);
        assert_eq!(spec.compare_to_key(&last, &key), Ordering::Equal);
    }
}
