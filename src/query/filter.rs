//! Filter compilation and evaluation
//!
//! `compile` type-checks a parsed expression against a `FieldSchema`.
//! The resulting `Filter` still holds relative time literals in their
//! relative form; `Filter::bind` resolves them against an injected `now`
//! and returns a `Predicate` that can be evaluated against records.

use std::cmp::Ordering;

use crate::model::{FieldDef, FieldKind, FieldSchema, Record, Value};
use crate::query::ast::{Comparison, Literal, Operator};
use crate::query::error::{FilterError, FilterResult};
use crate::query::parser::parse_filter;
use crate::time::TimeRange;

/// Tolerance for numeric equality
const NUMBER_EPSILON: f64 = 1e-9;

/// A schema-checked clause
#[derive(Debug, Clone, PartialEq)]
struct CheckedClause {
    field: String,
    op: Operator,
    literal: Literal,
    fold_case: bool,
}

/// A compiled, schema-checked filter
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    clauses: Vec<CheckedClause>,
    canonical: String,
}

/// Compile a query string against a schema
pub fn compile(schema: &FieldSchema, query: &str) -> FilterResult<Filter> {
    let expr = parse_filter(query)?;

    let clauses = expr
        .comparisons()
        .into_iter()
        .map(|comparison| check(schema, comparison))
        .collect::<FilterResult<Vec<_>>>()?;

    let canonical = clauses
        .iter()
        .map(|c| canonical_clause(&c.field, c.op, &c.literal))
        .collect::<Vec<_>>()
        .join(" and ");

    Ok(Filter { clauses, canonical })
}

/// Compile and bind in one step
pub fn compile_at(schema: &FieldSchema, query: &str, now: i64) -> FilterResult<Predicate> {
    compile(schema, query).map(|filter| filter.bind(now))
}

fn check(schema: &FieldSchema, comparison: &Comparison) -> FilterResult<CheckedClause> {
    let def = schema
        .field(&comparison.field)
        .ok_or_else(|| FilterError::UnknownField {
            field: comparison.field.clone(),
            resource: schema.resource().to_string(),
        })?;

    let caps = def.capabilities;
    let allowed = match comparison.op {
        Operator::Eq => caps.eq,
        Operator::Lt | Operator::Gt => caps.compare,
        Operator::Contains => caps.contains,
        Operator::StartsWith => caps.startswith,
    };
    if !allowed {
        return Err(FilterError::OperatorNotAllowed {
            field: def.name.clone(),
            operator: comparison.op.to_string(),
        });
    }

    let literal = check_literal(def, comparison.op, &comparison.literal)?;
    let fold_case = def.case_insensitive && comparison.op.is_text_match();
    let literal = match literal {
        Literal::String(s) if fold_case => Literal::String(s.to_lowercase()),
        other => other,
    };

    Ok(CheckedClause {
        field: def.name.clone(),
        op: comparison.op,
        literal,
        fold_case,
    })
}

fn check_literal(def: &FieldDef, op: Operator, literal: &Literal) -> FilterResult<Literal> {
    if op.is_text_match() {
        return match literal {
            Literal::String(_) => Ok(literal.clone()),
            _ => Err(FilterError::invalid_literal(
                &def.name,
                format!("'{}' requires a quoted text value", op),
            )),
        };
    }

    match (def.kind, literal) {
        (FieldKind::String, Literal::String(_)) => Ok(literal.clone()),
        (FieldKind::Enum, Literal::String(s)) => match &def.variants {
            Some(variants) if !variants.iter().any(|v| v == s) => Err(FilterError::invalid_literal(
                &def.name,
                format!("'{}' is not one of: {}", s, variants.join(", ")),
            )),
            _ => Ok(literal.clone()),
        },
        (FieldKind::Number, Literal::Number(_)) => Ok(literal.clone()),
        (FieldKind::Boolean, Literal::Bool(_)) => Ok(literal.clone()),
        (FieldKind::Timestamp, Literal::Relative { .. }) => Ok(literal.clone()),
        (FieldKind::Timestamp, Literal::String(s)) => crate::model::parse_timestamp(s)
            .map(Literal::Timestamp)
            .ok_or_else(|| {
                FilterError::invalid_literal(&def.name, format!("'{}' is not a valid timestamp", s))
            }),
        (FieldKind::Timestamp, Literal::Number(n)) if n.fract() == 0.0 => {
            Ok(Literal::Timestamp(*n as i64))
        }
        (kind, _) => Err(FilterError::invalid_literal(
            &def.name,
            format!("expected a {} value, got {}", kind, literal),
        )),
    }
}

fn canonical_clause(field: &str, op: Operator, literal: &Literal) -> String {
    match op {
        Operator::Contains | Operator::StartsWith => format!("{} {} {}", field, op, literal),
        _ => format!("{}{}{}", field, op, literal),
    }
}

impl Filter {
    /// Canonical text of the filter
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Check if the filter matches everything
    pub fn is_always_true(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Number of clauses
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Check if there are no clauses
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Resolve relative literals against `now`
    pub fn bind(&self, now: i64) -> Predicate {
        let conditions = self
            .clauses
            .iter()
            .map(|clause| {
                let value = match &clause.literal {
                    Literal::String(s) => Value::String(s.clone()),
                    Literal::Number(n) => Value::Number(*n),
                    Literal::Bool(b) => Value::Bool(*b),
                    Literal::Timestamp(ms) => Value::Timestamp(*ms),
                    Literal::Relative { offset_ms, .. } => {
                        Value::Timestamp(now.saturating_add(*offset_ms))
                    }
                };
                Condition::Compare {
                    field: clause.field.clone(),
                    op: clause.op,
                    value,
                    fold_case: clause.fold_case,
                }
            })
            .collect();

        Predicate {
            conditions,
            canonical: self.canonical.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Compare {
        field: String,
        op: Operator,
        value: Value,
        fold_case: bool,
    },
    Window {
        field: String,
        range: TimeRange,
    },
}

impl Condition {
    fn matches(&self, record: &Record) -> bool {
        match self {
            Condition::Compare {
                field,
                op,
                value,
                fold_case,
            } => {
                let actual = record.value(field);
                match op {
                    Operator::Eq => compare(actual, value) == Some(Ordering::Equal),
                    Operator::Lt => compare(actual, value) == Some(Ordering::Less),
                    Operator::Gt => compare(actual, value) == Some(Ordering::Greater),
                    Operator::Contains => text_match(actual, value, *fold_case, |a, b| a.contains(b)),
                    Operator::StartsWith => {
                        text_match(actual, value, *fold_case, |a, b| a.starts_with(b))
                    }
                }
            }
            Condition::Window { field, range } => match record.value(field) {
                Value::Timestamp(ts) => range.contains(*ts),
                _ => false,
            },
        }
    }
}

/// Compare a record value with a literal of the same kind
///
/// Values of different kinds, and nulls, are incomparable.
fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => {
            if (a - b).abs() <= NUMBER_EPSILON {
                Some(Ordering::Equal)
            } else {
                a.partial_cmp(b)
            }
        }
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn text_match(actual: &Value, expected: &Value, fold_case: bool, f: impl Fn(&str, &str) -> bool) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) if fold_case => f(&a.to_lowercase(), b),
        (Value::String(a), Value::String(b)) => f(a, b),
        _ => false,
    }
}

/// A bound predicate over records
///
/// Conditions are ANDed left to right and evaluation stops at the first
/// false one. The canonical text identifies the predicate for cursor
/// fingerprints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    conditions: Vec<Condition>,
    canonical: String,
}

impl Predicate {
    /// The always-true predicate
    pub fn always() -> Self {
        Self::default()
    }

    /// Match everything, contributing `label` to the canonical text
    ///
    /// Used for request parameters enforced outside the predicate (the
    /// parent of a scoped fetch, rollup settings).
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            conditions: Vec::new(),
            canonical: label.into(),
        }
    }

    /// Require a field to equal a value exactly
    pub fn field_equals(field: impl Into<String>, value: Value) -> Self {
        let field = field.into();
        let canonical = format!("{}='{}'", field, value.to_text());
        Self {
            conditions: vec![Condition::Compare {
                field,
                op: Operator::Eq,
                value,
                fold_case: false,
            }],
            canonical,
        }
    }

    /// Require a timestamp field to fall within a range
    ///
    /// `label` stands in for the range in the canonical text, so callers
    /// pass the unresolved expressions to keep cursors valid across pages.
    pub fn time_window(field: impl Into<String>, range: TimeRange, label: &str) -> Self {
        let field = field.into();
        let canonical = format!("{} within {}", field, label);
        Self {
            conditions: vec![Condition::Window { field, range }],
            canonical,
        }
    }

    /// Conjunction of two predicates
    pub fn and(mut self, other: Predicate) -> Self {
        self.conditions.extend(other.conditions);
        self.canonical = match (self.canonical.is_empty(), other.canonical.is_empty()) {
            (true, _) => other.canonical,
            (false, true) => self.canonical,
            (false, false) => format!("{} and {}", self.canonical, other.canonical),
        };
        self
    }

    /// Evaluate against a record
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }

    /// Check if the predicate matches everything
    pub fn is_always_true(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Canonical text
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// CRC-32 of the canonical text
    pub fn fingerprint(&self) -> u32 {
        crc32fast::hash(self.canonical.as_bytes())
    }
}
