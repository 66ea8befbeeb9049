//! Filter Abstract Syntax Tree
//!
//! The parser produces an untyped tree; `filter::compile` checks it against
//! a schema before anything is evaluated.
//!
//! ```text
//! connection_status='connected' and signal_percent>50
//! name contains 'gateway'
//! job_submit_time>-1d
//! ```

use std::fmt;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal (=)
    Eq,
    /// Less than (<)
    Lt,
    /// Greater than (>)
    Gt,
    /// Substring match
    Contains,
    /// Prefix match
    StartsWith,
}

impl Operator {
    /// Spelling used in canonical filter text
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Contains => "contains",
            Operator::StartsWith => "startswith",
        }
    }

    /// Check whether this is a text-matching operator
    pub fn is_text_match(&self) -> bool {
        matches!(self, Operator::Contains | Operator::StartsWith)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Single-quoted text
    String(String),
    /// Bare number
    Number(f64),
    /// Bare `true` / `false`
    Bool(bool),
    /// Absolute instant (Unix ms), produced by type checking
    Timestamp(i64),
    /// Offset from the request time, e.g. `-1d`
    Relative { offset_ms: i64, text: String },
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "'{}'", s),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Timestamp(ms) => write!(f, "{}", crate::model::format_timestamp(*ms)),
            Literal::Relative { text, .. } => f.write_str(text),
        }
    }
}

/// A single `FIELD OP LITERAL` clause
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: String,
    pub op: Operator,
    pub literal: Literal,
    /// Byte offset of the clause in the query string
    pub position: usize,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Operator::Contains | Operator::StartsWith => {
                write!(f, "{} {} {}", self.field, self.op, self.literal)
            }
            _ => write!(f, "{}{}{}", self.field, self.op, self.literal),
        }
    }
}

/// Filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Empty query, matches everything
    True,
    /// Leaf comparison
    Comparison(Comparison),
    /// Conjunction
    And(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Join two expressions with `and`
    pub fn and(self, right: Expr) -> Expr {
        match self {
            Expr::True => right,
            left => Expr::And(Box::new(left), Box::new(right)),
        }
    }

    /// Leaf comparisons in left-to-right order
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            Expr::True => {}
            Expr::Comparison(c) => out.push(c),
            Expr::And(left, right) => {
                left.collect(out);
                right.collect(out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(field: &str, op: Operator, literal: Literal) -> Expr {
        Expr::Comparison(Comparison {
            field: field.to_string(),
            op,
            literal,
            position: 0,
        })
    }

    #[test]
    fn test_and_with_true_collapses() {
        let expr = Expr::True.and(cmp("a", Operator::Eq, Literal::Bool(true)));
        assert!(matches!(expr, Expr::Comparison(_)));
    }

    #[test]
    fn test_comparisons_in_order() {
        let expr = cmp("a", Operator::Eq, Literal::Number(1.0))
            .and(cmp("b", Operator::Gt, Literal::Number(2.0)))
            .and(cmp("c", Operator::Contains, Literal::String("x".into())));

        let fields: Vec<_> = expr.comparisons().iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_display() {
        let expr = cmp("name", Operator::Contains, Literal::String("gw".into()));
        let Expr::Comparison(c) = expr else { unreachable!() };
        assert_eq!(c.to_string(), "name contains 'gw'");
    }
}
