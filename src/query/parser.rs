//! Filter Parser
//!
//! Parses filter query strings into an untyped `Expr`.
//!
//! # Supported Syntax
//!
//! ```text
//! query   := clause (AND clause)*
//! clause  := FIELD OP LITERAL
//! OP      := '=' | '<' | '>' | contains | startswith
//! LITERAL := 'text' | number | true | false | -<N><m|h|d|w>
//! ```
//!
//! Keywords are case-insensitive. Tokens are recognized with nom; the
//! clause loop is driven by hand so every rejection carries a position and
//! a message that names what went wrong.

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0, one_of, satisfy},
    combinator::{map_res, not, opt, recognize, value},
    sequence::{delimited, pair, terminated, tuple},
    IResult,
};

use crate::query::ast::{Comparison, Expr, Literal, Operator};
use crate::query::error::{FilterError, FilterResult};

/// Parse a filter string into an expression
///
/// Blank input parses to `Expr::True`.
pub fn parse_filter(input: &str) -> FilterResult<Expr> {
    let mut scanner = Scanner::new(input);
    scanner.skip_whitespace();

    let mut expr = Expr::True;
    while !scanner.at_end() {
        if !matches!(expr, Expr::True) {
            scanner.conjunction()?;
        }
        let clause = scanner.clause()?;
        expr = expr.and(Expr::Comparison(clause));
        scanner.skip_whitespace();
    }

    Ok(expr)
}

/// Position-tracking wrapper over the remaining input
struct Scanner<'a> {
    source: &'a str,
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, rest: source }
    }

    fn position(&self) -> usize {
        self.source.len() - self.rest.len()
    }

    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    fn skip_whitespace(&mut self) {
        if let Ok((rest, _)) = multispace0::<&str, nom::error::Error<&str>>(self.rest) {
            self.rest = rest;
        }
    }

    /// Run a token parser, advancing only on success
    fn token<T>(&mut self, mut parser: impl FnMut(&'a str) -> IResult<&'a str, T>) -> Option<T> {
        match parser(self.rest) {
            Ok((rest, out)) => {
                self.rest = rest;
                Some(out)
            }
            Err(_) => None,
        }
    }

    fn clause(&mut self) -> FilterResult<Comparison> {
        let position = self.position();

        let field = self
            .token(parse_identifier)
            .ok_or_else(|| FilterError::syntax(position, "expected a field name"))?;
        self.skip_whitespace();

        let op = self.operator()?;
        self.skip_whitespace();

        let literal = self.literal()?;

        Ok(Comparison {
            field: field.to_string(),
            op,
            literal,
            position,
        })
    }

    fn operator(&mut self) -> FilterResult<Operator> {
        let position = self.position();

        if let Some(symbol) = self.token(parse_symbol) {
            return match symbol {
                "=" => Ok(Operator::Eq),
                "<" => Ok(Operator::Lt),
                ">" => Ok(Operator::Gt),
                other => Err(FilterError::UnsupportedOperator {
                    operator: other.to_string(),
                    position,
                }),
            };
        }

        if let Some(word) = self.token(parse_word) {
            return match word.to_ascii_lowercase().as_str() {
                "contains" => Ok(Operator::Contains),
                "startswith" => Ok(Operator::StartsWith),
                _ => Err(FilterError::UnsupportedOperator {
                    operator: word.to_string(),
                    position,
                }),
            };
        }

        Err(FilterError::syntax(
            position,
            "expected an operator (=, <, >, contains, startswith)",
        ))
    }

    fn literal(&mut self) -> FilterResult<Literal> {
        let position = self.position();

        if self.rest.starts_with('"') {
            return Err(FilterError::DoubleQuoted { position });
        }

        if self.rest.starts_with('\'') {
            return self
                .token(parse_quoted)
                .map(|s| Literal::String(s.to_string()))
                .ok_or_else(|| FilterError::syntax(position, "unterminated string literal"));
        }

        if let Some(text) = self.token(parse_relative) {
            let offset_ms = crate::time::relative_offset(text)
                .ok()
                .flatten()
                .ok_or_else(|| FilterError::syntax(position, format!("relative time '{}' is out of range", text)))?;
            return Ok(Literal::Relative {
                offset_ms,
                text: text.to_string(),
            });
        }

        if let Some(n) = self.token(parse_number) {
            return Ok(Literal::Number(n));
        }

        if let Some(b) = self.token(parse_bool) {
            return Ok(Literal::Bool(b));
        }

        match self.token(parse_word) {
            Some(word) => Err(FilterError::syntax(
                position,
                format!(
                    "unquoted value '{}'; text values must be enclosed in single quotes",
                    word
                ),
            )),
            None if self.at_end() => Err(FilterError::syntax(position, "expected a value")),
            None => Err(FilterError::syntax(position, "unexpected character")),
        }
    }

    fn conjunction(&mut self) -> FilterResult<()> {
        let position = self.position();

        match self.token(parse_word) {
            Some(word) if word.eq_ignore_ascii_case("and") => {
                self.skip_whitespace();
                if self.at_end() {
                    return Err(FilterError::syntax(self.position(), "expected a clause after 'and'"));
                }
                Ok(())
            }
            Some(word) if word.eq_ignore_ascii_case("or") || word.eq_ignore_ascii_case("not") => {
                Err(FilterError::syntax(
                    position,
                    format!("'{}' is not supported; clauses can only be joined with 'and'", word),
                ))
            }
            _ => Err(FilterError::syntax(position, "expected 'and' between clauses")),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Assert that a token is not immediately followed by a word character
fn word_boundary(input: &str) -> IResult<&str, ()> {
    not(satisfy(is_word_char))(input)
}

/// Parse field name (letters, digits, `_`, `.`; must not start with a digit)
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '.'),
    ))(input)
}

/// Parse a run of operator symbols
fn parse_symbol(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| matches!(c, '=' | '!' | '<' | '>' | '~' | '^' | '*' | '|' | '&'))(input)
}

/// Parse a bare word
fn parse_word(input: &str) -> IResult<&str, &str> {
    take_while1(is_word_char)(input)
}

/// Parse single-quoted text
fn parse_quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('\''), take_while(|c| c != '\''), char('\''))(input)
}

/// Parse relative time like "-1d"
fn parse_relative(input: &str) -> IResult<&str, &str> {
    terminated(
        recognize(tuple((char('-'), digit1, one_of("mhdw")))),
        word_boundary,
    )(input)
}

/// Parse floating point number
fn parse_number(input: &str) -> IResult<&str, f64> {
    map_res(
        terminated(
            recognize(tuple((
                opt(char('-')),
                digit1,
                opt(pair(char('.'), digit1)),
            ))),
            word_boundary,
        ),
        |s: &str| s.parse::<f64>(),
    )(input)
}

/// Parse boolean keyword
fn parse_bool(input: &str) -> IResult<&str, bool> {
    terminated(
        alt((
            value(true, tag_no_case("true")),
            value(false, tag_no_case("false")),
        )),
        word_boundary,
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clauses(input: &str) -> Vec<Comparison> {
        parse_filter(input)
            .unwrap()
            .comparisons()
            .into_iter()
            .cloned()
            .collect()
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_filter("").unwrap(), Expr::True);
        assert_eq!(parse_filter("   ").unwrap(), Expr::True);
    }

    #[test]
    fn test_parse_simple_equality() {
        let c = clauses("connection_status='connected'");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].field, "connection_status");
        assert_eq!(c[0].op, Operator::Eq);
        assert_eq!(c[0].literal, Literal::String("connected".into()));
    }

    #[test]
    fn test_parse_conjunction() {
        let c = clauses("connection_status='connected' and signal_percent>50");
        assert_eq!(c.len(), 2);
        assert_eq!(c[1].field, "signal_percent");
        assert_eq!(c[1].op, Operator::Gt);
        assert_eq!(c[1].literal, Literal::Number(50.0));
    }

    #[test]
    fn test_parse_case_insensitive_keywords() {
        let c = clauses("name CONTAINS 'Test' AND type StartsWith 'EX' aNd production=TRUE");
        assert_eq!(c[0].op, Operator::Contains);
        assert_eq!(c[0].literal, Literal::String("Test".into()));
        assert_eq!(c[1].op, Operator::StartsWith);
        assert_eq!(c[2].literal, Literal::Bool(true));
    }

    #[test]
    fn test_parse_whitespace_around_operator() {
        let c = clauses("  signal_percent  <  -12.5  ");
        assert_eq!(c[0].op, Operator::Lt);
        assert_eq!(c[0].literal, Literal::Number(-12.5));
    }

    #[test]
    fn test_parse_relative_literal() {
        let c = clauses("job_submit_time>-1d");
        assert_eq!(
            c[0].literal,
            Literal::Relative {
                offset_ms: -86_400_000,
                text: "-1d".into()
            }
        );
    }

    #[test]
    fn test_double_quotes_rejected() {
        let err = parse_filter("type=\"EX50\"").unwrap_err();
        assert!(matches!(err, FilterError::DoubleQuoted { position: 5 }));
        assert!(err.to_string().contains("single quote"));
    }

    #[test]
    fn test_unsupported_operators_rejected() {
        for query in [
            "signal_percent>=50",
            "signal_percent<=50",
            "name!='x'",
            "name=='x'",
            "name<>'x'",
            "type equals 'EX50'",
            "name like 'x'",
        ] {
            let err = parse_filter(query).unwrap_err();
            assert!(
                matches!(err, FilterError::UnsupportedOperator { .. }),
                "{query}: {err:?}"
            );
            assert!(err.to_string().contains("operator"), "{query}");
        }
    }

    #[test]
    fn test_bad_query_syntax_rejected() {
        assert!(parse_filter("bad query syntax").is_err());
    }

    #[test]
    fn test_unquoted_word_rejected() {
        let err = parse_filter("connection_status=connected").unwrap_err();
        assert!(matches!(err, FilterError::Syntax { position: 18, .. }));
    }

    #[test]
    fn test_unterminated_quote_rejected() {
        let err = parse_filter("name='abc").unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_missing_conjunction_rejected() {
        let err = parse_filter("a=1 b=2").unwrap_err();
        assert!(err.to_string().contains("'and'"));
    }

    #[test]
    fn test_or_rejected() {
        let err = parse_filter("a=1 or b=2").unwrap_err();
        assert!(err.to_string().contains("'or'"));
    }

    #[test]
    fn test_trailing_and_rejected() {
        assert!(parse_filter("a=1 and ").is_err());
    }

    #[test]
    fn test_missing_value_rejected() {
        let err = parse_filter("a=").unwrap_err();
        assert!(err.to_string().contains("expected a value"));
    }

    #[test]
    fn test_quoted_text_keeps_case_and_spaces() {
        let c = clauses("name='My Device 01'");
        assert_eq!(c[0].literal, Literal::String("My Device 01".into()));
    }
}
