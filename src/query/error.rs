//! Filter and ordering error types
//!
//! Every error here is a compile-time rejection of caller input; none of
//! them is produced after a record source has been touched.

use thiserror::Error;

/// Errors raised while compiling a filter, an order-by clause or an export
/// field list
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// String literal written with double quotes
    #[error("String literals must use single quotes, not double quotes (position {position})")]
    DoubleQuoted { position: usize },

    /// Operator outside `=`, `<`, `>`, `contains`, `startswith`
    #[error("Unsupported operator '{operator}' (position {position}); supported operators are =, <, >, contains, startswith")]
    UnsupportedOperator { operator: String, position: usize },

    /// Field not present in the resource schema
    #[error("Unknown field '{field}' for {resource}")]
    UnknownField { field: String, resource: String },

    /// Field exists but does not support the operator
    #[error("Operator '{operator}' is not supported on field '{field}'")]
    OperatorNotAllowed { field: String, operator: String },

    /// Field cannot be used in an order-by clause
    #[error("Field '{field}' is not sortable")]
    NotSortable { field: String },

    /// Literal kind does not match the field kind
    #[error("Invalid value for field '{field}': {message}")]
    InvalidLiteral { field: String, message: String },

    /// Malformed input
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },
}

impl FilterError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        FilterError::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_literal(field: &str, message: impl Into<String>) -> Self {
        FilterError::InvalidLiteral {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for filter compilation
pub type FilterResult<T> = Result<T, FilterError>;
