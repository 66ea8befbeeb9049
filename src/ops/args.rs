//! Operation arguments
//!
//! A flat map of argument names to JSON scalars. Names an operation does
//! not read are ignored.

use serde_json::{Map, Value as Json};

use crate::ops::error::{OperationError, OperationResult};

/// Named arguments for one call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Json>,
}

impl Arguments {
    /// Empty argument set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object; `null` is treated as no arguments
    pub fn from_json(json: Json) -> OperationResult<Self> {
        match json {
            Json::Object(values) => Ok(Self { values }),
            Json::Null => Ok(Self::new()),
            other => Err(OperationError::invalid_argument(
                "arguments",
                format!("expected an object, got {}", other),
            )),
        }
    }

    /// Builder method: set an argument
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Json>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Raw JSON value
    pub fn raw(&self, name: &str) -> Option<&Json> {
        self.values.get(name)
    }

    /// Argument names present
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Optional text argument; scalars are rendered as text
    pub fn text(&self, name: &str) -> OperationResult<Option<String>> {
        match self.values.get(name) {
            None | Some(Json::Null) => Ok(None),
            Some(Json::String(s)) => Ok(Some(s.clone())),
            Some(Json::Number(n)) => Ok(Some(n.to_string())),
            Some(Json::Bool(b)) => Ok(Some(b.to_string())),
            Some(_) => Err(OperationError::invalid_argument(name, "expected a scalar value")),
        }
    }

    /// Text argument that must be present and non-blank
    pub fn required_text(&self, name: &str) -> OperationResult<String> {
        self.text(name)?
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| OperationError::invalid_argument(name, "is required"))
    }

    /// Optional integer argument; numeric strings are accepted
    pub fn integer(&self, name: &str) -> OperationResult<Option<i64>> {
        let invalid = || OperationError::invalid_argument(name, "expected an integer");
        match self.values.get(name) {
            None | Some(Json::Null) => Ok(None),
            Some(Json::Number(n)) => match n.as_i64() {
                Some(i) => Ok(Some(i)),
                None => n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| Some(f as i64))
                    .ok_or_else(invalid),
            },
            Some(Json::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Json::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
            Some(_) => Err(invalid()),
        }
    }
}
