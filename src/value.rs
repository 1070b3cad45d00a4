//! Scalar values stored in templates and in the target tree

use std::fmt;

use serde::{Deserialize, Serialize};

/// A value declared by a template or held by the document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
}

impl Value {
    /// Empty strings count as "no value"
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::String(s) if s.is_empty())
    }

    /// Borrow the string payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The empty string value
    pub fn empty() -> Self {
        Value::String(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

/// Whether an optional value is absent or empty
pub fn is_empty_value(value: Option<&Value>) -> bool {
    value.map_or(true, Value::is_empty)
}

/// Structural equality used for every "untouched" check.
///
/// Absent and empty compare equal; anything else compares by variant and payload.
pub fn same_value(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a.filter(|v| !v.is_empty()), b.filter(|v| !v.is_empty())) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
