//! Runtime values for decoded fields (codec representation).

use std::fmt;

/// A single decoded field value.
///
/// Absence is expressed as `Option<Value>` at the record level; a `Value` always carries content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Alphanumeric content, stripped of surrounding whitespace. Also holds codes for
    /// constant and enumerated fields, and unrecognised flag/boolean codes.
    Text(String),
    /// Non-negative integer from a numeric field.
    Number(u64),
    /// Flag or boolean field (`Y` / `N`).
    Bool(bool),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(true) => f.write_str("Y"),
            Value::Bool(false) => f.write_str("N"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
