//! Literal values appearing inside templates.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::format_number;
use super::Value;

/// A literal value parsed from template source: a pipe-function argument,
/// a match pattern, or a match result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    /// A quoted string literal.
    String(String),

    /// A signed decimal number literal.
    Number(f64),

    /// A `true`/`false` literal.
    Bool(bool),
}

impl Primitive {
    /// Convert into the runtime value model.
    pub fn to_value(&self) -> Value {
        self.clone().into()
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::String(s) => write!(f, "{s}"),
            Primitive::Number(n) => write!(f, "{}", format_number(*n)),
            Primitive::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Primitive {
    fn from(s: &str) -> Self {
        Primitive::String(s.to_string())
    }
}

impl From<String> for Primitive {
    fn from(s: String) -> Self {
        Primitive::String(s)
    }
}

impl From<f64> for Primitive {
    fn from(n: f64) -> Self {
        Primitive::Number(n)
    }
}

impl From<i32> for Primitive {
    fn from(n: i32) -> Self {
        Primitive::Number(f64::from(n))
    }
}

impl From<bool> for Primitive {
    fn from(b: bool) -> Self {
        Primitive::Bool(b)
    }
}
