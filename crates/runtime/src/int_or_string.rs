//! Values of `x-kubernetes-int-or-string` fields

use serde::{Deserialize, Serialize};
use std::fmt;

/// A field that holds either an integer or a string, such as a container
/// port (`8080`) or a named port (`"http"`)
///
/// The variant is kept through decode and encode, so `80` and `"80"` stay
/// distinct manifest values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntOrString {
    Int(i64),
    String(String),
}

impl IntOrString {
    /// Interpret text entered in configuration
    ///
    /// Canonical decimal integers (`-1`, `80`) become [`IntOrString::Int`];
    /// anything else, including `007` and `+5`, stays a string.
    pub fn parse(text: &str) -> Self {
        match text.parse::<i64>() {
            Ok(n) if n.to_string() == text => IntOrString::Int(n),
            _ => IntOrString::String(text.to_string()),
        }
    }
}

impl Default for IntOrString {
    fn default() -> Self {
        IntOrString::String(String::new())
    }
}

impl fmt::Display for IntOrString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntOrString::Int(n) => write!(f, "{}", n),
            IntOrString::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for IntOrString {
    fn from(n: i64) -> Self {
        IntOrString::Int(n)
    }
}

impl From<&str> for IntOrString {
    fn from(s: &str) -> Self {
        IntOrString::String(s.to_string())
    }
}

impl From<String> for IntOrString {
    fn from(s: String) -> Self {
        IntOrString::String(s)
    }
}
