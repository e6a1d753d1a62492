//! Value validators attached to schema attributes

use crate::error::Diagnostic;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A check applied to a configured value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Validator {
    /// Value must equal one of the listed values
    OneOf(Vec<Value>),
    /// String must match the regular expression
    Regex(String),
    Range {
        min: Option<f64>,
        max: Option<f64>,
        exclusive_min: bool,
        exclusive_max: bool,
    },
    /// Character count of a string, element count of a list or map
    Length { min: Option<u64>, max: Option<u64> },
    /// Exactly one of the named child attributes must be set
    RequiredOneOf(Vec<String>),
}

impl Validator {
    pub fn one_of(values: Vec<Value>) -> Self {
        Validator::OneOf(values)
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Validator::Regex(pattern.into())
    }

    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Validator::Range {
            min,
            max,
            exclusive_min: false,
            exclusive_max: false,
        }
    }

    pub fn length(min: Option<u64>, max: Option<u64>) -> Self {
        Validator::Length { min, max }
    }

    pub fn required_one_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Validator::RequiredOneOf(names.into_iter().map(Into::into).collect())
    }

    /// Check a value; null values are never validated
    pub fn validate(&self, value: &Value, path: &str) -> Option<Diagnostic> {
        if value.is_null() {
            return None;
        }
        let failure = match self {
            Validator::OneOf(allowed) => check_one_of(allowed, value),
            Validator::Regex(pattern) => check_regex(pattern, value),
            Validator::Range {
                min,
                max,
                exclusive_min,
                exclusive_max,
            } => check_range(*min, *max, *exclusive_min, *exclusive_max, value),
            Validator::Length { min, max } => check_length(*min, *max, value),
            Validator::RequiredOneOf(names) => check_required_one_of(names, value),
        }?;
        Some(Diagnostic::error("Invalid attribute value").with_detail(failure).with_attribute(path))
    }
}

fn check_one_of(allowed: &[Value], value: &Value) -> Option<String> {
    if allowed.contains(value) {
        return None;
    }
    // configuration carries int-or-string values as text
    if let Value::String(s) = value {
        if allowed.iter().any(|a| a.is_number() && a.to_string() == *s) {
            return None;
        }
    }
    let listed: Vec<String> = allowed.iter().map(Value::to_string).collect();
    Some(format!("value must be one of: {}", listed.join(", ")))
}

fn check_regex(pattern: &str, value: &Value) -> Option<String> {
    let s = value.as_str()?;
    match Regex::new(pattern) {
        Ok(re) if re.is_match(s) => None,
        Ok(_) => Some(format!("value {:?} must match pattern {}", s, pattern)),
        Err(e) => {
            debug!("Skipping pattern {} that does not compile: {}", pattern, e);
            None
        }
    }
}

fn check_range(
    min: Option<f64>,
    max: Option<f64>,
    exclusive_min: bool,
    exclusive_max: bool,
    value: &Value,
) -> Option<String> {
    let n = value.as_f64()?;
    if let Some(min) = min {
        if n < min || (exclusive_min && n == min) {
            let op = if exclusive_min { ">" } else { ">=" };
            return Some(format!("value must be {} {}", op, min));
        }
    }
    if let Some(max) = max {
        if n > max || (exclusive_max && n == max) {
            let op = if exclusive_max { "<" } else { "<=" };
            return Some(format!("value must be {} {}", op, max));
        }
    }
    None
}

fn check_length(min: Option<u64>, max: Option<u64>, value: &Value) -> Option<String> {
    let len = match value {
        Value::String(s) => s.chars().count(),
        Value::Array(a) => a.len(),
        Value::Object(o) => o.len(),
        _ => return None,
    } as u64;
    if min.is_some_and(|min| len < min) || max.is_some_and(|max| len > max) {
        let bounds = match (min, max) {
            (Some(min), Some(max)) => format!("between {} and {}", min, max),
            (Some(min), None) => format!("at least {}", min),
            (None, Some(max)) => format!("at most {}", max),
            (None, None) => return None,
        };
        return Some(format!("length must be {}, got {}", bounds, len));
    }
    None
}

fn check_required_one_of(names: &[String], value: &Value) -> Option<String> {
    let object = value.as_object()?;
    let set = names
        .iter()
        .filter(|name| object.get(name.as_str()).is_some_and(|v| !v.is_null()))
        .count();
    if set == 1 {
        None
    } else {
        Some(format!(
            "exactly one of [{}] must be set, found {}",
            names.join(", "),
            set
        ))
    }
}
