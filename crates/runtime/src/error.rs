//! Error and diagnostic types for generated providers

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure to map a manifest onto a model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("missing required field {path}")]
    MissingRequiredField { path: String },
}

impl DecodeError {
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: &serde_json::Value,
    ) -> Self {
        DecodeError::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            found: json_type_name(found).to_string(),
        }
    }

    pub fn missing(path: impl Into<String>) -> Self {
        DecodeError::MissingRequiredField { path: path.into() }
    }

    /// Attribute path the error refers to
    pub fn path(&self) -> &str {
        match self {
            DecodeError::TypeMismatch { path, .. } | DecodeError::MissingRequiredField { path } => {
                path
            }
        }
    }
}

pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Errors raised by a Kubernetes client implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("request rejected by the API server: {0}")]
    Rejected(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors returned by resource and data source operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to decode manifest: {0}")]
    Decode(#[from] DecodeError),

    #[error("Kubernetes API error: {0}")]
    Client(#[from] ClientError),

    #[error("{kind} {id} not found")]
    NotFound { kind: String, id: String },

    #[error("Invalid import id {0:?}: expected <namespace>/<name> or <name>")]
    InvalidImportId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ProviderError {
    /// Convert into a user-visible diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.to_string());
        match self {
            ProviderError::Decode(e) => diagnostic.with_attribute(e.path()),
            _ => diagnostic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A message shown to the Terraform user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Dotted attribute path, e.g. `spec.template.spec.containers[0].image`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_attribute(mut self, path: impl Into<String>) -> Self {
        self.attribute = Some(path.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(attribute) = &self.attribute {
            write!(f, "{}: ", attribute)?;
        }
        write!(f, "{}", self.summary)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;
