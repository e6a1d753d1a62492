//! Common types and utilities for the Kubernetes Provider Generator
//!
//! This crate contains the normalized schema IR produced by the parser, the
//! resolved type graph consumed by the generator, the generation unit
//! description, error types and the generator configuration.

pub mod config;
pub mod diagnostics;
pub mod resolved;
pub mod schema;
pub mod unit;

pub use config::{DefaultPolicy, GeneratorConfig};
pub use diagnostics::{Diagnostic, GenerationReport, Severity};
pub use resolved::{
    AttributeKind, NameHint, Presence, ResolvedField, ResolvedShape, ResolvedType, TypeId,
};
pub use schema::{
    DiscoveredKind, NodeKind, PrimitiveType, SchemaExtensions, SchemaNode, SchemaRegistry,
    SourceFormat, ValidatorSpec,
};
pub use unit::{ApiIdentity, AttributePlan, Category, GenerationUnit, Scope, UnitIdentifiers};

use thiserror::Error;

/// Errors that can occur during provider generation
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Malformed schema in {source_name}: {reason}")]
    MalformedSchema { source_name: String, reason: String },

    #[error("Unsupported schema construct at {location}: {construct}")]
    UnsupportedSchemaConstruct { location: String, construct: String },

    #[error("Unresolvable schema for {unit}: {reason}")]
    UnresolvableSchema { unit: String, reason: String },

    #[error("Schema directory error: {0}")]
    SchemaDirectory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl GeneratorError {
    /// Whether the error invalidates the whole run rather than one unit.
    ///
    /// Schema-level errors are scoped to the document or unit they came from;
    /// anything touching the schema directory, configuration, or output tree
    /// aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            GeneratorError::MalformedSchema { .. }
                | GeneratorError::UnsupportedSchemaConstruct { .. }
                | GeneratorError::UnresolvableSchema { .. }
        )
    }

    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        GeneratorError::MalformedSchema {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(location: impl Into<String>, construct: impl Into<String>) -> Self {
        GeneratorError::UnsupportedSchemaConstruct {
            location: location.into(),
            construct: construct.into(),
        }
    }

    pub fn unresolvable(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        GeneratorError::UnresolvableSchema {
            unit: unit.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;
