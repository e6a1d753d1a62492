//! Swagger file parser

use super::types::SwaggerSpec;
use crate::LoadedDocument;
use kubernetes_provider_generator_common::{GeneratorError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Kubernetes OpenAPI v2 document parser
///
/// Reads the `swagger.json` the API server publishes under `/openapi/v2`
/// (or the copy checked into `api/openapi-spec/` of the Kubernetes repo).
pub struct OpenApiParser {
    spec: SwaggerSpec,
    source: PathBuf,
}

impl OpenApiParser {
    /// Load a Swagger document from a JSON or YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            GeneratorError::malformed(path.display().to_string(), format!("unreadable: {}", e))
        })?;
        Self::from_content(&content, path)
    }

    /// Parse a Swagger document from a string; `source` is used in diagnostics
    pub fn from_content(content: &str, source: &Path) -> Result<Self> {
        let spec: SwaggerSpec = if content.trim_start().starts_with('{') {
            serde_json::from_str(content).map_err(|e| {
                GeneratorError::malformed(source.display().to_string(), e.to_string())
            })?
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                GeneratorError::malformed(source.display().to_string(), e.to_string())
            })?
        };

        if !spec.swagger.starts_with("2.") {
            return Err(GeneratorError::malformed(
                source.display().to_string(),
                format!("unsupported swagger version {}", spec.swagger),
            ));
        }

        Ok(Self {
            spec,
            source: source.to_path_buf(),
        })
    }

    /// Normalize definitions and discover kinds
    pub fn parse(&self) -> Result<LoadedDocument> {
        super::converter::convert_swagger(&self.spec, &self.source)
    }

    pub fn spec(&self) -> &SwaggerSpec {
        &self.spec
    }
}
