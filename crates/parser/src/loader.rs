//! Schema directory loader
//!
//! Walks a directory of OpenAPI v2 documents and CRD manifests and merges
//! everything into one [`SchemaRegistry`]. A broken or unreadable file is
//! reported and skipped; a missing or unwalkable directory aborts the load.

use crate::crd::CrdParser;
use crate::openapi::OpenApiParser;
use crate::LoadedDocument;
use kubernetes_provider_generator_common::{
    Diagnostic, GeneratorError, Result, SchemaRegistry, SourceFormat,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const SCHEMA_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Everything loaded from a schema directory
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub registry: SchemaRegistry,
    /// Per-file and per-kind problems; errors mean the subject was skipped
    pub diagnostics: Vec<Diagnostic>,
    pub files_read: usize,
}

/// Loads every schema document below a root directory
pub struct SchemaLoader {
    root: PathBuf,
}

impl SchemaLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn load(&self) -> Result<LoadOutcome> {
        if !self.root.is_dir() {
            return Err(GeneratorError::SchemaDirectory(format!(
                "{} is not a readable directory",
                self.root.display()
            )));
        }

        let mut outcome = LoadOutcome::default();
        for path in self.schema_files()? {
            outcome.files_read += 1;
            let loaded = fs::read_to_string(&path)
                .map_err(|e| {
                    GeneratorError::malformed(path.display().to_string(), format!("unreadable: {}", e))
                })
                .and_then(|content| load_document(&content, &path));

            match loaded {
                Ok(document) => merge_into(&mut outcome, document, &path),
                Err(e) if !e.is_fatal() => {
                    warn!("Skipping {}: {}", path.display(), e);
                    outcome
                        .diagnostics
                        .push(Diagnostic::error(path.display().to_string(), e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Loaded {} kinds and {} definitions from {} files",
            outcome.registry.kinds.len(),
            outcome.registry.definitions.len(),
            outcome.files_read
        );
        Ok(outcome)
    }

    /// Schema files in a stable order
    fn schema_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                GeneratorError::SchemaDirectory(format!("failed to walk {}: {}", self.root.display(), e))
            })?;
            let is_schema = entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|s| s.to_str())
                    .map(|ext| SCHEMA_EXTENSIONS.contains(&ext))
                    .unwrap_or(false);
            if is_schema {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

/// Load every schema document below `root`
pub fn load_schema_directory(root: impl AsRef<Path>) -> Result<LoadOutcome> {
    SchemaLoader::new(root.as_ref()).load()
}

/// Detect the format of one document and load it
pub fn load_document(content: &str, source: &Path) -> Result<LoadedDocument> {
    match detect_format(content) {
        SourceFormat::OpenApiV2 => {
            debug!("{}: OpenAPI v2 document", source.display());
            OpenApiParser::from_content(content, source)?.parse()
        }
        SourceFormat::CrdV1 => {
            debug!("{}: CRD manifest", source.display());
            CrdParser::from_content(content, source)?.parse(source)
        }
    }
}

/// A document with a top-level `swagger` key is OpenAPI; anything else is
/// treated as CRD manifests
pub fn detect_format(content: &str) -> SourceFormat {
    let first = serde_yaml::Deserializer::from_str(content)
        .next()
        .and_then(|document| serde_json::Value::deserialize(document).ok());
    match first {
        Some(value) if value.get("swagger").is_some() => SourceFormat::OpenApiV2,
        _ => SourceFormat::CrdV1,
    }
}

fn merge_into(outcome: &mut LoadOutcome, document: LoadedDocument, path: &Path) {
    let source = path.display().to_string();
    for (name, node) in document.definitions {
        if !outcome.registry.insert_definition(name.clone(), node) {
            warn!("{}: conflicting definition {}, keeping the first", source, name);
            outcome.diagnostics.push(Diagnostic::warning(
                name,
                format!("conflicting duplicate in {} ignored", source),
            ));
        }
    }
    for kind in document.kinds {
        let api = kind.api.to_string();
        if !outcome.registry.insert_kind(kind) {
            warn!("{}: duplicate kind {}, keeping the first", source, api);
            outcome.diagnostics.push(Diagnostic::warning(
                api,
                format!("duplicate declaration in {} ignored", source),
            ));
        }
    }
    outcome.diagnostics.extend(document.diagnostics);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            detect_format(r#"{"swagger": "2.0", "definitions": {}}"#),
            SourceFormat::OpenApiV2
        );
        assert_eq!(
            detect_format("apiVersion: apiextensions.k8s.io/v1\nkind: CustomResourceDefinition\n"),
            SourceFormat::CrdV1
        );
        assert_eq!(detect_format("{broken"), SourceFormat::CrdV1);
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let err = load_schema_directory("/nonexistent/schemas").unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, GeneratorError::SchemaDirectory(_)));
    }
}
