//! CRD manifest parser

use super::types::{CustomResourceDefinition, CRD_KIND};
use crate::LoadedDocument;
use kubernetes_provider_generator_common::{GeneratorError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Parser for files holding one or more CRD manifests
///
/// Accepts multi-document YAML, JSON, and `kind: List` wrappers as produced
/// by `kubectl get crd -o yaml`. Documents of other kinds are ignored.
pub struct CrdParser {
    crds: Vec<CustomResourceDefinition>,
}

impl CrdParser {
    pub fn from_content(content: &str, source: &Path) -> Result<Self> {
        let source_name = source.display().to_string();
        let mut crds = Vec::new();

        for document in serde_yaml::Deserializer::from_str(content) {
            let value = serde_json::Value::deserialize(document)
                .map_err(|e| GeneratorError::malformed(&source_name, e.to_string()))?;
            collect_crds(value, &source_name, &mut crds)?;
        }

        Ok(Self { crds })
    }

    pub fn crds(&self) -> &[CustomResourceDefinition] {
        &self.crds
    }

    /// Convert every CRD of the file
    pub fn parse(&self, source: &Path) -> Result<LoadedDocument> {
        let mut document = LoadedDocument::default();
        for crd in &self.crds {
            document.merge(super::converter::convert_crd(crd, source)?);
        }
        Ok(document)
    }
}

fn collect_crds(
    value: serde_json::Value,
    source_name: &str,
    crds: &mut Vec<CustomResourceDefinition>,
) -> Result<()> {
    match value.get("kind").and_then(serde_json::Value::as_str) {
        Some(CRD_KIND) => {
            let crd = serde_json::from_value(value)
                .map_err(|e| GeneratorError::malformed(source_name, e.to_string()))?;
            crds.push(crd);
        }
        Some("List") => {
            if let Some(serde_json::Value::Array(items)) = value.get("items") {
                for item in items.clone() {
                    collect_crds(item, source_name, crds)?;
                }
            }
        }
        other => debug!("{}: ignoring document of kind {:?}", source_name, other),
    }
    Ok(())
}
