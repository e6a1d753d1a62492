//! Converts a Swagger document into schema definitions and discovered kinds

use super::types::{GroupVersionKind, SwaggerSpec};
use crate::normalize::{normalize, Dialect};
use crate::LoadedDocument;
use kubernetes_provider_generator_common::{
    ApiIdentity, Diagnostic, DiscoveredKind, GeneratorError, Result, Scope, SourceFormat,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Properties every top-level Kubernetes object carries
const OBJECT_PROPERTIES: [&str; 3] = ["apiVersion", "kind", "metadata"];

/// Convert a Swagger document
pub fn convert_swagger(spec: &SwaggerSpec, source: &Path) -> Result<LoadedDocument> {
    let source_name = source.display().to_string();
    let definitions = spec.definitions.as_ref().ok_or_else(|| {
        GeneratorError::malformed(&source_name, "document has no definitions section")
    })?;

    let mut document = LoadedDocument::default();
    let mut failed: BTreeMap<&str, String> = BTreeMap::new();

    for (name, raw) in definitions {
        match normalize(raw, Dialect::OpenApiV2, name) {
            Ok(node) => {
                document.definitions.insert(name.clone(), node);
            }
            Err(e) if !e.is_fatal() => {
                warn!("Skipping definition {}: {}", name, e);
                failed.insert(name.as_str(), e.to_string());
            }
            Err(e) => return Err(e),
        }
    }

    for (name, raw) in definitions {
        let is_object = OBJECT_PROPERTIES
            .iter()
            .all(|prop| raw.properties.contains_key(*prop));

        for gvk in raw.group_version_kinds() {
            if gvk.kind.ends_with("List") || !is_object {
                debug!("{}: not a top-level object kind, skipping", name);
                continue;
            }

            let api = ApiIdentity::new(&gvk.group, &gvk.version, &gvk.kind);
            if let Some(reason) = failed.get(name.as_str()) {
                document
                    .diagnostics
                    .push(Diagnostic::error(api.to_string(), reason.clone()));
                continue;
            }

            document.kinds.push(DiscoveredKind {
                scope: infer_scope(spec, &gvk),
                api,
                root_definition: name.clone(),
                source: source.to_path_buf(),
                format: SourceFormat::OpenApiV2,
                description: raw.description.clone(),
                deprecated: is_deprecated(raw.description.as_deref()),
            });
        }
    }

    for (name, reason) in failed {
        document
            .diagnostics
            .push(Diagnostic::warning(name, format!("definition skipped: {}", reason)));
    }

    Ok(document)
}

/// Infer scope from the operations that mention the kind
///
/// A kind served under `/namespaces/{namespace}/` is namespaced, a kind
/// served only elsewhere is cluster scoped. Kinds without any operation
/// default to namespaced.
fn infer_scope(spec: &SwaggerSpec, gvk: &GroupVersionKind) -> Scope {
    let mut served = false;
    for (path, item) in &spec.paths {
        let mentions = item
            .operations()
            .any(|op| op.group_version_kind.as_ref() == Some(gvk));
        if !mentions {
            continue;
        }
        if path.contains("{namespace}") {
            return Scope::Namespaced;
        }
        served = true;
    }
    if served {
        Scope::Cluster
    } else {
        Scope::Namespaced
    }
}

fn is_deprecated(description: Option<&str>) -> bool {
    description
        .map(|d| d.trim_start().to_ascii_lowercase().starts_with("deprecated"))
        .unwrap_or(false)
}
