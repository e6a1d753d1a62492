//! Converts CRD manifests into schema definitions and discovered kinds

use super::types::{CustomResourceDefinition, CRD_API_VERSION};
use crate::normalize::{normalize, Dialect};
use crate::LoadedDocument;
use kubernetes_provider_generator_common::{
    ApiIdentity, Diagnostic, DiscoveredKind, GeneratorError, NodeKind, Result, Scope,
    SchemaNode, SourceFormat,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Convert one CRD into one kind per served version
pub fn convert_crd(crd: &CustomResourceDefinition, source: &Path) -> Result<LoadedDocument> {
    if crd.api_version != CRD_API_VERSION {
        return Err(GeneratorError::malformed(
            source.display().to_string(),
            format!(
                "CRD {} uses unsupported apiVersion {}",
                crd.metadata.name, crd.api_version
            ),
        ));
    }

    let scope = if crd.is_namespaced() {
        Scope::Namespaced
    } else {
        Scope::Cluster
    };

    let mut document = LoadedDocument::default();
    for version in &crd.spec.versions {
        if !version.served {
            debug!("{} {}: version not served, skipping", crd.metadata.name, version.name);
            continue;
        }

        let api = ApiIdentity::new(&crd.spec.group, &version.name, &crd.spec.names.kind);
        let definition = definition_name(&api);

        let Some(validation) = &version.schema else {
            document.diagnostics.push(Diagnostic::error(
                api.to_string(),
                "served version has no openAPIV3Schema",
            ));
            continue;
        };

        let node = normalize(&validation.open_api_v3_schema, Dialect::CrdV1, &definition)
            .and_then(|node| with_standard_fields(node, &definition));
        let node = match node {
            Ok(node) => node,
            Err(e) if !e.is_fatal() => {
                warn!("Skipping {}: {}", api, e);
                document
                    .diagnostics
                    .push(Diagnostic::error(api.to_string(), e.to_string()));
                continue;
            }
            Err(e) => return Err(e),
        };

        let mut description = node.description.clone();
        if version.deprecated {
            let warning = version
                .deprecation_warning
                .clone()
                .unwrap_or_else(|| format!("{} is deprecated", api));
            description = Some(match description {
                Some(d) => format!("{}\n\nDeprecated: {}", d, warning),
                None => format!("Deprecated: {}", warning),
            });
        }

        document.definitions.insert(definition.clone(), node);
        document.kinds.push(DiscoveredKind {
            api,
            scope,
            root_definition: definition,
            source: source.to_path_buf(),
            format: SourceFormat::CrdV1,
            description,
            deprecated: version.deprecated,
        });
    }

    Ok(document)
}

/// CRD definitions are keyed by group/version/kind
pub fn definition_name(api: &ApiIdentity) -> String {
    format!("{}/{}/{}", api.group, api.version, api.kind)
}

/// Replace the root `metadata` with the standard object metadata shape and
/// make sure `apiVersion` and `kind` are declared
fn with_standard_fields(mut node: SchemaNode, location: &str) -> Result<SchemaNode> {
    match node.kind {
        NodeKind::Object => {}
        NodeKind::Unknown => {
            node.kind = NodeKind::Object;
            node.extensions.preserve_unknown_fields = true;
        }
        _ => {
            return Err(GeneratorError::malformed(
                location,
                "root schema must be an object",
            ))
        }
    }

    node.children
        .insert("metadata".to_string(), standard_object_meta());
    for field in ["apiVersion", "kind"] {
        node.children
            .entry(field.to_string())
            .or_insert_with(SchemaNode::string);
    }
    Ok(node)
}

/// The subset of `ObjectMeta` exposed for custom resources
pub fn standard_object_meta() -> SchemaNode {
    let string_map = || SchemaNode::map(SchemaNode::string());
    let mut children = BTreeMap::new();
    children.insert(
        "name".to_string(),
        SchemaNode::string().with_description("Name must be unique within a namespace."),
    );
    children.insert(
        "namespace".to_string(),
        SchemaNode::string().with_description("Namespace defines the space within which the name must be unique."),
    );
    children.insert(
        "generateName".to_string(),
        SchemaNode::string()
            .with_description("Prefix used by the server to generate a unique name when name is not provided."),
    );
    children.insert(
        "labels".to_string(),
        string_map().with_description("Map of string keys and values used to organize and categorize objects."),
    );
    children.insert(
        "annotations".to_string(),
        string_map().with_description("Unstructured key value map stored with the object."),
    );
    children.insert(
        "finalizers".to_string(),
        SchemaNode::array(SchemaNode::string())
            .with_description("Must be empty before the object is deleted from the registry."),
    );
    children.insert(
        "uid".to_string(),
        SchemaNode::string()
            .with_read_only()
            .with_description("Unique identifier of the object, populated by the system."),
    );
    children.insert(
        "resourceVersion".to_string(),
        SchemaNode::string()
            .with_read_only()
            .with_description("Internal version of the object, populated by the system."),
    );
    children.insert(
        "generation".to_string(),
        SchemaNode::integer(Some("int64"))
            .with_read_only()
            .with_description("Sequence number representing a specific generation of the desired state."),
    );
    let mut created = SchemaNode::string()
        .with_read_only()
        .with_description("Timestamp representing the server time when the object was created.");
    created.format = Some("date-time".to_string());
    children.insert("creationTimestamp".to_string(), created);

    SchemaNode::object(children, Vec::<String>::new()).with_description(
        "Standard object's metadata. More info: https://git.k8s.io/community/contributors/devel/sig-architecture/api-conventions.md#metadata",
    )
}
