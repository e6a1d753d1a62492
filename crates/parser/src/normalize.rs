//! Normalizes raw schema objects into [`SchemaNode`] trees
//!
//! This is the one place where the two input dialects meet: after
//! normalization a CRD schema and an OpenAPI definition of the same shape
//! produce identical nodes.

use crate::raw::{RawAdditionalProperties, RawItems, RawSchema};
use kubernetes_provider_generator_common::{
    GeneratorError, NodeKind, PrimitiveType, Result, SchemaNode, ValidatorSpec,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Input format a schema object came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Swagger 2.0 `definitions` entry; may contain `$ref`
    OpenApiV2,
    /// CRD v1 structural schema; `$ref` is not allowed
    CrdV1,
}

/// `x-kubernetes-*` extensions that carry no schema semantics for us
const IGNORED_EXTENSIONS: [&str; 4] = [
    "x-kubernetes-group-version-kind",
    "x-kubernetes-patch-strategy",
    "x-kubernetes-patch-merge-key",
    "x-kubernetes-unions",
];

/// Normalize one raw schema object
///
/// `location` is a dotted path used in error messages, e.g.
/// `io.k8s.api.apps.v1.Deployment.properties.spec`.
pub fn normalize(raw: &RawSchema, dialect: Dialect, location: &str) -> Result<SchemaNode> {
    check_extensions(raw, location)?;

    // Newer OpenAPI dumps wrap references as `allOf: [{$ref}]` to attach a description
    if raw.all_of.len() == 1 && raw.schema_type.is_none() && raw.properties.is_empty() {
        let mut node = normalize(&raw.all_of[0], dialect, &format!("{}.allOf[0]", location))?;
        apply_annotations(&mut node, raw);
        collect_validators(&mut node, raw);
        return Ok(node);
    }

    let mut node = match raw.reference_name() {
        Some(name) => {
            if dialect == Dialect::CrdV1 {
                return Err(GeneratorError::unsupported(
                    location,
                    "$ref is not allowed in CRD schemas",
                ));
            }
            SchemaNode::reference(name)
        }
        None => normalize_kind(raw, dialect, location)?,
    };

    apply_annotations(&mut node, raw);
    collect_validators(&mut node, raw);
    Ok(node)
}

fn check_extensions(raw: &RawSchema, location: &str) -> Result<()> {
    for key in raw.extensions.keys() {
        if key.starts_with("x-kubernetes-") && !IGNORED_EXTENSIONS.contains(&key.as_str()) {
            return Err(GeneratorError::unsupported(
                location,
                format!("unrecognized extension {}", key),
            ));
        }
    }
    Ok(())
}

fn normalize_kind(raw: &RawSchema, dialect: Dialect, location: &str) -> Result<SchemaNode> {
    if raw.int_or_string.unwrap_or(false) {
        return Ok(SchemaNode::string());
    }

    match raw.schema_type.as_deref() {
        Some("string") => Ok(SchemaNode::primitive(PrimitiveType::String)),
        Some("integer") => Ok(SchemaNode::primitive(PrimitiveType::Integer)),
        Some("number") => Ok(SchemaNode::primitive(PrimitiveType::Number)),
        Some("boolean") => Ok(SchemaNode::primitive(PrimitiveType::Boolean)),
        Some("array") => normalize_array(raw, dialect, location),
        Some("object") => normalize_object(raw, dialect, location),
        None if !raw.properties.is_empty() => normalize_object(raw, dialect, location),
        None if raw.items.is_some() => normalize_array(raw, dialect, location),
        None if has_typed_variants(raw) => normalize_variants(raw, dialect, location),
        None => Ok(SchemaNode::unknown()),
        Some(other) => Err(GeneratorError::unsupported(
            location,
            format!("schema type {:?}", other),
        )),
    }
}

fn normalize_array(raw: &RawSchema, dialect: Dialect, location: &str) -> Result<SchemaNode> {
    match raw.items.as_deref() {
        Some(RawItems::Schema(items)) => {
            let items = normalize(items, dialect, &format!("{}.items", location))?;
            Ok(SchemaNode::array(items))
        }
        Some(RawItems::Tuple(_)) => Err(GeneratorError::unsupported(
            location,
            "tuple-typed array items",
        )),
        None => Err(GeneratorError::malformed(
            location,
            "array schema without items",
        )),
    }
}

fn normalize_object(raw: &RawSchema, dialect: Dialect, location: &str) -> Result<SchemaNode> {
    if raw.properties.is_empty() {
        return match raw.additional_properties.as_deref() {
            Some(RawAdditionalProperties::Schema(values)) => {
                let values = normalize(
                    values,
                    dialect,
                    &format!("{}.additionalProperties", location),
                )?;
                Ok(SchemaNode::map(values))
            }
            Some(RawAdditionalProperties::Allowed(true)) => {
                let mut node = SchemaNode::unknown();
                node.extensions.preserve_unknown_fields = true;
                Ok(node)
            }
            // An object with no declared shape is carried as opaque JSON
            _ => {
                debug!("{}: object without properties, treating as unknown", location);
                Ok(SchemaNode::unknown())
            }
        };
    }

    let mut children = BTreeMap::new();
    for (name, child) in &raw.properties {
        let child = normalize(child, dialect, &format!("{}.properties.{}", location, name))?;
        children.insert(name.clone(), child);
    }
    let required: Vec<&String> = raw
        .required
        .iter()
        .filter(|name| children.contains_key(name.as_str()))
        .collect();
    let mut node = SchemaNode::object(children, required.into_iter().cloned());

    // Extra keys next to fixed properties are kept through the unknown-fields channel
    if matches!(
        raw.additional_properties.as_deref(),
        Some(RawAdditionalProperties::Allowed(true)) | Some(RawAdditionalProperties::Schema(_))
    ) {
        node.extensions.preserve_unknown_fields = true;
    }
    Ok(node)
}

fn has_typed_variants(raw: &RawSchema) -> bool {
    raw.one_of.iter().chain(raw.any_of.iter()).any(|v| !v.is_required_only())
}

fn normalize_variants(raw: &RawSchema, dialect: Dialect, location: &str) -> Result<SchemaNode> {
    let mut node = SchemaNode::new(NodeKind::OneOf);
    let branches = if raw.one_of.is_empty() {
        &raw.any_of
    } else {
        &raw.one_of
    };
    for (i, branch) in branches.iter().enumerate() {
        node.variants
            .push(normalize(branch, dialect, &format!("{}.oneOf[{}]", location, i))?);
    }
    Ok(node)
}

fn apply_annotations(node: &mut SchemaNode, raw: &RawSchema) {
    if raw.description.is_some() {
        node.description = raw.description.clone();
    }
    if raw.default.is_some() {
        node.default_value = raw.default.clone();
    }
    if raw.format.is_some() {
        node.format = raw.format.clone();
    }
    if raw.read_only.unwrap_or(false) {
        node.read_only = true;
    }

    let ext = &mut node.extensions;
    ext.preserve_unknown_fields |= raw.preserve_unknown_fields.unwrap_or(false);
    ext.int_or_string |= raw.int_or_string.unwrap_or(false);
    ext.embedded_resource |= raw.embedded_resource.unwrap_or(false);
    if raw.list_type.is_some() {
        ext.list_type = raw.list_type.clone();
    }
    if !raw.list_map_keys.is_empty() {
        ext.list_map_keys = raw.list_map_keys.clone();
    }
    if raw.map_type.is_some() {
        ext.map_type = raw.map_type.clone();
    }
}

fn collect_validators(node: &mut SchemaNode, raw: &RawSchema) {
    let validators = &mut node.validators;

    if let Some(values) = &raw.enum_values {
        if !values.is_empty() {
            validators.push(ValidatorSpec::Enum(values.clone()));
        }
    }
    if let Some(pattern) = &raw.pattern {
        validators.push(ValidatorSpec::Pattern(pattern.clone()));
    }
    if raw.minimum.is_some() || raw.maximum.is_some() {
        validators.push(ValidatorSpec::Range {
            min: raw.minimum,
            max: raw.maximum,
            exclusive_min: raw.exclusive_minimum.unwrap_or(false),
            exclusive_max: raw.exclusive_maximum.unwrap_or(false),
        });
    }
    for (min, max) in [
        (raw.min_length, raw.max_length),
        (raw.min_items, raw.max_items),
        (raw.min_properties, raw.max_properties),
    ] {
        if min.is_some() || max.is_some() {
            validators.push(ValidatorSpec::Length { min, max });
        }
    }

    if !raw.one_of.is_empty() && raw.one_of.iter().all(RawSchema::is_required_only) {
        let mut names: Vec<String> = raw
            .one_of
            .iter()
            .flat_map(|branch| branch.required.iter().cloned())
            .collect();
        names.sort();
        names.dedup();
        validators.push(ValidatorSpec::RequiredOneOf(names));
    } else if !raw.one_of.is_empty() && node.kind != NodeKind::OneOf {
        validators.push(passthrough("oneOf", &raw.one_of));
    }
    if !raw.any_of.is_empty() && node.kind != NodeKind::OneOf && !node.extensions.int_or_string {
        validators.push(passthrough("anyOf", &raw.any_of));
    }
    if raw.all_of.len() > 1 {
        validators.push(passthrough("allOf", &raw.all_of));
    }
    if let Some(not) = &raw.not {
        validators.push(passthrough("not", not));
    }
    if let Some(multiple_of) = raw.multiple_of {
        validators.push(ValidatorSpec::Passthrough {
            keyword: "multipleOf".to_string(),
            value: serde_json::json!(multiple_of),
        });
    }
    if raw.unique_items.unwrap_or(false) {
        validators.push(ValidatorSpec::Passthrough {
            keyword: "uniqueItems".to_string(),
            value: serde_json::Value::Bool(true),
        });
    }

    for rule in &raw.validations {
        if rule.is_immutable_rule() {
            if !validators.contains(&ValidatorSpec::Immutable) {
                validators.push(ValidatorSpec::Immutable);
            }
        } else {
            validators.push(passthrough("x-kubernetes-validations", rule));
        }
    }
}

fn passthrough<T: serde::Serialize + ?Sized>(keyword: &str, value: &T) -> ValidatorSpec {
    ValidatorSpec::Passthrough {
        keyword: keyword.to_string(),
        value: serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> RawSchema {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_object_with_required_and_formats() {
        let raw = parse(
            r#"{
                "type": "object",
                "required": ["name", "ghost"],
                "properties": {
                    "name": {"type": "string"},
                    "replicas": {"type": "integer", "format": "int32"}
                }
            }"#,
        );
        let node = normalize(&raw, Dialect::CrdV1, "root").unwrap();
        assert_eq!(node.kind, NodeKind::Object);
        assert!(node.is_required("name"));
        assert!(!node.required.contains("ghost"));
        assert_eq!(node.children["replicas"].format.as_deref(), Some("int32"));
    }

    #[test]
    fn test_additional_properties_becomes_map() {
        let raw = parse(r#"{"type": "object", "additionalProperties": {"type": "string"}}"#);
        let node = normalize(&raw, Dialect::CrdV1, "root").unwrap();
        assert_eq!(node.kind, NodeKind::Map);
        assert_eq!(
            node.additional_properties.as_deref(),
            Some(&SchemaNode::string())
        );
    }

    #[test]
    fn test_empty_object_is_unknown() {
        let raw = parse(r#"{"type": "object"}"#);
        let node = normalize(&raw, Dialect::CrdV1, "root").unwrap();
        assert_eq!(node.kind, NodeKind::Unknown);
        assert!(node.check_invariants().is_ok());
    }

    #[test]
    fn test_int_or_string() {
        let raw = parse(
            r#"{
                "anyOf": [{"type": "integer"}, {"type": "string"}],
                "x-kubernetes-int-or-string": true
            }"#,
        );
        let node = normalize(&raw, Dialect::CrdV1, "port").unwrap();
        assert_eq!(node.kind, NodeKind::Primitive(PrimitiveType::String));
        assert!(node.extensions.int_or_string);
        assert!(node.validators.is_empty());
    }

    #[test]
    fn test_ref_only_in_openapi() {
        let raw = parse(r##"{"$ref": "#/definitions/io.k8s.api.core.v1.PodSpec"}"##);
        let node = normalize(&raw, Dialect::OpenApiV2, "spec").unwrap();
        assert_eq!(
            node.kind,
            NodeKind::Reference("io.k8s.api.core.v1.PodSpec".into())
        );

        let err = normalize(&raw, Dialect::CrdV1, "spec").unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::UnsupportedSchemaConstruct { .. }
        ));
    }

    #[test]
    fn test_all_of_wrapper_keeps_description() {
        let raw = parse(
            r##"{
                "allOf": [{"$ref": "#/definitions/io.k8s.apimachinery.pkg.apis.meta.v1.ObjectMeta"}],
                "description": "Standard object metadata.",
                "default": {}
            }"##,
        );
        let node = normalize(&raw, Dialect::OpenApiV2, "metadata").unwrap();
        assert!(matches!(node.kind, NodeKind::Reference(_)));
        assert_eq!(node.description.as_deref(), Some("Standard object metadata."));
        assert_eq!(node.default_value, Some(serde_json::json!({})));
    }

    #[test]
    fn test_validators() {
        let raw = parse(
            r#"{
                "type": "string",
                "enum": ["Always", "Never"],
                "pattern": "^[a-z]+$",
                "minLength": 1,
                "x-kubernetes-validations": [
                    {"rule": "self == oldSelf", "message": "immutable"},
                    {"rule": "self.size() < 10"}
                ]
            }"#,
        );
        let node = normalize(&raw, Dialect::CrdV1, "policy").unwrap();
        assert!(node.validators.contains(&ValidatorSpec::Pattern("^[a-z]+$".into())));
        assert!(node.validators.contains(&ValidatorSpec::Immutable));
        assert!(node.validators.contains(&ValidatorSpec::Length {
            min: Some(1),
            max: None
        }));
        assert_eq!(
            node.validators.iter().filter(|v| v.is_passthrough()).count(),
            1
        );
    }

    #[test]
    fn test_required_one_of() {
        let raw = parse(
            r#"{
                "type": "object",
                "properties": {"a": {"type": "string"}, "b": {"type": "string"}},
                "oneOf": [{"required": ["b"]}, {"required": ["a"]}]
            }"#,
        );
        let node = normalize(&raw, Dialect::CrdV1, "root").unwrap();
        assert_eq!(
            node.validators,
            vec![ValidatorSpec::RequiredOneOf(vec!["a".into(), "b".into()])]
        );
    }

    #[test]
    fn test_typed_one_of_is_polymorphic() {
        let raw = parse(r#"{"oneOf": [{"type": "string"}, {"type": "object", "properties": {"x": {"type": "string"}}}]}"#);
        let node = normalize(&raw, Dialect::CrdV1, "value").unwrap();
        assert_eq!(node.kind, NodeKind::OneOf);
        assert_eq!(node.variants.len(), 2);
    }

    #[test]
    fn test_unrecognized_extension() {
        let raw = parse(r#"{"type": "string", "x-kubernetes-frobnicate": true}"#);
        let err = normalize(&raw, Dialect::CrdV1, "field").unwrap_err();
        assert!(err.to_string().contains("x-kubernetes-frobnicate"));
    }

    #[test]
    fn test_array_without_items_is_malformed() {
        let raw = parse(r#"{"type": "array"}"#);
        let err = normalize(&raw, Dialect::OpenApiV2, "list").unwrap_err();
        assert!(matches!(err, GeneratorError::MalformedSchema { .. }));
    }
}
