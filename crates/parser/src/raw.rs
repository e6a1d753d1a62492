//! JSON schema keywords shared by OpenAPI v2 definitions and CRD v1 schemas
//!
//! Kubernetes publishes built-in types as Swagger 2.0 schemas and custom
//! types as structural OpenAPI v3 schemas. The keyword sets overlap almost
//! entirely, so both formats deserialize into [`RawSchema`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One schema object as it appears on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSchema {
    /// Type: string, number, integer, boolean, array, object
    #[serde(rename = "type", default)]
    pub schema_type: Option<String>,

    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub properties: BTreeMap<String, RawSchema>,

    #[serde(default)]
    pub required: Vec<String>,

    #[serde(default)]
    pub items: Option<Box<RawItems>>,

    #[serde(default)]
    pub additional_properties: Option<Box<RawAdditionalProperties>>,

    #[serde(rename = "enum", default)]
    pub enum_values: Option<Vec<serde_json::Value>>,

    #[serde(rename = "$ref", default)]
    pub ref_path: Option<String>,

    #[serde(default)]
    pub default: Option<serde_json::Value>,

    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(default)]
    pub minimum: Option<f64>,

    #[serde(default)]
    pub maximum: Option<f64>,

    #[serde(default)]
    pub exclusive_minimum: Option<bool>,

    #[serde(default)]
    pub exclusive_maximum: Option<bool>,

    #[serde(default)]
    pub min_length: Option<u64>,

    #[serde(default)]
    pub max_length: Option<u64>,

    #[serde(default)]
    pub min_items: Option<u64>,

    #[serde(default)]
    pub max_items: Option<u64>,

    #[serde(default)]
    pub min_properties: Option<u64>,

    #[serde(default)]
    pub max_properties: Option<u64>,

    #[serde(default)]
    pub multiple_of: Option<f64>,

    #[serde(default)]
    pub unique_items: Option<bool>,

    #[serde(default)]
    pub one_of: Vec<RawSchema>,

    #[serde(default)]
    pub any_of: Vec<RawSchema>,

    #[serde(default)]
    pub all_of: Vec<RawSchema>,

    #[serde(default)]
    pub not: Option<Box<RawSchema>>,

    #[serde(default)]
    pub nullable: Option<bool>,

    #[serde(default)]
    pub read_only: Option<bool>,

    #[serde(rename = "x-kubernetes-preserve-unknown-fields", default)]
    pub preserve_unknown_fields: Option<bool>,

    #[serde(rename = "x-kubernetes-int-or-string", default)]
    pub int_or_string: Option<bool>,

    #[serde(rename = "x-kubernetes-embedded-resource", default)]
    pub embedded_resource: Option<bool>,

    #[serde(rename = "x-kubernetes-list-type", default)]
    pub list_type: Option<String>,

    #[serde(rename = "x-kubernetes-list-map-keys", default)]
    pub list_map_keys: Vec<String>,

    #[serde(rename = "x-kubernetes-map-type", default)]
    pub map_type: Option<String>,

    #[serde(rename = "x-kubernetes-validations", default)]
    pub validations: Vec<ValidationRule>,

    /// Everything else (`x-kubernetes-*` extensions, `title`, `example`, ...)
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

/// `items` may be one schema or, in CRD schemas, a tuple of schemas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawItems {
    Schema(RawSchema),
    Tuple(Vec<RawSchema>),
}

/// `additionalProperties` may be a boolean or a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAdditionalProperties {
    Allowed(bool),
    Schema(RawSchema),
}

/// A CEL rule from `x-kubernetes-validations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub rule: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub message_expression: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub field_path: Option<String>,
}

impl ValidationRule {
    /// `self == oldSelf` marks a field as immutable after creation
    pub fn is_immutable_rule(&self) -> bool {
        let compact: String = self.rule.chars().filter(|c| !c.is_whitespace()).collect();
        compact == "self==oldSelf" || compact == "oldSelf==self"
    }
}

impl RawSchema {
    /// The definition name a `$ref` points to, e.g. `#/definitions/io.k8s.api.core.v1.Pod`
    pub fn reference_name(&self) -> Option<&str> {
        self.ref_path
            .as_deref()
            .map(|r| r.strip_prefix("#/definitions/").unwrap_or(r))
    }

    /// A validation-only schema carries nothing but `required` (e.g. CRD `oneOf` branches)
    pub fn is_required_only(&self) -> bool {
        !self.required.is_empty()
            && self.schema_type.is_none()
            && self.properties.is_empty()
            && self.ref_path.is_none()
            && self.items.is_none()
    }
}
