//! Schema descriptors for resources and data sources
//!
//! Generated code builds a [`ResourceSchema`] per resource, data source and
//! manifest data source. The same descriptor drives the manifest codec,
//! configuration validation and the structural
//! [`validate_implementation`](ResourceSchema::validate_implementation) check.

use crate::error::Diagnostic;
use crate::validators::Validator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Attribute names Terraform reserves at the top level of a resource
pub const RESERVED_ROOT_NAMES: [&str; 7] = [
    "connection",
    "count",
    "depends_on",
    "for_each",
    "lifecycle",
    "provider",
    "provisioner",
];

/// Value type of an attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrType {
    String,
    Int32,
    Int64,
    Float64,
    Bool,
    /// Integer or string, kept as whichever the manifest used ([`IntOrString`](crate::IntOrString))
    IntOrString,
    /// String holding raw JSON
    Json,
    List(Box<AttrType>),
    Set(Box<AttrType>),
    Map(Box<AttrType>),
    Object(ObjectType),
}

impl AttrType {
    pub fn list(element: AttrType) -> Self {
        AttrType::List(Box::new(element))
    }

    pub fn set(element: AttrType) -> Self {
        AttrType::Set(Box::new(element))
    }

    pub fn map(element: AttrType) -> Self {
        AttrType::Map(Box::new(element))
    }

    /// Make every nested attribute computed-only
    fn into_computed(self) -> Self {
        match self {
            AttrType::Object(object) => AttrType::Object(object.into_computed()),
            AttrType::List(inner) => AttrType::List(Box::new(inner.into_computed())),
            AttrType::Set(inner) => AttrType::Set(Box::new(inner.into_computed())),
            AttrType::Map(inner) => AttrType::Map(Box::new(inner.into_computed())),
            other => other,
        }
    }

    /// The object type this type ultimately contains, if any
    pub fn object(&self) -> Option<&ObjectType> {
        match self {
            AttrType::Object(object) => Some(object),
            AttrType::List(inner) | AttrType::Set(inner) | AttrType::Map(inner) => inner.object(),
            _ => None,
        }
    }

    fn object_mut(&mut self) -> Option<&mut ObjectType> {
        match self {
            AttrType::Object(object) => Some(object),
            AttrType::List(inner) | AttrType::Set(inner) | AttrType::Map(inner) => {
                inner.object_mut()
            }
            _ => None,
        }
    }
}

/// A named attribute of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    /// Manifest key; `None` for attributes that only exist in Terraform (e.g. `id`)
    pub json_name: Option<String>,
    pub attr_type: AttrType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// The manifest always carries the key when the parent object is present
    pub manifest_required: bool,
    /// Changing the value forces the object to be replaced
    pub requires_replace: bool,
    pub description: Option<String>,
    pub validators: Vec<Validator>,
}

impl Attribute {
    /// A new optional attribute mapped to the manifest key of the same name
    pub fn new(name: impl Into<String>, attr_type: AttrType) -> Self {
        let name = name.into();
        Self {
            json_name: Some(name.clone()),
            name,
            attr_type,
            required: false,
            optional: true,
            computed: false,
            manifest_required: false,
            requires_replace: false,
            description: None,
            validators: Vec::new(),
        }
    }

    /// An attribute with no manifest counterpart
    pub fn synthetic(name: impl Into<String>, attr_type: AttrType) -> Self {
        let mut attribute = Self::new(name, attr_type);
        attribute.json_name = None;
        attribute
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self.computed = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self.optional = true;
        self.computed = false;
        self
    }

    /// Computed-only; nested attributes become computed-only as well
    pub fn computed(mut self) -> Self {
        self.required = false;
        self.optional = false;
        self.computed = true;
        self.attr_type = self.attr_type.into_computed();
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.required = false;
        self.optional = true;
        self.computed = true;
        self
    }

    pub fn with_json_name(mut self, json_name: impl Into<String>) -> Self {
        self.json_name = Some(json_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn manifest_required(mut self) -> Self {
        self.manifest_required = true;
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// Attributes of a nested object (or of the schema root)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectType {
    pub attributes: Vec<Attribute>,
    /// Keys outside `attributes` are kept verbatim by the codec
    pub preserve_unknown_fields: bool,
    /// Object-level checks such as required-one-of
    pub validators: Vec<Validator>,
}

impl ObjectType {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self {
            attributes,
            preserve_unknown_fields: false,
            validators: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_preserve_unknown_fields(mut self) -> Self {
        self.preserve_unknown_fields = true;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    fn into_computed(mut self) -> Self {
        self.attributes = self.attributes.into_iter().map(Attribute::computed).collect();
        self
    }

    /// Make every attribute computed-only except the named lookup keys
    pub fn computed_except(mut self, keep: &[&str]) -> Self {
        self.attributes = self
            .attributes
            .into_iter()
            .map(|a| {
                if keep.contains(&a.name.as_str()) {
                    a
                } else {
                    a.computed()
                }
            })
            .collect();
        self
    }

    /// Force the attribute at `path` (attribute names) to be required.
    /// Returns false when the path does not exist.
    pub fn require_path<S: AsRef<str>>(&mut self, path: &[S]) -> bool {
        let Some((first, rest)) = path.split_first() else {
            return false;
        };
        let Some(attribute) = self.attribute_mut(first.as_ref()) else {
            return false;
        };
        if rest.is_empty() {
            attribute.required = true;
            attribute.optional = false;
            attribute.computed = false;
            return true;
        }
        match attribute.attr_type.object_mut() {
            Some(object) => object.require_path(rest),
            None => false,
        }
    }
}

/// Schema of one resource, data source or manifest data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    /// Terraform type name, e.g. `k8s_apps_deployment_v1`
    pub type_name: String,
    pub description: Option<String>,
    pub version: i64,
    pub block: ObjectType,
}

/// One structural problem found by [`ResourceSchema::validate_implementation`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl ResourceSchema {
    pub fn new(type_name: impl Into<String>, block: ObjectType) -> Self {
        Self {
            type_name: type_name.into(),
            description: None,
            version: 0,
            block,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.block.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attribute(name)
    }

    /// Check the schema is structurally valid for the plugin framework
    ///
    /// Rules: every attribute sets at least one of required/optional/computed,
    /// required excludes optional and computed, names are lowercase
    /// identifiers unique within their object, reserved names are not used at
    /// the root, nested objects have attributes, and nothing below a
    /// computed-only attribute is configurable.
    pub fn validate_implementation(&self) -> std::result::Result<(), Vec<SchemaViolation>> {
        let mut violations = Vec::new();

        if !is_valid_name(&self.type_name) {
            violations.push(SchemaViolation {
                path: String::new(),
                message: format!("invalid type name {:?}", self.type_name),
            });
        }
        for attribute in &self.block.attributes {
            if RESERVED_ROOT_NAMES.contains(&attribute.name.as_str()) {
                violations.push(SchemaViolation {
                    path: attribute.name.clone(),
                    message: "attribute name is reserved at the top level".to_string(),
                });
            }
        }
        check_object(&self.block, "", false, &mut violations);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Check a configuration (keyed by attribute name) against required
    /// flags and value validators
    pub fn validate_config(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        validate_object(&self.block, config, "", &mut diagnostics);
        diagnostics
    }

    /// Paths of requires-replace attributes whose value differs between two states
    pub fn requires_replace_paths(&self, prior: &Value, planned: &Value) -> Vec<String> {
        let mut paths = Vec::new();
        replace_paths(&self.block, prior, planned, "", &mut paths);
        paths
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn check_object(
    object: &ObjectType,
    prefix: &str,
    computed_parent: bool,
    violations: &mut Vec<SchemaViolation>,
) {
    let mut seen = BTreeSet::new();
    for attribute in &object.attributes {
        let path = join(prefix, &attribute.name);

        if !is_valid_name(&attribute.name) {
            violations.push(SchemaViolation {
                path: path.clone(),
                message: "attribute names must be lowercase identifiers".to_string(),
            });
        }
        if !seen.insert(attribute.name.as_str()) {
            violations.push(SchemaViolation {
                path: path.clone(),
                message: "duplicate attribute name".to_string(),
            });
        }
        if !attribute.required && !attribute.optional && !attribute.computed {
            violations.push(SchemaViolation {
                path: path.clone(),
                message: "one of required, optional or computed must be set".to_string(),
            });
        }
        if attribute.required && (attribute.optional || attribute.computed) {
            violations.push(SchemaViolation {
                path: path.clone(),
                message: "required cannot be combined with optional or computed".to_string(),
            });
        }
        if computed_parent && !attribute.is_computed_only() {
            violations.push(SchemaViolation {
                path: path.clone(),
                message: "attributes below a computed-only attribute must be computed-only"
                    .to_string(),
            });
        }

        if let Some(nested) = attribute.attr_type.object() {
            if nested.attributes.is_empty() {
                violations.push(SchemaViolation {
                    path: path.clone(),
                    message: "nested object has no attributes".to_string(),
                });
            }
            check_object(
                nested,
                &path,
                computed_parent || attribute.is_computed_only(),
                violations,
            );
        }
    }
}

fn validate_object(object: &ObjectType, value: &Value, prefix: &str, out: &mut Vec<Diagnostic>) {
    let Some(map) = value.as_object() else {
        return;
    };
    for validator in &object.validators {
        // object-level validators name attributes, not manifest keys
        out.extend(validator.validate(value, if prefix.is_empty() { "." } else { prefix }));
    }
    for attribute in &object.attributes {
        let path = join(prefix, &attribute.name);
        let child = map.get(&attribute.name).unwrap_or(&Value::Null);
        if child.is_null() {
            if attribute.required {
                out.push(
                    Diagnostic::error("Missing required argument")
                        .with_detail(format!("The argument {:?} is required", attribute.name))
                        .with_attribute(path),
                );
            }
            continue;
        }
        for validator in &attribute.validators {
            out.extend(validator.validate(child, &path));
        }
        validate_value(&attribute.attr_type, child, &path, out);
    }
}

fn validate_value(attr_type: &AttrType, value: &Value, path: &str, out: &mut Vec<Diagnostic>) {
    match (attr_type, value) {
        (AttrType::Object(object), _) => validate_object(object, value, path, out),
        (AttrType::List(inner) | AttrType::Set(inner), Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                validate_value(inner, item, &format!("{}[{}]", path, i), out);
            }
        }
        (AttrType::Map(inner), Value::Object(entries)) => {
            for (key, item) in entries {
                validate_value(inner, item, &format!("{}[{:?}]", path, key), out);
            }
        }
        _ => {}
    }
}

fn replace_paths(
    object: &ObjectType,
    prior: &Value,
    planned: &Value,
    prefix: &str,
    out: &mut Vec<String>,
) {
    for attribute in &object.attributes {
        let path = join(prefix, &attribute.name);
        let before = prior.get(&attribute.name).unwrap_or(&Value::Null);
        let after = planned.get(&attribute.name).unwrap_or(&Value::Null);
        if attribute.requires_replace && before != after {
            out.push(path);
        } else if let AttrType::Object(nested) = &attribute.attr_type {
            replace_paths(nested, before, after, &path, out);
        }
    }
}
