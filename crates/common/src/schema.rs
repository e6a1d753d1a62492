//! Normalized schema representation
//!
//! Both OpenAPI v2 `definitions` and CRD v1 `openAPIV3Schema` blocks are
//! loaded into [`SchemaNode`] trees. Nodes are immutable once the loader
//! hands them over; cross references between OpenAPI definitions stay as
//! [`NodeKind::Reference`] until the type resolver follows them.

use crate::unit::{ApiIdentity, Scope};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Primitive JSON schema types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    String,
    Integer,
    Number,
    Boolean,
}

/// Structural kind of a schema node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Primitive(PrimitiveType),
    /// Homogeneous array; `items` holds the element schema
    Array,
    /// Object with a fixed property set in `children`
    Object,
    /// Object with `additionalProperties` only; value schema in `additional_properties`
    Map,
    /// Polymorphic node; alternatives in `variants`
    OneOf,
    /// Schema-less or preserve-unknown-fields node
    Unknown,
    /// Reference to a named definition in the [`SchemaRegistry`]
    Reference(String),
}

/// Validation constraint attached to a schema node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidatorSpec {
    Enum(Vec<serde_json::Value>),
    Pattern(String),
    Range {
        min: Option<f64>,
        max: Option<f64>,
        exclusive_min: bool,
        exclusive_max: bool,
    },
    Length {
        min: Option<u64>,
        max: Option<u64>,
    },
    /// Value may not change after creation
    Immutable,
    /// Exactly one of the named sibling properties must be set
    RequiredOneOf(Vec<String>),
    /// A validation keyword with no translation; carried through as a no-op
    Passthrough {
        keyword: String,
        value: serde_json::Value,
    },
}

impl ValidatorSpec {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, ValidatorSpec::Passthrough { .. })
    }
}

/// `x-kubernetes-*` extensions that influence translation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaExtensions {
    pub preserve_unknown_fields: bool,
    pub int_or_string: bool,
    pub embedded_resource: bool,
    pub list_type: Option<String>,
    pub list_map_keys: Vec<String>,
    pub map_type: Option<String>,
}

/// One normalized schema fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    pub kind: NodeKind,
    pub format: Option<String>,
    /// Names of required children
    pub required: BTreeSet<String>,
    /// Object properties, sorted by name
    pub children: BTreeMap<String, SchemaNode>,
    /// Element schema of an array
    pub items: Option<Box<SchemaNode>>,
    /// Value schema of a map
    pub additional_properties: Option<Box<SchemaNode>>,
    /// Alternatives of a oneOf node
    pub variants: Vec<SchemaNode>,
    pub description: Option<String>,
    pub default_value: Option<serde_json::Value>,
    pub read_only: bool,
    pub validators: Vec<ValidatorSpec>,
    pub extensions: SchemaExtensions,
}

impl SchemaNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            format: None,
            required: BTreeSet::new(),
            children: BTreeMap::new(),
            items: None,
            additional_properties: None,
            variants: Vec::new(),
            description: None,
            default_value: None,
            read_only: false,
            validators: Vec::new(),
            extensions: SchemaExtensions::default(),
        }
    }

    pub fn primitive(primitive: PrimitiveType) -> Self {
        Self::new(NodeKind::Primitive(primitive))
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveType::String)
    }

    pub fn integer(format: Option<&str>) -> Self {
        let mut node = Self::primitive(PrimitiveType::Integer);
        node.format = format.map(str::to_string);
        node
    }

    pub fn boolean() -> Self {
        Self::primitive(PrimitiveType::Boolean)
    }

    /// Object with fixed properties
    pub fn object<I, S>(children: BTreeMap<String, SchemaNode>, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut node = Self::new(NodeKind::Object);
        node.children = children;
        node.required = required.into_iter().map(Into::into).collect();
        node
    }

    pub fn array(items: SchemaNode) -> Self {
        let mut node = Self::new(NodeKind::Array);
        node.items = Some(Box::new(items));
        node
    }

    pub fn map(values: SchemaNode) -> Self {
        let mut node = Self::new(NodeKind::Map);
        node.additional_properties = Some(Box::new(values));
        node
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Reference(name.into()))
    }

    pub fn unknown() -> Self {
        Self::new(NodeKind::Unknown)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_validator(mut self, validator: ValidatorSpec) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn is_required(&self, child: &str) -> bool {
        self.required.contains(child)
    }

    /// Check the structural invariants the resolver relies on
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        match self.kind {
            NodeKind::Object
                if self.children.is_empty() && !self.extensions.preserve_unknown_fields =>
            {
                return Err("object node without properties or preserve marker".to_string());
            }
            NodeKind::Array if self.items.is_none() => {
                return Err("array node without items".to_string());
            }
            NodeKind::Map if self.additional_properties.is_none() => {
                return Err("map node without value schema".to_string());
            }
            _ => {}
        }
        for (name, child) in &self.children {
            child
                .check_invariants()
                .map_err(|e| format!("{}: {}", name, e))?;
        }
        if let Some(items) = &self.items {
            items.check_invariants().map_err(|e| format!("items: {}", e))?;
        }
        if let Some(values) = &self.additional_properties {
            values
                .check_invariants()
                .map_err(|e| format!("additionalProperties: {}", e))?;
        }
        Ok(())
    }
}

/// Format a schema document was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    OpenApiV2,
    CrdV1,
}

/// A Kubernetes kind found while loading, before unit planning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredKind {
    pub api: ApiIdentity,
    pub scope: Scope,
    /// Name of the root definition in [`SchemaRegistry::definitions`]
    pub root_definition: String,
    pub source: PathBuf,
    pub format: SourceFormat,
    pub description: Option<String>,
    pub deprecated: bool,
}

/// Every definition and kind loaded from a schema directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaRegistry {
    pub definitions: BTreeMap<String, SchemaNode>,
    pub kinds: BTreeMap<ApiIdentity, DiscoveredKind>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn definition(&self, name: &str) -> Option<&SchemaNode> {
        self.definitions.get(name)
    }

    /// Insert a definition; returns false when a different definition already uses the name
    pub fn insert_definition(&mut self, name: impl Into<String>, node: SchemaNode) -> bool {
        let name = name.into();
        match self.definitions.get(&name) {
            Some(existing) => existing == &node,
            None => {
                self.definitions.insert(name, node);
                true
            }
        }
    }

    /// Insert a kind; returns false when the identity is already taken
    pub fn insert_kind(&mut self, kind: DiscoveredKind) -> bool {
        if self.kinds.contains_key(&kind.api) {
            return false;
        }
        self.kinds.insert(kind.api.clone(), kind);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_invariant() {
        let empty = SchemaNode::new(NodeKind::Object);
        assert!(empty.check_invariants().is_err());

        let mut preserved = SchemaNode::new(NodeKind::Object);
        preserved.extensions.preserve_unknown_fields = true;
        assert!(preserved.check_invariants().is_ok());
    }

    #[test]
    fn test_array_invariant_reports_path() {
        let mut children = BTreeMap::new();
        children.insert("ports".to_string(), SchemaNode::new(NodeKind::Array));
        let node = SchemaNode::object(children, Vec::<String>::new());
        let err = node.check_invariants().unwrap_err();
        assert!(err.starts_with("ports:"), "{}", err);
    }

    #[test]
    fn test_insert_definition_detects_conflicts() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.insert_definition("a", SchemaNode::string()));
        assert!(registry.insert_definition("a", SchemaNode::string()));
        assert!(!registry.insert_definition("a", SchemaNode::boolean()));
        assert_eq!(registry.definition("a"), Some(&SchemaNode::string()));
    }
}
