//! Resolved type graph
//!
//! The resolver turns [`SchemaNode`](crate::SchemaNode) trees into a flat
//! arena of [`ResolvedType`]s addressed by [`TypeId`]. References are
//! followed, cycles are cut to an opaque marker and structurally identical
//! shapes share one entry.

use crate::schema::{PrimitiveType, SchemaExtensions, ValidatorSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Index into the resolved type arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId(pub usize);

/// A property of a resolved object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedField {
    pub type_id: TypeId,
    pub required: bool,
    pub default_value: Option<serde_json::Value>,
    pub read_only: bool,
    pub description: Option<String>,
}

/// Shape of a resolved type; children point into the arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolvedShape {
    Primitive(PrimitiveType),
    Array(TypeId),
    Object {
        fields: BTreeMap<String, ResolvedField>,
        preserve_unknown_fields: bool,
    },
    Map(TypeId),
    OneOf(Vec<TypeId>),
    Unknown,
    /// Cut point of a cyclic reference
    Opaque,
}

/// Candidate name for an emitted nested type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NameHint {
    pub base: String,
    /// Progressively more specific suffixes used on collision
    pub qualifiers: Vec<String>,
}

impl NameHint {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            qualifiers: Vec::new(),
        }
    }

    pub fn with_qualifiers(mut self, qualifiers: Vec<String>) -> Self {
        self.qualifiers = qualifiers;
        self
    }
}

/// Terraform-level classification of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    String,
    Int32,
    Int64,
    Float64,
    Bool,
    /// `x-kubernetes-int-or-string`, keeping whichever JSON type the manifest used
    IntOrString,
    /// Raw JSON held in a string attribute
    Opaque,
    List(Box<AttributeKind>),
    Set(Box<AttributeKind>),
    Map(Box<AttributeKind>),
    Nested(TypeId),
}

impl AttributeKind {
    /// The nested object type this kind ultimately contains, if any
    pub fn nested_type(&self) -> Option<TypeId> {
        match self {
            AttributeKind::Nested(id) => Some(*id),
            AttributeKind::List(inner) | AttributeKind::Set(inner) | AttributeKind::Map(inner) => {
                inner.nested_type()
            }
            _ => None,
        }
    }
}

/// Required / optional / computed status of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Presence {
    Required,
    Optional,
    /// Optional with a server or schema supplied value
    OptionalComputed,
    Computed,
}

impl Presence {
    pub fn is_required(self) -> bool {
        self == Presence::Required
    }

    pub fn is_computed(self) -> bool {
        matches!(self, Presence::Computed | Presence::OptionalComputed)
    }
}

/// One distinct reachable schema shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedType {
    /// Content hash of the shape; stable across runs
    pub canonical_id: String,
    pub shape: ResolvedShape,
    pub format: Option<String>,
    pub validators: Vec<ValidatorSpec>,
    pub extensions: SchemaExtensions,
    pub description: Option<String>,
    /// True for the opaque stand-in of a self-referencing edge
    pub cyclic: bool,
    /// Filled in by the attribute classifier
    pub attribute_kind: Option<AttributeKind>,
    pub name_hints: BTreeSet<NameHint>,
}

impl ResolvedType {
    pub fn is_object(&self) -> bool {
        matches!(self.shape, ResolvedShape::Object { .. })
    }

    pub fn fields(&self) -> Option<&BTreeMap<String, ResolvedField>> {
        match &self.shape {
            ResolvedShape::Object { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Preferred name hint: the smallest one, so the choice does not depend on visit order
    pub fn preferred_hint(&self) -> Option<&NameHint> {
        self.name_hints.iter().next()
    }
}
