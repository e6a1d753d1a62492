//! Type resolver
//!
//! Walks the normalized schema of a kind depth first, following references
//! into the [`SchemaRegistry`]. Every distinct shape is interned once in a
//! [`TypeArena`], keyed by a SHA-256 hash of its structure, so a definition
//! reachable from many kinds (e.g. `ObjectMeta`) becomes one resolved type.
//!
//! A reference back to a definition already on the current path is a cycle.
//! If the path since that definition passes through an optional field, an
//! array or a map, the reference is cut to an opaque type. Otherwise the
//! schema can never be satisfied by a finite value and the kind is
//! reported as unresolvable.

use kubernetes_provider_generator_common::{
    DiscoveredKind, GeneratorError, NameHint, NodeKind, ResolvedField, ResolvedShape,
    ResolvedType, Result, SchemaExtensions, SchemaNode, SchemaRegistry, TypeId,
};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;
use tracing::debug;

use crate::naming::to_pascal_case;

/// Flat arena of resolved types
#[derive(Debug, Clone, Default)]
pub struct TypeArena {
    types: Vec<ResolvedType>,
    by_canonical_id: BTreeMap<String, TypeId>,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TypeId) -> Option<&ResolvedType> {
        self.types.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &ResolvedType)> {
        self.types.iter().enumerate().map(|(i, ty)| (TypeId(i), ty))
    }

    pub fn lookup(&self, canonical_id: &str) -> Option<TypeId> {
        self.by_canonical_id.get(canonical_id).copied()
    }

    pub(crate) fn get_mut(&mut self, id: TypeId) -> Option<&mut ResolvedType> {
        self.types.get_mut(id.0)
    }

    /// Insert a type, or merge its name hints into the structurally equal one
    fn intern(&mut self, mut ty: ResolvedType) -> TypeId {
        ty.canonical_id = self.canonical_id(&ty);
        if let Some(&id) = self.by_canonical_id.get(&ty.canonical_id) {
            let existing = &mut self.types[id.0];
            existing.name_hints.extend(ty.name_hints);
            return id;
        }
        let id = TypeId(self.types.len());
        self.by_canonical_id.insert(ty.canonical_id.clone(), id);
        self.types.push(ty);
        id
    }

    /// Content hash over shape, format, validators and extensions.
    /// Descriptions do not take part, so documentation differences do not
    /// split otherwise identical types.
    fn canonical_id(&self, ty: &ResolvedType) -> String {
        let child = |id: &TypeId| self[*id].canonical_id.clone();
        let shape = match &ty.shape {
            ResolvedShape::Primitive(primitive) => json!({ "primitive": primitive }),
            ResolvedShape::Array(items) => json!({ "array": child(items) }),
            ResolvedShape::Object {
                fields,
                preserve_unknown_fields,
            } => {
                let fields: serde_json::Map<String, serde_json::Value> = fields
                    .iter()
                    .map(|(name, field)| {
                        (
                            name.clone(),
                            json!({
                                "type": child(&field.type_id),
                                "required": field.required,
                                "read_only": field.read_only,
                                "default": field.default_value,
                            }),
                        )
                    })
                    .collect();
                json!({ "object": fields, "preserve": preserve_unknown_fields })
            }
            ResolvedShape::Map(values) => json!({ "map": child(values) }),
            ResolvedShape::OneOf(variants) => {
                json!({ "one_of": variants.iter().map(child).collect::<Vec<_>>() })
            }
            ResolvedShape::Unknown => json!("unknown"),
            ResolvedShape::Opaque => json!("opaque"),
        };
        let document = json!({
            "shape": shape,
            "format": ty.format,
            "validators": ty.validators,
            "extensions": ty.extensions,
            "cyclic": ty.cyclic,
        });
        hex::encode(Sha256::digest(document.to_string().as_bytes()))
    }
}

impl Index<TypeId> for TypeArena {
    type Output = ResolvedType;

    fn index(&self, id: TypeId) -> &ResolvedType {
        &self.types[id.0]
    }
}

/// Resolve the root definition of a kind into the arena
///
/// The kind is resolved into a copy of the arena that replaces it only on
/// success, so a failed kind leaves no types or name hints behind.
pub fn resolve_kind(
    registry: &SchemaRegistry,
    arena: &mut TypeArena,
    kind: &DiscoveredKind,
    max_depth: usize,
) -> Result<TypeId> {
    let mut scratch = arena.clone();
    let mut resolver = Resolver {
        registry,
        arena: &mut scratch,
        max_depth,
        unit: kind.api.to_string(),
        path: Vec::new(),
        edges: Vec::new(),
    };
    let root = resolver.resolve_reference(&kind.root_definition, 0)?;
    *arena = scratch;
    Ok(root)
}

/// A definition currently being resolved
struct Frame {
    definition: String,
    /// Position in `edges` when the definition was entered
    edge_index: usize,
}

struct Resolver<'a> {
    registry: &'a SchemaRegistry,
    arena: &'a mut TypeArena,
    max_depth: usize,
    unit: String,
    path: Vec<Frame>,
    /// For each step of the current path: whether a value must take it
    edges: Vec<bool>,
}

impl Resolver<'_> {
    fn resolve_node(&mut self, node: &SchemaNode, hint: NameHint, depth: usize) -> Result<TypeId> {
        if depth > self.max_depth {
            return Err(GeneratorError::unresolvable(
                &self.unit,
                format!(
                    "no primitive leaf within {} levels of nesting",
                    self.max_depth
                ),
            ));
        }

        let shape = match &node.kind {
            NodeKind::Reference(name) => return self.resolve_reference(name, depth),
            NodeKind::Primitive(primitive) => ResolvedShape::Primitive(*primitive),
            NodeKind::Array => {
                let items = node.items.as_deref().ok_or_else(|| {
                    GeneratorError::malformed(&self.unit, "array schema without items")
                })?;
                ResolvedShape::Array(self.descend(items, hint.clone(), depth, false)?)
            }
            NodeKind::Object => {
                let mut fields = BTreeMap::new();
                for (name, child) in &node.children {
                    let required = node.is_required(name);
                    let type_id = self.descend(child, child_hint(&hint, name), depth, required)?;
                    fields.insert(
                        name.clone(),
                        ResolvedField {
                            type_id,
                            required,
                            default_value: child.default_value.clone(),
                            read_only: child.read_only,
                            description: child.description.clone(),
                        },
                    );
                }
                ResolvedShape::Object {
                    fields,
                    preserve_unknown_fields: node.extensions.preserve_unknown_fields,
                }
            }
            NodeKind::Map => {
                let values = node.additional_properties.as_deref().ok_or_else(|| {
                    GeneratorError::malformed(&self.unit, "map schema without value schema")
                })?;
                ResolvedShape::Map(self.descend(values, hint.clone(), depth, false)?)
            }
            NodeKind::OneOf => {
                let mut variants = Vec::with_capacity(node.variants.len());
                for variant in &node.variants {
                    variants.push(self.descend(variant, hint.clone(), depth, false)?);
                }
                ResolvedShape::OneOf(variants)
            }
            NodeKind::Unknown => ResolvedShape::Unknown,
        };

        let mut name_hints = BTreeSet::new();
        if matches!(shape, ResolvedShape::Object { .. }) {
            name_hints.insert(hint);
        }
        Ok(self.arena.intern(ResolvedType {
            canonical_id: String::new(),
            shape,
            format: node.format.clone(),
            validators: node.validators.clone(),
            extensions: node.extensions.clone(),
            description: node.description.clone(),
            cyclic: false,
            attribute_kind: None,
            name_hints,
        }))
    }

    fn descend(
        &mut self,
        node: &SchemaNode,
        hint: NameHint,
        depth: usize,
        required: bool,
    ) -> Result<TypeId> {
        self.edges.push(required);
        let result = self.resolve_node(node, hint, depth + 1);
        self.edges.pop();
        result
    }

    fn resolve_reference(&mut self, name: &str, depth: usize) -> Result<TypeId> {
        if let Some(frame) = self.path.iter().find(|f| f.definition == name) {
            let escapable = self.edges[frame.edge_index..].iter().any(|required| !required);
            if !escapable {
                return Err(GeneratorError::unresolvable(
                    &self.unit,
                    format!("{} references itself with no optional escape", name),
                ));
            }
            debug!("{}: cutting cyclic reference to {}", self.unit, name);
            return Ok(self.arena.intern(cyclic_opaque()));
        }

        let definition = self.registry.definition(name).ok_or_else(|| {
            GeneratorError::unresolvable(&self.unit, format!("reference to unknown definition {}", name))
        })?;
        self.path.push(Frame {
            definition: name.to_string(),
            edge_index: self.edges.len(),
        });
        let result = self.descend(definition, definition_hint(name), depth, true);
        self.path.pop();
        result
    }
}

/// Stand-in for a cyclic edge: a schema-less JSON value
fn cyclic_opaque() -> ResolvedType {
    ResolvedType {
        canonical_id: String::new(),
        shape: ResolvedShape::Opaque,
        format: None,
        validators: Vec::new(),
        extensions: SchemaExtensions::default(),
        description: None,
        cyclic: true,
        attribute_kind: None,
        name_hints: BTreeSet::new(),
    }
}

/// Name hint for a definition
///
/// OpenAPI names (`io.k8s.api.apps.v1.DeploymentSpec`) use the last segment,
/// qualified by the preceding segments from the nearest one outwards. CRD
/// names (`example.com/v1/Widget`) use the kind, qualified by version then group.
pub fn definition_hint(name: &str) -> NameHint {
    let separator = if name.contains('/') { '/' } else { '.' };
    let mut segments: Vec<&str> = name.split(separator).collect();
    let base = segments.pop().unwrap_or(name);
    let qualifiers = segments.iter().rev().map(|s| s.to_string()).collect();
    NameHint::new(to_pascal_case(base)).with_qualifiers(qualifiers)
}

fn child_hint(parent: &NameHint, field: &str) -> NameHint {
    let base = if field == "metadata" {
        "ObjectMeta".to_string()
    } else {
        format!("{}{}", parent.base, to_pascal_case(field))
    };
    NameHint::new(base).with_qualifiers(parent.qualifiers.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubernetes_provider_generator_common::{ApiIdentity, Scope, SourceFormat};
    use std::path::PathBuf;

    fn object(children: Vec<(&str, SchemaNode)>, required: &[&str]) -> SchemaNode {
        SchemaNode::object(
            children
                .into_iter()
                .map(|(name, node)| (name.to_string(), node))
                .collect(),
            required.iter().copied(),
        )
    }

    fn kind(root: &str) -> DiscoveredKind {
        DiscoveredKind {
            api: ApiIdentity::new("example.com", "v1", "Widget"),
            scope: Scope::Namespaced,
            root_definition: root.to_string(),
            source: PathBuf::from("widget.yaml"),
            format: SourceFormat::OpenApiV2,
            description: None,
            deprecated: false,
        }
    }

    fn registry(definitions: Vec<(&str, SchemaNode)>) -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        for (name, node) in definitions {
            registry.insert_definition(name, node);
        }
        registry
    }

    #[test]
    fn test_optional_self_reference_is_cut() {
        let registry = registry(vec![(
            "example.Node",
            object(
                vec![
                    ("name", SchemaNode::string()),
                    ("child", SchemaNode::reference("example.Node")),
                ],
                &["name"],
            ),
        )]);
        let mut arena = TypeArena::new();
        let root = resolve_kind(&registry, &mut arena, &kind("example.Node"), 64).unwrap();

        let fields = arena[root].fields().unwrap();
        let child = &arena[fields["child"].type_id];
        assert!(child.cyclic);
        assert_eq!(child.shape, ResolvedShape::Opaque);
        assert!(!arena[fields["name"].type_id].cyclic);
    }

    #[test]
    fn test_required_self_reference_is_unresolvable() {
        let registry = registry(vec![(
            "example.Loop",
            object(vec![("next", SchemaNode::reference("example.Loop"))], &["next"]),
        )]);
        let mut arena = TypeArena::new();
        let err = resolve_kind(&registry, &mut arena, &kind("example.Loop"), 64).unwrap_err();
        assert!(matches!(err, GeneratorError::UnresolvableSchema { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_alias_cycle_is_unresolvable() {
        let registry = registry(vec![
            ("example.A", SchemaNode::reference("example.B")),
            ("example.B", SchemaNode::reference("example.A")),
        ]);
        let mut arena = TypeArena::new();
        assert!(resolve_kind(&registry, &mut arena, &kind("example.A"), 64).is_err());
    }

    #[test]
    fn test_list_escapes_cycle() {
        let registry = registry(vec![(
            "example.Tree",
            object(
                vec![(
                    "children",
                    SchemaNode::array(SchemaNode::reference("example.Tree")),
                )],
                &["children"],
            ),
        )]);
        let mut arena = TypeArena::new();
        assert!(resolve_kind(&registry, &mut arena, &kind("example.Tree"), 64).is_ok());
    }

    #[test]
    fn test_dangling_reference() {
        let registry = registry(vec![(
            "example.Widget",
            object(vec![("spec", SchemaNode::reference("example.Missing"))], &[]),
        )]);
        let mut arena = TypeArena::new();
        let err = resolve_kind(&registry, &mut arena, &kind("example.Widget"), 64).unwrap_err();
        assert!(err.to_string().contains("example.Missing"));
    }

    #[test]
    fn test_failed_kind_leaves_arena_untouched() {
        let meta = || object(vec![("name", SchemaNode::string())], &[]);
        let registry = registry(vec![
            ("example.Good", object(vec![("metadata", meta())], &[])),
            (
                "other.Bad",
                object(
                    vec![
                        ("metadata", meta()),
                        ("extra", object(vec![("size", SchemaNode::integer(None))], &[])),
                        ("spec", SchemaNode::reference("example.Missing")),
                    ],
                    &[],
                ),
            ),
        ]);
        let mut arena = TypeArena::new();
        let good = resolve_kind(&registry, &mut arena, &kind("example.Good"), 64).unwrap();
        let meta_id = arena[good].fields().unwrap()["metadata"].type_id;
        let hints = arena[meta_id].name_hints.clone();
        let len = arena.len();

        assert!(resolve_kind(&registry, &mut arena, &kind("other.Bad"), 64).is_err());
        assert_eq!(arena.len(), len);
        assert_eq!(arena[meta_id].name_hints, hints);
    }

    #[test]
    fn test_depth_limit() {
        let mut node = SchemaNode::string();
        for _ in 0..10 {
            node = object(vec![("inner", node)], &[]);
        }
        let registry = registry(vec![("example.Deep", node)]);
        let mut arena = TypeArena::new();
        assert!(resolve_kind(&registry, &mut arena, &kind("example.Deep"), 4).is_err());
        let mut arena = TypeArena::new();
        assert!(resolve_kind(&registry, &mut arena, &kind("example.Deep"), 64).is_ok());
    }

    #[test]
    fn test_structural_dedup() {
        let meta = || object(vec![("name", SchemaNode::string())], &[]);
        let registry = registry(vec![
            (
                "example.A",
                object(vec![("metadata", meta()), ("x", SchemaNode::integer(None))], &[]),
            ),
            (
                "example.B",
                object(vec![("metadata", meta()), ("y", SchemaNode::boolean())], &[]),
            ),
        ]);
        let mut arena = TypeArena::new();
        let a = resolve_kind(&registry, &mut arena, &kind("example.A"), 64).unwrap();
        let b = resolve_kind(&registry, &mut arena, &kind("example.B"), 64).unwrap();
        assert_ne!(a, b);
        assert_eq!(
            arena[a].fields().unwrap()["metadata"].type_id,
            arena[b].fields().unwrap()["metadata"].type_id
        );
    }

    #[test]
    fn test_canonical_ids_are_stable() {
        let build = || {
            let registry = registry(vec![(
                "example.Widget",
                object(
                    vec![
                        ("name", SchemaNode::string()),
                        ("size", SchemaNode::integer(Some("int32"))),
                    ],
                    &["name"],
                ),
            )]);
            let mut arena = TypeArena::new();
            let root = resolve_kind(&registry, &mut arena, &kind("example.Widget"), 64).unwrap();
            arena[root].canonical_id.clone()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_definition_hint() {
        let hint = definition_hint("io.k8s.api.apps.v1.DeploymentSpec");
        assert_eq!(hint.base, "DeploymentSpec");
        assert_eq!(hint.qualifiers[0], "v1");
        assert_eq!(hint.qualifiers[1], "apps");

        let hint = definition_hint("cert-manager.io/v1/Certificate");
        assert_eq!(hint.base, "Certificate");
        assert_eq!(hint.qualifiers, vec!["v1", "cert-manager.io"]);
    }
}
