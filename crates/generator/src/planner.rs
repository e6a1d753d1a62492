//! Unit planning
//!
//! Turns a loaded [`SchemaRegistry`] into a [`ProviderPlan`]: one
//! [`GenerationUnit`] per kind and enabled category, plus the nested object
//! types shared between units. All identifiers are reserved through one
//! [`NamingRegistry`] in a fixed order, so planning the same registry twice
//! yields the same names.

use kubernetes_provider_generator_common::{
    ApiIdentity, AttributeKind, AttributePlan, Category, Diagnostic, DiscoveredKind,
    GenerationReport, GenerationUnit, GeneratorConfig, GeneratorError, Presence, ResolvedField,
    ResolvedShape, SchemaRegistry, TypeId, UnitIdentifiers, ValidatorSpec,
};
use kubernetes_provider_runtime::schema::RESERVED_ROOT_NAMES;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::classifier::{self, classify_arena};
use crate::naming::{rust_ident, to_pascal_case, to_snake_case, Claim, NameStyle, NamingRegistry};
use crate::resolver::{resolve_kind, TypeArena};

/// Synthetic Terraform id attribute
pub const ID_ATTRIBUTE: &str = "id";
/// Synthetic rendered-manifest attribute of manifest data sources
pub const YAML_ATTRIBUTE: &str = "yaml";
/// Model field holding manifest keys without an attribute
pub const UNKNOWN_FIELDS_FIELD: &str = "unknown_fields";

/// Names imported into the generated `types` module
const TYPES_MODULE_IMPORTS: &[&str] = &[
    "AttrType",
    "Attribute",
    "BTreeMap",
    "Deserialize",
    "ObjectType",
    "Serialize",
    "Validator",
    "Value",
    // prelude and keywords
    "Box",
    "Default",
    "Option",
    "Result",
    "Self",
    "String",
    "Vec",
];

/// A nested object type emitted once and shared by every unit using it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedTypePlan {
    pub type_id: TypeId,
    pub canonical_id: String,
    pub struct_name: String,
    /// Function returning the runtime `ObjectType`
    pub builder_fn: String,
    pub description: Option<String>,
    pub attributes: Vec<AttributePlan>,
    pub preserve_unknown_fields: bool,
    /// Object-level validators, naming attributes rather than JSON keys
    pub validators: Vec<ValidatorSpec>,
    /// Model field carrying unmodeled keys
    pub unknown_fields_ident: String,
    /// Units (as `group/version/Kind`) that reach the type
    pub users: BTreeSet<String>,
}

impl NestedTypePlan {
    pub fn attribute_by_json_name(&self, json_name: &str) -> Option<&AttributePlan> {
        self.attributes
            .iter()
            .find(|a| a.json_name.as_deref() == Some(json_name))
    }
}

/// Everything the emitter needs for one run
#[derive(Debug, Clone)]
pub struct ProviderPlan {
    pub config: GeneratorConfig,
    pub arena: TypeArena,
    /// Sorted by API identity, then category
    pub units: Vec<GenerationUnit>,
    pub nested_types: BTreeMap<TypeId, NestedTypePlan>,
    /// Per-unit model field carrying unmodeled keys, keyed by owner key
    pub unknown_fields_idents: BTreeMap<String, String>,
    pub report: GenerationReport,
}

impl ProviderPlan {
    pub fn nested(&self, id: TypeId) -> Option<&NestedTypePlan> {
        self.nested_types.get(&id)
    }

    /// Nested types sorted by struct name
    pub fn sorted_nested_types(&self) -> Vec<&NestedTypePlan> {
        let mut types: Vec<_> = self.nested_types.values().collect();
        types.sort_by(|a, b| a.struct_name.cmp(&b.struct_name));
        types
    }

    pub fn units_in(&self, category: Category) -> impl Iterator<Item = &GenerationUnit> {
        self.units.iter().filter(move |u| u.category == category)
    }

    pub fn unknown_fields_ident(&self, unit: &GenerationUnit) -> &str {
        self.unknown_fields_idents
            .get(&unit.owner_key())
            .map(String::as_str)
            .unwrap_or(UNKNOWN_FIELDS_FIELD)
    }
}

/// Plan every unit of the registry
///
/// Kinds that fail to resolve are reported in `report.skipped` and do not
/// affect the remaining kinds.
pub fn plan(
    registry: &SchemaRegistry,
    config: &GeneratorConfig,
) -> ProviderPlan {
    let mut report = GenerationReport::default();
    let mut arena = TypeArena::new();
    let mut roots: Vec<(&DiscoveredKind, TypeId)> = Vec::new();

    for kind in registry.kinds.values() {
        if !config.includes_group(&kind.api.group) {
            debug!("Skipping {} (group filtered)", kind.api);
            continue;
        }
        match resolve_kind(registry, &mut arena, kind, config.max_depth) {
            Ok(root) if arena[root].fields().is_some_and(|f| !f.is_empty()) => {
                roots.push((kind, root));
            }
            Ok(_) => {
                warn!("Skipping {}: root schema is not an object", kind.api);
                report.push(Diagnostic::error(
                    kind.api.to_string(),
                    "root schema is not an object with properties",
                ));
            }
            Err(e) => {
                warn!("Skipping {}: {}", kind.api, e);
                report.push(Diagnostic::error(kind.api.to_string(), e.to_string()));
            }
        }
    }

    classify_arena(&mut arena);

    let mut planner = Planner {
        config,
        arena: &arena,
        naming: NamingRegistry::new(),
        stems: BTreeMap::new(),
        nested_types: BTreeMap::new(),
        unknown_fields_idents: BTreeMap::new(),
        warnings: Vec::new(),
    };
    planner.reserve_stems(&roots);
    planner.plan_nested_types(&roots);

    let mut units = Vec::new();
    for (kind, root) in &roots {
        for category in Category::ALL {
            if config.category_enabled(category) {
                units.push(planner.plan_unit(kind, *root, category));
            }
        }
    }

    for unit in &units {
        report.generated.push(unit.identifiers.type_name.clone());
    }
    for warning in std::mem::take(&mut planner.warnings) {
        report.push(warning);
    }
    report.shared_types = planner
        .nested_types
        .values()
        .filter(|t| t.users.len() > 1)
        .count();
    report.normalize();

    info!(
        "Planned {} units over {} kinds with {} nested types ({} shared)",
        units.len(),
        roots.len(),
        planner.nested_types.len(),
        report.shared_types
    );

    let nested_types = planner.nested_types;
    let unknown_fields_idents = planner.unknown_fields_idents;
    ProviderPlan {
        config: config.clone(),
        arena,
        units,
        nested_types,
        unknown_fields_idents,
        report,
    }
}

struct Planner<'a> {
    config: &'a GeneratorConfig,
    arena: &'a TypeArena,
    naming: NamingRegistry,
    /// Unit stem per `group/version/Kind`
    stems: BTreeMap<String, String>,
    nested_types: BTreeMap<TypeId, NestedTypePlan>,
    unknown_fields_idents: BTreeMap<String, String>,
    warnings: Vec<Diagnostic>,
}

impl Planner<'_> {
    /// Settle the stem (`apps_deployment_v1`) of every kind
    ///
    /// Kinds whose groups normalize to the same stem are all qualified with
    /// their escaped group path.
    fn reserve_stems(&mut self, roots: &[(&DiscoveredKind, TypeId)]) {
        let claims: Vec<Claim> = roots
            .iter()
            .map(|(kind, _)| {
                Claim::new(
                    kind.api.to_string(),
                    unit_stem(&kind.api),
                    vec![escape_group(&kind.api.group)],
                )
            })
            .collect();
        self.stems = self.naming.reserve_claims("stems", &claims, NameStyle::Snake);
    }

    /// Collect, name and describe every nested object type reachable from a root
    fn plan_nested_types(&mut self, roots: &[(&DiscoveredKind, TypeId)]) {
        let mut users: BTreeMap<TypeId, BTreeSet<String>> = BTreeMap::new();
        for (kind, root) in roots {
            let mut pending: Vec<TypeId> = self
                .root_fields(*root)
                .filter_map(|(_, type_id)| self.kind_of(type_id).nested_type())
                .collect();
            while let Some(id) = pending.pop() {
                let entry = users.entry(id).or_default();
                if !entry.insert(kind.api.to_string()) {
                    continue;
                }
                if let Some(fields) = self.arena[id].fields() {
                    pending.extend(
                        fields
                            .values()
                            .filter_map(|f| self.kind_of(f.type_id).nested_type()),
                    );
                }
            }
        }

        self.naming.block("types", TYPES_MODULE_IMPORTS.iter().copied());

        let mut ordered: Vec<TypeId> = users.keys().copied().collect();
        ordered.sort_by(|a, b| {
            let (a, b) = (&self.arena[*a], &self.arena[*b]);
            (a.preferred_hint(), &a.canonical_id).cmp(&(b.preferred_hint(), &b.canonical_id))
        });

        let arena = self.arena;
        let claims: Vec<Claim> = ordered
            .iter()
            .map(|id| {
                let ty = &arena[*id];
                match ty.preferred_hint() {
                    Some(hint) => Claim::new(&ty.canonical_id, &hint.base, hint.qualifiers.clone()),
                    None => Claim::new(&ty.canonical_id, "Object", Vec::new()),
                }
            })
            .collect();
        let mut struct_names = self.naming.reserve_claims("types", &claims, NameStyle::Pascal);

        for id in ordered {
            let ty = &arena[id];
            let struct_name = struct_names
                .remove(&ty.canonical_id)
                .unwrap_or_else(|| format!("Object{}", id.0));
            let builder_fn = self.naming.reserve(
                "type_fns",
                &format!("{}_type", to_snake_case(&struct_name)),
                &ty.canonical_id,
            );

            let type_users = users.remove(&id).unwrap_or_default();
            let subject = type_users
                .iter()
                .next()
                .cloned()
                .unwrap_or_else(|| struct_name.clone());
            let scope = format!("fields:{}", ty.canonical_id);
            let mut attributes = Vec::new();
            for (json_name, field) in ty.fields().into_iter().flatten() {
                attributes.push(self.field_plan(&scope, field, json_name, None, &subject));
            }
            let unknown_fields_ident =
                self.naming
                    .reserve(&scope, UNKNOWN_FIELDS_FIELD, "__unknown_fields");
            let validators = object_validators(&ty.validators, &attributes);
            let preserve_unknown_fields = matches!(
                ty.shape,
                ResolvedShape::Object {
                    preserve_unknown_fields: true,
                    ..
                }
            );

            self.nested_types.insert(
                id,
                NestedTypePlan {
                    type_id: id,
                    canonical_id: ty.canonical_id.clone(),
                    struct_name,
                    builder_fn,
                    description: ty.description.clone(),
                    attributes,
                    preserve_unknown_fields,
                    validators,
                    unknown_fields_ident,
                    users: type_users,
                },
            );
        }
    }

    fn plan_unit(&mut self, kind: &DiscoveredKind, root: TypeId, category: Category) -> GenerationUnit {
        let identifiers = self.unit_identifiers(&kind.api, category);
        let owner = format!("{}/{}", kind.api, category);
        let subject = kind.api.to_string();
        let scope = format!("fields:{}", owner);
        self.naming.block(&scope, RESERVED_ROOT_NAMES.iter().copied());

        let mut attributes = vec![synthetic(
            self.naming.reserve(&scope, ID_ATTRIBUTE, "__id"),
            "Terraform identifier: `namespace/name` for namespaced objects, `name` otherwise.",
        )];
        if category == Category::Manifest {
            attributes.push(synthetic(
                self.naming.reserve(&scope, YAML_ATTRIBUTE, "__yaml"),
                "The manifest rendered as YAML.",
            ));
        }

        let arena = self.arena;
        for (json_name, field) in arena[root].fields().into_iter().flatten() {
            if is_type_header(json_name) {
                continue;
            }
            let presence = self.root_presence(field, json_name, category);
            attributes.push(self.field_plan(&scope, field, json_name, Some(presence), &subject));
        }
        let unknown_fields_ident = self
            .naming
            .reserve(&scope, UNKNOWN_FIELDS_FIELD, "__unknown_fields");
        self.unknown_fields_idents
            .insert(owner.clone(), unknown_fields_ident);

        let required_paths = self.lookup_paths(kind, &attributes);
        let root_validators = if category == Category::DataSource {
            Vec::new()
        } else {
            object_validators(&self.arena[root].validators, &attributes)
        };

        GenerationUnit {
            api: kind.api.clone(),
            scope: kind.scope,
            category,
            root_type: root,
            identifiers,
            description: kind
                .description
                .clone()
                .or_else(|| self.arena[root].description.clone()),
            deprecated: kind.deprecated,
            attributes,
            required_paths,
            root_validators,
        }
    }

    /// Reserve the identifiers of a unit, derived from its settled stem
    fn unit_identifiers(&mut self, api: &ApiIdentity, category: Category) -> UnitIdentifiers {
        let owner = format!("{}/{}", api, category);
        let stem = self
            .stems
            .get(&api.to_string())
            .cloned()
            .unwrap_or_else(|| unit_stem(api));

        let mut type_name = format!("{}_{}", self.config.provider_name, stem);
        if category == Category::Manifest {
            type_name.push_str("_manifest");
        }
        let type_name = self.naming.reserve(
            &format!("type_names:{}", category.type_name_scope()),
            &type_name,
            &owner,
        );
        let module = self
            .naming
            .reserve(&format!("modules:{}", category.module_dir()), &stem, &owner);
        let struct_name = self.naming.reserve(
            "units",
            &format!("{}{}", to_pascal_case(&stem), to_pascal_case(category.suffix())),
            &owner,
        );
        let model_name = self
            .naming
            .reserve("units", &format!("{}Model", struct_name), &owner);
        let constructor = self.naming.reserve(
            "constructors",
            &format!("new_{}_{}", stem, category.suffix()),
            &owner,
        );

        UnitIdentifiers {
            module,
            struct_name,
            model_name,
            constructor,
            type_name,
        }
    }

    fn root_presence(&self, field: &ResolvedField, json_name: &str, category: Category) -> Presence {
        match (category, json_name) {
            (_, "metadata") => Presence::Required,
            (Category::DataSource, _) => Presence::Computed,
            (_, "status") => Presence::Computed,
            _ => classifier::presence(field, &self.arena[field.type_id], self.config.default_policy),
        }
    }

    /// Plan one field of an object; `presence` overrides the classifier
    fn field_plan(
        &mut self,
        scope: &str,
        field: &ResolvedField,
        json_name: &str,
        presence: Option<Presence>,
        subject: &str,
    ) -> AttributePlan {
        let arena = self.arena;
        let name = self
            .naming
            .reserve_qualified(
                scope,
                &to_snake_case(json_name),
                &["field".to_string()],
                NameStyle::Snake,
                json_name,
            )
            .into_name();
        let kind = self.kind_of(field.type_id);
        let field_type = &arena[field.type_id];
        let validators =
            classifier::field_validators(field_type, &kind, subject, json_name, &mut self.warnings);

        AttributePlan {
            rust_ident: rust_ident(&name),
            name,
            json_name: Some(json_name.to_string()),
            presence: presence.unwrap_or_else(|| {
                classifier::presence(field, field_type, self.config.default_policy)
            }),
            schema_required: classifier::schema_required(field),
            description: field
                .description
                .clone()
                .or_else(|| field_type.description.clone()),
            kind,
            validators,
        }
    }

    /// `metadata.name`, plus `metadata.namespace` for namespaced kinds
    fn lookup_paths(&self, kind: &DiscoveredKind, attributes: &[AttributePlan]) -> Vec<Vec<String>> {
        let Some(metadata) = attributes
            .iter()
            .find(|a| a.json_name.as_deref() == Some("metadata"))
        else {
            return Vec::new();
        };
        let Some(meta_type) = metadata.kind.nested_type().and_then(|id| self.nested_types.get(&id))
        else {
            return Vec::new();
        };

        let mut keys = vec!["name"];
        if kind.scope.is_namespaced() {
            keys.push("namespace");
        }
        keys.into_iter()
            .filter_map(|key| meta_type.attribute_by_json_name(key))
            .map(|attribute| vec![metadata.name.clone(), attribute.name.clone()])
            .collect()
    }

    fn kind_of(&self, id: TypeId) -> AttributeKind {
        self.arena[id]
            .attribute_kind
            .clone()
            .unwrap_or_else(|| classifier::attribute_kind(self.arena, id))
    }

    /// Root fields that become attributes; `apiVersion` and `kind` are fixed per unit
    fn root_fields(&self, root: TypeId) -> impl Iterator<Item = (&str, TypeId)> + '_ {
        self.arena[root]
            .fields()
            .into_iter()
            .flatten()
            .filter(|(name, _)| !is_type_header(name))
            .map(|(name, field)| (name.as_str(), field.type_id))
    }
}

fn is_type_header(json_name: &str) -> bool {
    matches!(json_name, "apiVersion" | "kind")
}

fn synthetic(name: String, description: &str) -> AttributePlan {
    AttributePlan {
        rust_ident: rust_ident(&name),
        name,
        json_name: None,
        kind: AttributeKind::String,
        presence: Presence::Computed,
        schema_required: false,
        description: Some(description.to_string()),
        validators: Vec::new(),
    }
}

/// Object-level validators with JSON names translated to attribute names
fn object_validators(validators: &[ValidatorSpec], attributes: &[AttributePlan]) -> Vec<ValidatorSpec> {
    validators
        .iter()
        .filter_map(|validator| match validator {
            ValidatorSpec::RequiredOneOf(json_names) => {
                let names: Vec<String> = json_names
                    .iter()
                    .filter_map(|json_name| {
                        attributes
                            .iter()
                            .find(|a| a.json_name.as_deref() == Some(json_name.as_str()))
                            .map(|a| a.name.clone())
                    })
                    .collect();
                (names.len() > 1).then_some(ValidatorSpec::RequiredOneOf(names))
            }
            _ => None,
        })
        .collect()
}

/// `apps/v1 Deployment` → `apps_deployment_v1`; the core group is omitted
pub fn unit_stem(api: &ApiIdentity) -> String {
    let mut parts = Vec::new();
    if !api.is_core() {
        parts.push(to_snake_case(&api.group));
    }
    parts.push(to_snake_case(&api.kind));
    parts.push(to_snake_case(&api.version));
    parts.join("_")
}

/// Group path with separators spelled out, so `a-b.io` and `a.b.io` differ
fn escape_group(group: &str) -> String {
    if group.is_empty() {
        return "core".to_string();
    }
    group.replace('.', "_dot_").replace('-', "_dash_")
}

/// Error for a unit the emitter cannot find a nested type for
pub(crate) fn missing_nested(unit: &str, id: TypeId) -> GeneratorError {
    GeneratorError::Generation(format!("{}: nested type {:?} was not planned", unit, id))
}
