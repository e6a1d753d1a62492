//! Rendering a plan into the files of a provider crate
//!
//! Rust expressions for schemas, validators and field types are built here
//! and handed to the templates as strings; the templates only lay them out.
//! Every expression mirrors what [`crate::schema_builder`] constructs.

use kubernetes_provider_generator_common::{
    AttributeKind, AttributePlan, Category, GenerationUnit, GeneratorError, Presence, Result,
    ValidatorSpec,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tera::{Context, Tera};

use crate::naming::serde_name;
use crate::planner::{missing_nested, NestedTypePlan, ProviderPlan};
use crate::schema_builder::{
    is_lookup_root, lookup_keys, preserves_unknown_fields, unit_description,
};

/// Rendered files keyed by path relative to the crate root
pub type RenderedFiles = BTreeMap<PathBuf, String>;

/// Module a type expression is emitted into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Site {
    Types,
    Unit,
}

impl Site {
    fn prefix(self) -> &'static str {
        match self {
            Site::Types => "",
            Site::Unit => "types::",
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldView {
    ident: String,
    rust_type: String,
    /// Contents of `#[serde(...)]`, if any
    serde: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct StructView {
    name: String,
    description: Option<String>,
    fields: Vec<FieldView>,
    unknown_fields_ident: String,
}

#[derive(Debug, Serialize)]
struct NestedTypeView {
    model: StructView,
    builder_fn: String,
    attributes: Vec<String>,
    /// Chained calls applied to the `ObjectType`
    modifiers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct UnitView {
    category: Category,
    type_name: String,
    api_version: String,
    kind: String,
    namespaced: bool,
    module: String,
    struct_name: String,
    model_name: String,
    constructor: String,
    description: Option<String>,
    model: StructView,
    attributes: Vec<String>,
    modifiers: Vec<String>,
    /// `&["metadata", "name"]` style path literals
    required_paths: Vec<String>,
    runtime_imports: Vec<&'static str>,
    uses_types: bool,
}

#[derive(Debug, Serialize)]
struct UnitSummary {
    module: String,
    struct_name: String,
    model_name: String,
    constructor: String,
    type_name: String,
    api_version: String,
    kind: String,
    deprecated: bool,
}

#[derive(Debug, Serialize)]
struct CategoryView {
    category: Category,
    dir: &'static str,
    title: &'static str,
    units: Vec<UnitSummary>,
}

#[derive(Debug, Serialize)]
struct ProviderView {
    provider_name: String,
    crate_name: String,
    runtime_dependency: String,
    field_manager: String,
    generator_version: &'static str,
    categories: Vec<CategoryView>,
    shared_types: usize,
}

/// Render every file of the provider crate
pub fn render(tera: &Tera, plan: &ProviderPlan) -> Result<RenderedFiles> {
    let mut files = RenderedFiles::new();
    let provider = provider_view(plan);

    let mut context = Context::new();
    context.insert("provider", &provider);
    files.insert(PathBuf::from("Cargo.toml"), render_template(tera, "Cargo.toml", &context)?);
    files.insert(PathBuf::from("README.md"), render_template(tera, "README.md", &context)?);
    files.insert(PathBuf::from("src/lib.rs"), render_template(tera, "lib.rs", &context)?);

    let types = plan
        .sorted_nested_types()
        .into_iter()
        .map(|nested| nested_type_view(plan, nested))
        .collect::<Result<Vec<_>>>()?;
    let mut context = Context::new();
    context.insert("provider", &provider);
    context.insert("types", &types);
    context.insert("imports", &types_imports(plan));
    files.insert(PathBuf::from("src/types.rs"), render_template(tera, "types.rs", &context)?);

    for category_view in &provider.categories {
        let dir = PathBuf::from("src").join(category_view.dir);
        let mut context = Context::new();
        context.insert("provider", &provider);
        context.insert("category", category_view);
        files.insert(dir.join("mod.rs"), render_template(tera, "category_mod.rs", &context)?);
    }

    for unit in &plan.units {
        let view = unit_view(plan, unit)?;
        let template = match unit.category {
            Category::Resource => "resource.rs",
            Category::DataSource => "data_source.rs",
            Category::Manifest => "manifest.rs",
        };
        let mut context = Context::new();
        context.insert("provider", &provider);
        context.insert("unit", &view);
        let path = PathBuf::from("src")
            .join(unit.category.module_dir())
            .join(format!("{}.rs", unit.identifiers.module));
        files.insert(path, render_template(tera, template, &context)?);
    }

    Ok(files)
}

fn render_template(tera: &Tera, name: &str, context: &Context) -> Result<String> {
    tera.render(name, context)
        .map_err(|e| GeneratorError::Template(format!("{}: {:?}", name, e)))
}

fn provider_view(plan: &ProviderPlan) -> ProviderView {
    let categories = Category::ALL
        .into_iter()
        .filter(|category| plan.config.category_enabled(*category))
        .map(|category| CategoryView {
            category,
            dir: category.module_dir(),
            title: match category {
                Category::Resource => "Resources",
                Category::DataSource => "Data sources",
                Category::Manifest => "Manifest data sources",
            },
            units: plan
                .units_in(category)
                .map(|unit| UnitSummary {
                    module: unit.identifiers.module.clone(),
                    struct_name: unit.identifiers.struct_name.clone(),
                    model_name: unit.identifiers.model_name.clone(),
                    constructor: unit.identifiers.constructor.clone(),
                    type_name: unit.identifiers.type_name.clone(),
                    api_version: unit.api.api_version(),
                    kind: unit.api.kind.clone(),
                    deprecated: unit.deprecated,
                })
                .collect(),
        })
        .collect();

    ProviderView {
        provider_name: plan.config.provider_name.clone(),
        crate_name: plan.config.crate_name.clone(),
        runtime_dependency: plan.config.runtime_dependency.clone(),
        field_manager: plan.config.field_manager.clone(),
        generator_version: env!("CARGO_PKG_VERSION"),
        categories,
        shared_types: plan.report.shared_types,
    }
}

fn nested_type_view(plan: &ProviderPlan, nested: &NestedTypePlan) -> Result<NestedTypeView> {
    let subject = nested.struct_name.as_str();
    let mut fields = Vec::with_capacity(nested.attributes.len());
    let mut attributes = Vec::with_capacity(nested.attributes.len());
    for attribute in &nested.attributes {
        fields.push(field_view(plan, attribute, !attribute.schema_required, Site::Types, subject)?);
        let type_expr = attr_type_expr(plan, &attribute.kind, Site::Types, subject)?;
        attributes.push(attribute_expr(attribute, type_expr, 8));
    }

    let mut modifiers: Vec<String> = nested
        .validators
        .iter()
        .filter_map(validator_expr)
        .map(|v| format!(".with_validator({})", v))
        .collect();
    if nested.preserve_unknown_fields {
        modifiers.push(".with_preserve_unknown_fields()".to_string());
    }

    Ok(NestedTypeView {
        model: StructView {
            name: nested.struct_name.clone(),
            description: nested.description.clone(),
            fields,
            unknown_fields_ident: nested.unknown_fields_ident.clone(),
        },
        builder_fn: nested.builder_fn.clone(),
        attributes,
        modifiers,
    })
}

fn unit_view(plan: &ProviderPlan, unit: &GenerationUnit) -> Result<UnitView> {
    let subject = unit.owner_key();
    let lookup_keys = lookup_keys(unit);

    let mut fields = Vec::with_capacity(unit.attributes.len());
    let mut attributes = Vec::with_capacity(unit.attributes.len());
    for attribute in &unit.attributes {
        let optional = attribute.presence != Presence::Required;
        fields.push(field_view(plan, attribute, optional, Site::Unit, &subject)?);

        let mut type_expr = attr_type_expr(plan, &attribute.kind, Site::Unit, &subject)?;
        if unit.category == Category::DataSource && is_lookup_root(unit, attribute) {
            if let AttributeKind::Nested(id) = &attribute.kind {
                let nested = plan.nested(*id).ok_or_else(|| missing_nested(&subject, *id))?;
                let keys: Vec<String> = lookup_keys.iter().map(|k| format!("{:?}", k)).collect();
                type_expr = format!(
                    "AttrType::Object(types::{}().computed_except(&[{}]))",
                    nested.builder_fn,
                    keys.join(", ")
                );
            }
        }
        attributes.push(attribute_expr(attribute, type_expr, 8));
    }

    let mut modifiers: Vec<String> = unit
        .root_validators
        .iter()
        .filter_map(validator_expr)
        .map(|v| format!(".with_validator({})", v))
        .collect();
    if preserves_unknown_fields(plan, unit) {
        modifiers.push(".with_preserve_unknown_fields()".to_string());
    }

    let required_paths = unit
        .required_paths
        .iter()
        .map(|path| {
            let parts: Vec<String> = path.iter().map(|p| format!("{:?}", p)).collect();
            format!("&[{}]", parts.join(", "))
        })
        .collect();

    let uses_validators = modifiers.iter().any(|m| m.contains("Validator::"))
        || unit.attributes.iter().any(has_runtime_validator);
    let uses_types = unit.attributes.iter().any(|a| a.kind.nested_type().is_some());

    Ok(UnitView {
        category: unit.category,
        type_name: unit.identifiers.type_name.clone(),
        api_version: unit.api.api_version(),
        kind: unit.api.kind.clone(),
        namespaced: unit.scope.is_namespaced(),
        module: unit.identifiers.module.clone(),
        struct_name: unit.identifiers.struct_name.clone(),
        model_name: unit.identifiers.model_name.clone(),
        constructor: unit.identifiers.constructor.clone(),
        description: unit_description(unit),
        model: StructView {
            name: unit.identifiers.model_name.clone(),
            description: Some(format!(
                "Configuration and state of `{}`.",
                unit.identifiers.type_name
            )),
            fields,
            unknown_fields_ident: plan.unknown_fields_ident(unit).to_string(),
        },
        attributes,
        modifiers,
        required_paths,
        runtime_imports: unit_imports(unit.category, uses_validators),
        uses_types,
    })
}

fn unit_imports(category: Category, uses_validators: bool) -> Vec<&'static str> {
    let mut imports = vec!["ops", "AttrType", "Attribute"];
    match category {
        Category::Resource => imports.extend(["KubernetesClient", "ObjectType", "Resource"]),
        Category::DataSource => imports.extend(["DataSource", "KubernetesClient", "ObjectType"]),
        Category::Manifest => imports.extend(["DataSource", "ObjectType"]),
    }
    imports.extend(["ResourceSchema", "Result", "UnitInfo"]);
    if uses_validators {
        imports.push("Validator");
    }
    imports
}

fn types_imports(plan: &ProviderPlan) -> Vec<&'static str> {
    let uses_validators = plan.nested_types.values().any(|nested| {
        nested.attributes.iter().any(has_runtime_validator)
            || nested.validators.iter().any(|v| validator_expr(v).is_some())
    });
    let mut imports = vec!["AttrType", "Attribute", "ObjectType"];
    if uses_validators {
        imports.push("Validator");
    }
    imports
}

fn has_runtime_validator(attribute: &AttributePlan) -> bool {
    attribute.validators.iter().any(|v| validator_expr(v).is_some())
}

fn field_view(
    plan: &ProviderPlan,
    attribute: &AttributePlan,
    optional: bool,
    site: Site,
    subject: &str,
) -> Result<FieldView> {
    let inner = rust_type(plan, &attribute.kind, site, subject)?;
    let mut serde = Vec::new();
    if serde_name(&attribute.rust_ident) != attribute.name {
        serde.push(format!("rename = {:?}", attribute.name));
    }
    let rust_type = if optional {
        serde.push("default".to_string());
        serde.push("skip_serializing_if = \"Option::is_none\"".to_string());
        format!("Option<{}>", inner)
    } else {
        inner
    };

    Ok(FieldView {
        ident: attribute.rust_ident.clone(),
        rust_type,
        serde: (!serde.is_empty()).then(|| serde.join(", ")),
        description: attribute.description.clone(),
    })
}

/// Rust type of a model field holding the kind
fn rust_type(plan: &ProviderPlan, kind: &AttributeKind, site: Site, subject: &str) -> Result<String> {
    Ok(match kind {
        AttributeKind::String | AttributeKind::Opaque => "String".to_string(),
        AttributeKind::IntOrString => "kubernetes_provider_runtime::IntOrString".to_string(),
        AttributeKind::Int32 => "i32".to_string(),
        AttributeKind::Int64 => "i64".to_string(),
        AttributeKind::Float64 => "f64".to_string(),
        AttributeKind::Bool => "bool".to_string(),
        AttributeKind::List(inner) | AttributeKind::Set(inner) => {
            format!("Vec<{}>", rust_type(plan, inner, site, subject)?)
        }
        AttributeKind::Map(inner) => {
            format!("BTreeMap<String, {}>", rust_type(plan, inner, site, subject)?)
        }
        AttributeKind::Nested(id) => {
            let nested = plan.nested(*id).ok_or_else(|| missing_nested(subject, *id))?;
            format!("{}{}", site.prefix(), nested.struct_name)
        }
    })
}

/// Expression constructing the runtime `AttrType` of the kind
fn attr_type_expr(
    plan: &ProviderPlan,
    kind: &AttributeKind,
    site: Site,
    subject: &str,
) -> Result<String> {
    Ok(match kind {
        AttributeKind::String => "AttrType::String".to_string(),
        AttributeKind::Int32 => "AttrType::Int32".to_string(),
        AttributeKind::Int64 => "AttrType::Int64".to_string(),
        AttributeKind::Float64 => "AttrType::Float64".to_string(),
        AttributeKind::Bool => "AttrType::Bool".to_string(),
        AttributeKind::IntOrString => "AttrType::IntOrString".to_string(),
        AttributeKind::Opaque => "AttrType::Json".to_string(),
        AttributeKind::List(inner) => {
            format!("AttrType::list({})", attr_type_expr(plan, inner, site, subject)?)
        }
        AttributeKind::Set(inner) => {
            format!("AttrType::set({})", attr_type_expr(plan, inner, site, subject)?)
        }
        AttributeKind::Map(inner) => {
            format!("AttrType::map({})", attr_type_expr(plan, inner, site, subject)?)
        }
        AttributeKind::Nested(id) => {
            let nested = plan.nested(*id).ok_or_else(|| missing_nested(subject, *id))?;
            format!("AttrType::Object({}{}())", site.prefix(), nested.builder_fn)
        }
    })
}

/// `Attribute::new(..)` chain; continuation lines are indented by `indent + 4`
fn attribute_expr(attribute: &AttributePlan, type_expr: String, indent: usize) -> String {
    let mut calls = Vec::new();
    let head = match &attribute.json_name {
        Some(json_name) => {
            if *json_name != attribute.name {
                calls.push(format!("with_json_name({:?})", json_name));
            }
            format!("Attribute::new({:?}, {})", attribute.name, type_expr)
        }
        None => format!("Attribute::synthetic({:?}, {})", attribute.name, type_expr),
    };
    calls.push(
        match attribute.presence {
            Presence::Required => "required()",
            Presence::Optional => "optional()",
            Presence::OptionalComputed => "optional_computed()",
            Presence::Computed => "computed()",
        }
        .to_string(),
    );
    if attribute.schema_required && attribute.json_name.is_some() {
        calls.push("manifest_required()".to_string());
    }
    for spec in &attribute.validators {
        if *spec == ValidatorSpec::Immutable {
            calls.push("requires_replace()".to_string());
        } else if let Some(validator) = validator_expr(spec) {
            calls.push(format!("with_validator({})", validator));
        }
    }
    if let Some(description) = &attribute.description {
        calls.push(format!("with_description({:?})", description));
    }

    let padding = " ".repeat(indent + 4);
    let mut expr = head;
    for call in calls {
        expr.push('\n');
        expr.push_str(&padding);
        expr.push('.');
        expr.push_str(&call);
    }
    expr
}

/// Expression constructing the runtime validator; `None` for specs with no runtime check
fn validator_expr(spec: &ValidatorSpec) -> Option<String> {
    match spec {
        ValidatorSpec::Enum(values) => {
            let values: Vec<String> = values.iter().map(value_expr).collect();
            Some(format!("Validator::one_of(vec![{}])", values.join(", ")))
        }
        ValidatorSpec::Pattern(pattern) => Some(format!("Validator::regex({:?})", pattern)),
        ValidatorSpec::Range {
            min,
            max,
            exclusive_min,
            exclusive_max,
        } => Some(format!(
            "Validator::Range {{ min: {}, max: {}, exclusive_min: {}, exclusive_max: {} }}",
            option_f64(*min),
            option_f64(*max),
            exclusive_min,
            exclusive_max
        )),
        ValidatorSpec::Length { min, max } => Some(format!(
            "Validator::length({}, {})",
            option_u64(*min),
            option_u64(*max)
        )),
        ValidatorSpec::RequiredOneOf(names) => {
            let names: Vec<String> = names.iter().map(|n| format!("{:?}", n)).collect();
            Some(format!("Validator::required_one_of([{}])", names.join(", ")))
        }
        ValidatorSpec::Immutable | ValidatorSpec::Passthrough { .. } => None,
    }
}

fn option_f64(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("Some({:?}_f64)", v),
        None => "None".to_string(),
    }
}

fn option_u64(value: Option<u64>) -> String {
    match value {
        Some(v) => format!("Some({})", v),
        None => "None".to_string(),
    }
}

/// Expression constructing a `serde_json::Value`
fn value_expr(value: &Value) -> String {
    match value {
        Value::Null => "serde_json::Value::Null".to_string(),
        Value::Bool(b) => format!("serde_json::Value::Bool({})", b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                format!("serde_json::Value::from({}_u64)", u)
            } else if let Some(i) = n.as_i64() {
                format!("serde_json::Value::from({}_i64)", i)
            } else {
                format!("serde_json::Value::from({:?}_f64)", n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => format!("serde_json::Value::String({:?}.to_string())", s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(value_expr).collect();
            format!("serde_json::Value::Array(vec![{}])", items.join(", "))
        }
        Value::Object(map) if map.is_empty() => {
            "serde_json::Value::Object(serde_json::Map::new())".to_string()
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("({:?}.to_string(), {})", k, value_expr(v)))
                .collect();
            format!(
                "serde_json::Value::Object(serde_json::Map::from_iter([{}]))",
                entries.join(", ")
            )
        }
    }
}
