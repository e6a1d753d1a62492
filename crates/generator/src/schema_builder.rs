//! Runtime schemas built straight from a plan
//!
//! Mirrors what the emitted `schema()` functions construct, so a plan can
//! be checked with [`ResourceSchema::validate_implementation`] without
//! compiling the generated crate.

use kubernetes_provider_generator_common::{
    AttributeKind, AttributePlan, Category, GenerationUnit, Presence, ResolvedShape, Result,
    ValidatorSpec,
};
use kubernetes_provider_runtime::{AttrType, Attribute, ObjectType, ResourceSchema, Validator};

use crate::planner::{missing_nested, ProviderPlan};

/// Build the runtime schema of one unit
pub fn build_schema(plan: &ProviderPlan, unit: &GenerationUnit) -> Result<ResourceSchema> {
    let subject = unit.owner_key();
    let lookup_keys = lookup_keys(unit);

    let mut attributes = Vec::with_capacity(unit.attributes.len());
    for plan_attribute in &unit.attributes {
        let mut attr_type = attr_type(plan, &plan_attribute.kind, &subject)?;
        if unit.category == Category::DataSource && is_lookup_root(unit, plan_attribute) {
            if let AttrType::Object(object) = attr_type {
                attr_type = AttrType::Object(object.computed_except(&lookup_keys));
            }
        }
        attributes.push(attribute(plan_attribute, attr_type));
    }

    let mut block = ObjectType::new(attributes);
    for validator in unit.root_validators.iter().filter_map(validator) {
        block = block.with_validator(validator);
    }
    if preserves_unknown_fields(plan, unit) {
        block = block.with_preserve_unknown_fields();
    }
    for path in &unit.required_paths {
        block.require_path(path.as_slice());
    }

    let mut schema = ResourceSchema::new(&unit.identifiers.type_name, block);
    if let Some(description) = unit_description(unit) {
        schema = schema.with_description(description);
    }
    Ok(schema)
}

/// Runtime type of an attribute kind
pub fn attr_type(plan: &ProviderPlan, kind: &AttributeKind, subject: &str) -> Result<AttrType> {
    Ok(match kind {
        AttributeKind::String => AttrType::String,
        AttributeKind::Int32 => AttrType::Int32,
        AttributeKind::Int64 => AttrType::Int64,
        AttributeKind::Float64 => AttrType::Float64,
        AttributeKind::Bool => AttrType::Bool,
        AttributeKind::IntOrString => AttrType::IntOrString,
        AttributeKind::Opaque => AttrType::Json,
        AttributeKind::List(inner) => AttrType::list(attr_type(plan, inner, subject)?),
        AttributeKind::Set(inner) => AttrType::set(attr_type(plan, inner, subject)?),
        AttributeKind::Map(inner) => AttrType::map(attr_type(plan, inner, subject)?),
        AttributeKind::Nested(id) => {
            let nested = plan.nested(*id).ok_or_else(|| missing_nested(subject, *id))?;
            let mut attributes = Vec::with_capacity(nested.attributes.len());
            for plan_attribute in &nested.attributes {
                let attr_type = attr_type(plan, &plan_attribute.kind, subject)?;
                attributes.push(attribute(plan_attribute, attr_type));
            }
            let mut object = ObjectType::new(attributes);
            if nested.preserve_unknown_fields {
                object = object.with_preserve_unknown_fields();
            }
            for validator in nested.validators.iter().filter_map(validator) {
                object = object.with_validator(validator);
            }
            AttrType::Object(object)
        }
    })
}

fn attribute(plan_attribute: &AttributePlan, attr_type: AttrType) -> Attribute {
    let mut attribute = match &plan_attribute.json_name {
        Some(json_name) => Attribute::new(&plan_attribute.name, attr_type).with_json_name(json_name),
        None => Attribute::synthetic(&plan_attribute.name, attr_type),
    };
    attribute = match plan_attribute.presence {
        Presence::Required => attribute.required(),
        Presence::Optional => attribute.optional(),
        Presence::OptionalComputed => attribute.optional_computed(),
        Presence::Computed => attribute.computed(),
    };
    if plan_attribute.schema_required && plan_attribute.json_name.is_some() {
        attribute = attribute.manifest_required();
    }
    for spec in &plan_attribute.validators {
        if *spec == ValidatorSpec::Immutable {
            attribute = attribute.requires_replace();
        } else if let Some(validator) = validator(spec) {
            attribute = attribute.with_validator(validator);
        }
    }
    if let Some(description) = &plan_attribute.description {
        attribute = attribute.with_description(description);
    }
    attribute
}

/// Runtime validator for a spec; `None` for specs with no runtime check
pub fn validator(spec: &ValidatorSpec) -> Option<Validator> {
    match spec {
        ValidatorSpec::Enum(values) => Some(Validator::one_of(values.clone())),
        ValidatorSpec::Pattern(pattern) => Some(Validator::regex(pattern)),
        ValidatorSpec::Range {
            min,
            max,
            exclusive_min,
            exclusive_max,
        } => Some(Validator::Range {
            min: *min,
            max: *max,
            exclusive_min: *exclusive_min,
            exclusive_max: *exclusive_max,
        }),
        ValidatorSpec::Length { min, max } => Some(Validator::length(*min, *max)),
        ValidatorSpec::RequiredOneOf(names) => Some(Validator::required_one_of(names.clone())),
        ValidatorSpec::Immutable | ValidatorSpec::Passthrough { .. } => None,
    }
}

/// Attribute names a data source is looked up by (`name`, `namespace`)
pub fn lookup_keys(unit: &GenerationUnit) -> Vec<&str> {
    unit.required_paths
        .iter()
        .filter_map(|path| path.get(1))
        .map(String::as_str)
        .collect()
}

/// Whether the attribute holds the lookup keys of a data source
pub fn is_lookup_root(unit: &GenerationUnit, attribute: &AttributePlan) -> bool {
    unit.required_paths
        .iter()
        .any(|path| path.first() == Some(&attribute.name))
}

pub fn preserves_unknown_fields(plan: &ProviderPlan, unit: &GenerationUnit) -> bool {
    plan.arena.get(unit.root_type).is_some_and(|root| {
        matches!(
            root.shape,
            ResolvedShape::Object {
                preserve_unknown_fields: true,
                ..
            }
        )
    })
}

/// Unit description with the deprecation notice of OpenAPI kinds
pub fn unit_description(unit: &GenerationUnit) -> Option<String> {
    let description = unit.description.clone();
    if unit.deprecated {
        let notice = "This API version is deprecated.";
        return Some(match description {
            Some(text) if text.to_lowercase().contains("deprecated") => text,
            Some(text) => format!("{}\n\n{}", text, notice),
            None => notice.to_string(),
        });
    }
    description
}
