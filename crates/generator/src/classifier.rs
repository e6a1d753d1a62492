//! Attribute classifier
//!
//! Decides the Terraform attribute kind of every resolved type and the
//! presence (required / optional / computed) of every object field.

use kubernetes_provider_generator_common::{
    AttributeKind, DefaultPolicy, Diagnostic, PrimitiveType, Presence, ResolvedField,
    ResolvedShape, ResolvedType, TypeId, ValidatorSpec,
};
use tracing::{debug, warn};

use crate::resolver::TypeArena;

/// Fill in [`ResolvedType::attribute_kind`] for every type in the arena
pub fn classify_arena(arena: &mut TypeArena) {
    for index in 0..arena.len() {
        let id = TypeId(index);
        let kind = attribute_kind(arena, id);
        if let Some(ty) = arena.get_mut(id) {
            ty.attribute_kind = Some(kind);
        }
    }
}

/// Terraform attribute kind of a resolved type
pub fn attribute_kind(arena: &TypeArena, id: TypeId) -> AttributeKind {
    let ty = &arena[id];
    if ty.cyclic || ty.extensions.embedded_resource {
        return AttributeKind::Opaque;
    }
    match &ty.shape {
        ResolvedShape::Primitive(PrimitiveType::String) if ty.extensions.int_or_string => {
            AttributeKind::IntOrString
        }
        ResolvedShape::Primitive(PrimitiveType::String) => AttributeKind::String,
        ResolvedShape::Primitive(PrimitiveType::Boolean) => AttributeKind::Bool,
        ResolvedShape::Primitive(PrimitiveType::Integer) => match ty.format.as_deref() {
            Some("int32") => AttributeKind::Int32,
            _ => AttributeKind::Int64,
        },
        ResolvedShape::Primitive(PrimitiveType::Number) => number_kind(ty),
        ResolvedShape::Array(items) => {
            let element = Box::new(attribute_kind(arena, *items));
            if ty.extensions.list_type.as_deref() == Some("set") {
                AttributeKind::Set(element)
            } else {
                AttributeKind::List(element)
            }
        }
        ResolvedShape::Object { fields, .. } if fields.is_empty() => AttributeKind::Opaque,
        ResolvedShape::Object { .. } => AttributeKind::Nested(id),
        ResolvedShape::Map(values) => AttributeKind::Map(Box::new(attribute_kind(arena, *values))),
        // no discriminator to split on
        ResolvedShape::OneOf(_) => AttributeKind::Opaque,
        ResolvedShape::Unknown | ResolvedShape::Opaque => AttributeKind::Opaque,
    }
}

fn number_kind(ty: &ResolvedType) -> AttributeKind {
    match ty.format.as_deref() {
        Some("int32") => AttributeKind::Int32,
        Some("int64") => AttributeKind::Int64,
        Some("float") | Some("double") => AttributeKind::Float64,
        _ if integer_step(ty).is_some() => AttributeKind::Int64,
        _ => AttributeKind::Float64,
    }
}

/// Whole `multipleOf` step that turns an unformatted number into an integer
fn integer_step(ty: &ResolvedType) -> Option<f64> {
    if !matches!(ty.shape, ResolvedShape::Primitive(PrimitiveType::Number)) || ty.format.is_some() {
        return None;
    }
    ty.validators.iter().find_map(|v| match v {
        ValidatorSpec::Passthrough { keyword, value } if keyword == "multipleOf" => value
            .as_f64()
            .filter(|step| *step != 0.0 && step.fract() == 0.0),
        _ => None,
    })
}

/// Presence of an object field of type `ty`
///
/// Read-only fields are computed. A collapsed `oneOf` is optional+computed,
/// since the server may fill in any of its variants. A required field
/// without a default is required. A default makes the field
/// optional+computed, or plain optional under [`DefaultPolicy::OptionalOnly`].
pub fn presence(field: &ResolvedField, ty: &ResolvedType, policy: DefaultPolicy) -> Presence {
    if field.read_only {
        Presence::Computed
    } else if matches!(ty.shape, ResolvedShape::OneOf(_)) {
        Presence::OptionalComputed
    } else if field.default_value.is_some() {
        match policy {
            DefaultPolicy::ComputedOverridesOptional => Presence::OptionalComputed,
            DefaultPolicy::OptionalOnly => Presence::Optional,
        }
    } else if field.required {
        Presence::Required
    } else {
        Presence::Optional
    }
}

/// Whether the schema guarantees the field in every manifest
pub fn schema_required(field: &ResolvedField) -> bool {
    field.required && field.default_value.is_none()
}

/// Validators attached to a field of the given kind
///
/// Passthrough validators are dropped from the output and reported as
/// warnings against `subject`. Value checks on opaque JSON strings are
/// not meaningful and are left out.
pub fn field_validators(
    ty: &ResolvedType,
    kind: &AttributeKind,
    subject: &str,
    path: &str,
    warnings: &mut Vec<Diagnostic>,
) -> Vec<ValidatorSpec> {
    let mut validators = Vec::new();
    for validator in &ty.validators {
        match validator {
            ValidatorSpec::Passthrough { keyword, .. }
                if keyword == "multipleOf" && integer_step(ty).is_some() =>
            {
                // a step of 1 is exactly the integer type
                if integer_step(ty) != Some(1.0) {
                    warnings.push(Diagnostic::warning(
                        subject,
                        format!(
                            "validation keyword \"multipleOf\" at {} is enforced only as an integer type",
                            path
                        ),
                    ));
                }
            }
            ValidatorSpec::Passthrough { keyword, .. } => {
                warn!("{}: {} has untranslated validation {:?}", subject, path, keyword);
                warnings.push(Diagnostic::warning(
                    subject,
                    format!(
                        "validation keyword {:?} at {} has no translation and is not enforced",
                        keyword, path
                    ),
                ));
            }
            ValidatorSpec::RequiredOneOf(_) => {
                // object-level; attached to the nested type itself
            }
            _ if *kind == AttributeKind::Opaque => {
                debug!("{}: skipping {:?} on opaque attribute {}", subject, validator, path);
            }
            _ => validators.push(validator.clone()),
        }
    }
    validators
}
