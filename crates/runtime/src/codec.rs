//! Manifest codec
//!
//! Maps Kubernetes manifests to Terraform-shaped values and back. Manifest
//! objects are keyed by JSON names (`storageClassName`); state values are
//! keyed by attribute names (`storage_class_name`). Keys the schema does not
//! model are moved to [`UNKNOWN_FIELDS_KEY`] on decode and merged back on
//! encode, so `encode(decode(m))` equals `m` up to key order.

use crate::error::DecodeError;
use crate::manifest::ManifestDocument;
use crate::schema::{AttrType, ObjectType, ResourceSchema};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Side channel holding manifest keys without a matching attribute
pub const UNKNOWN_FIELDS_KEY: &str = "__unknown_fields";

/// Decode a manifest body into a state object
pub fn decode_object(
    object: &ObjectType,
    value: &Value,
    path: &str,
) -> Result<Map<String, Value>, DecodeError> {
    let Some(fields) = value.as_object() else {
        return Err(DecodeError::type_mismatch(display_path(path), "object", value));
    };

    let mut state = Map::new();
    for attribute in &object.attributes {
        let Some(json_name) = &attribute.json_name else {
            continue;
        };
        let child_path = join(path, json_name);
        match fields.get(json_name) {
            None | Some(Value::Null) => {
                if attribute.manifest_required {
                    return Err(DecodeError::missing(child_path));
                }
                state.insert(attribute.name.clone(), Value::Null);
            }
            Some(child) => {
                let decoded = decode_value(&attribute.attr_type, child, &child_path)?;
                state.insert(attribute.name.clone(), decoded);
            }
        }
    }

    let unknown: Map<String, Value> = fields
        .iter()
        .filter(|(key, _)| {
            !object
                .attributes
                .iter()
                .any(|a| a.json_name.as_deref() == Some(key.as_str()))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if !unknown.is_empty() {
        state.insert(UNKNOWN_FIELDS_KEY.to_string(), Value::Object(unknown));
    }
    Ok(state)
}

/// Decode one manifest value of the given type
pub fn decode_value(attr_type: &AttrType, value: &Value, path: &str) -> Result<Value, DecodeError> {
    match attr_type {
        AttrType::String => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(DecodeError::type_mismatch(path, "string", value)),
        },
        AttrType::Int32 => match integer(value).filter(|n| i32::try_from(*n).is_ok()) {
            Some(n) => Ok(Value::from(n)),
            None => Err(DecodeError::type_mismatch(path, "32-bit integer", value)),
        },
        AttrType::Int64 => match integer(value) {
            Some(n) => Ok(Value::from(n)),
            None => Err(DecodeError::type_mismatch(path, "integer", value)),
        },
        AttrType::Float64 => match value {
            Value::Number(_) => Ok(value.clone()),
            _ => Err(DecodeError::type_mismatch(path, "number", value)),
        },
        AttrType::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            _ => Err(DecodeError::type_mismatch(path, "boolean", value)),
        },
        // the JSON type is kept so `80` and `"80"` encode back unchanged
        AttrType::IntOrString => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) if n.is_i64() => Ok(value.clone()),
            _ => Err(DecodeError::type_mismatch(path, "integer or string", value)),
        },
        AttrType::Json => Ok(Value::String(value.to_string())),
        AttrType::List(inner) | AttrType::Set(inner) => match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| decode_element(inner, item, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Err(DecodeError::type_mismatch(path, "array", value)),
        },
        AttrType::Map(inner) => match value {
            Value::Object(entries) => entries
                .iter()
                .map(|(key, item)| {
                    decode_element(inner, item, &format!("{}[{:?}]", path, key))
                        .map(|decoded| (key.clone(), decoded))
                })
                .collect::<Result<Map<_, _>, _>>()
                .map(Value::Object),
            _ => Err(DecodeError::type_mismatch(path, "object", value)),
        },
        AttrType::Object(object) => decode_object(object, value, path).map(Value::Object),
    }
}

/// Integer value of a JSON number
///
/// YAML decoders may hand integers over as whole floats; those are accepted
/// only when they convert to `i64` exactly.
fn integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    // 2^63 is exactly representable; anything at or above it overflows
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then(|| f as i64)
}

fn decode_element(attr_type: &AttrType, value: &Value, path: &str) -> Result<Value, DecodeError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    decode_value(attr_type, value, path)
}

/// Encode a state object back into a manifest body
///
/// Values that do not match their declared type are passed through as-is.
pub fn encode_object(object: &ObjectType, state: &Value) -> Value {
    let Some(fields) = state.as_object() else {
        return state.clone();
    };

    let mut manifest = Map::new();
    if let Some(Value::Object(unknown)) = fields.get(UNKNOWN_FIELDS_KEY) {
        manifest.extend(unknown.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    for attribute in &object.attributes {
        let Some(json_name) = &attribute.json_name else {
            continue;
        };
        match fields.get(&attribute.name) {
            None | Some(Value::Null) => {}
            Some(value) => {
                manifest.insert(json_name.clone(), encode_value(&attribute.attr_type, value));
            }
        }
    }
    Value::Object(manifest)
}

/// Encode one state value of the given type
pub fn encode_value(attr_type: &AttrType, value: &Value) -> Value {
    match (attr_type, value) {
        (AttrType::Json, Value::String(raw)) => {
            serde_json::from_str(raw).unwrap_or_else(|_| value.clone())
        }
        (AttrType::List(inner) | AttrType::Set(inner), Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| encode_element(inner, item))
                .collect(),
        ),
        (AttrType::Map(inner), Value::Object(entries)) => Value::Object(
            entries
                .iter()
                .map(|(key, item)| (key.clone(), encode_element(inner, item)))
                .collect(),
        ),
        (AttrType::Object(object), Value::Object(_)) => encode_object(object, value),
        _ => value.clone(),
    }
}

fn encode_element(attr_type: &AttrType, value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    encode_value(attr_type, value)
}

/// Decode a manifest into a model
pub fn decode<M: DeserializeOwned>(
    schema: &ResourceSchema,
    manifest: &ManifestDocument,
) -> Result<M, DecodeError> {
    let state = decode_state(schema, manifest)?;
    from_state(Value::Object(state))
}

/// Decode a manifest into a state object keyed by attribute names
pub fn decode_state(
    schema: &ResourceSchema,
    manifest: &ManifestDocument,
) -> Result<Map<String, Value>, DecodeError> {
    decode_object(&schema.block, &Value::Object(manifest.body.clone()), "")
}

/// Deserialize a state object into a model
pub fn from_state<M: DeserializeOwned>(state: Value) -> Result<M, DecodeError> {
    serde_json::from_value(state).map_err(|e| DecodeError::TypeMismatch {
        path: String::from("."),
        expected: std::any::type_name::<M>().to_string(),
        found: e.to_string(),
    })
}

/// Encode a model into a manifest of the given apiVersion and kind
pub fn encode<M: Serialize>(
    schema: &ResourceSchema,
    api_version: &str,
    kind: &str,
    model: &M,
) -> Result<ManifestDocument, serde_json::Error> {
    let state = serde_json::to_value(model)?;
    let body = match encode_object(&schema.block, &state) {
        Value::Object(body) => body,
        _ => Map::new(),
    };
    Ok(ManifestDocument::new(api_version, kind, body))
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "."
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    /// `{required:[name], properties:{name:string, replicas:integer/int32}}`
    fn widget_spec() -> ObjectType {
        ObjectType::new(vec![
            Attribute::new("name", AttrType::String)
                .required()
                .manifest_required(),
            Attribute::new("replicas", AttrType::Int32),
        ])
    }

    #[test]
    fn test_required_field() {
        let state = decode_object(&widget_spec(), &json!({"name": "x"}), "").unwrap();
        assert_eq!(state["name"], json!("x"));
        assert_eq!(state["replicas"], Value::Null);

        let err = decode_object(&widget_spec(), &json!({}), "").unwrap_err();
        assert_eq!(err, DecodeError::missing("name"));
    }

    #[test]
    fn test_terraform_required_field_may_be_absent() {
        // lookup keys are required in configuration, not in the object
        let metadata = ObjectType::new(vec![
            Attribute::new("name", AttrType::String)
                .required()
                .manifest_required(),
            Attribute::new("namespace", AttrType::String).required(),
        ]);
        let manifest = json!({"name": "web"});
        let state = Value::Object(decode_object(&metadata, &manifest, "metadata").unwrap());
        assert_eq!(state["namespace"], Value::Null);
        assert_eq!(encode_object(&metadata, &state), manifest);
    }

    #[test]
    fn test_type_mismatch_path() {
        let object = ObjectType::new(vec![Attribute::new(
            "spec",
            AttrType::Object(widget_spec()),
        )]);
        let err = decode_object(&object, &json!({"spec": {"name": "x", "replicas": "3"}}), "")
            .unwrap_err();
        assert_eq!(err.path(), "spec.replicas");
        assert!(matches!(err, DecodeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_string_map_round_trip() {
        let object = ObjectType::new(vec![Attribute::new(
            "data",
            AttrType::map(AttrType::String),
        )]);
        let manifest = json!({"data": {"a": "1", "b": "2"}});
        let state = Value::Object(decode_object(&object, &manifest, "").unwrap());
        assert_eq!(state["data"].as_object().unwrap().len(), 2);
        assert_eq!(encode_object(&object, &state), manifest);
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let manifest = json!({
            "name": "x",
            "replicas": 2,
            "extra": {"nested": [1, 2, 3]},
            "flag": true
        });
        let state = Value::Object(decode_object(&widget_spec(), &manifest, "").unwrap());
        assert_eq!(
            state[UNKNOWN_FIELDS_KEY],
            json!({"extra": {"nested": [1, 2, 3]}, "flag": true})
        );
        assert_eq!(encode_object(&widget_spec(), &state), manifest);
    }

    #[test]
    fn test_json_names() {
        let object = ObjectType::new(vec![Attribute::new("storage_class_name", AttrType::String)
            .with_json_name("storageClassName")]);
        let manifest = json!({"storageClassName": "fast"});
        let state = Value::Object(decode_object(&object, &manifest, "").unwrap());
        assert_eq!(state, json!({"storage_class_name": "fast"}));
        assert_eq!(encode_object(&object, &state), manifest);
    }

    #[test]
    fn test_int_or_string() {
        let object = ObjectType::new(vec![
            Attribute::new("port", AttrType::IntOrString),
            Attribute::new("target", AttrType::IntOrString),
        ]);
        let manifest = json!({"port": 8080, "target": "http"});
        let state = Value::Object(decode_object(&object, &manifest, "").unwrap());
        assert_eq!(state, json!({"port": 8080, "target": "http"}));
        assert_eq!(encode_object(&object, &state), manifest);

        let err = decode_object(&object, &json!({"port": true}), "").unwrap_err();
        assert_eq!(err.path(), "port");
        let err = decode_object(&object, &json!({"port": 1.5}), "").unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_int_or_string_keeps_json_type() {
        let object = ObjectType::new(vec![Attribute::new("v", AttrType::IntOrString)]);
        for manifest in [
            json!({"v": -1}),
            json!({"v": "-1"}),
            json!({"v": "007"}),
            json!({"v": "80"}),
            json!({"v": 80}),
            json!({"v": "25%"}),
        ] {
            let state = Value::Object(decode_object(&object, &manifest, "").unwrap());
            assert_eq!(state["v"], manifest["v"]);
            assert_eq!(encode_object(&object, &state), manifest);
        }
    }

    #[test]
    fn test_opaque_json() {
        let object = ObjectType::new(vec![Attribute::new("template", AttrType::Json)]);
        let manifest = json!({"template": {"kind": "Pod", "spec": {"containers": []}}});
        let state = Value::Object(decode_object(&object, &manifest, "").unwrap());
        assert!(state["template"].is_string());
        assert_eq!(encode_object(&object, &state), manifest);

        // a plain string that is not JSON is passed through
        let state = json!({"template": "not json"});
        assert_eq!(encode_object(&object, &state), json!({"template": "not json"}));
    }

    #[test]
    fn test_list_of_objects() {
        let container = ObjectType::new(vec![
            Attribute::new("name", AttrType::String).manifest_required(),
            Attribute::new("image", AttrType::String),
        ]);
        let object = ObjectType::new(vec![Attribute::new(
            "containers",
            AttrType::list(AttrType::Object(container)),
        )]);
        let manifest = json!({"containers": [{"name": "app", "image": "nginx"}, {"name": "sidecar"}]});
        let state = Value::Object(decode_object(&object, &manifest, "").unwrap());
        assert_eq!(encode_object(&object, &state), manifest);

        let err = decode_object(&object, &json!({"containers": [{"image": "nginx"}]}), "")
            .unwrap_err();
        assert_eq!(err, DecodeError::missing("containers[0].name"));
    }

    #[test]
    fn test_whole_float_integer() {
        let state = decode_object(&widget_spec(), &json!({"name": "x", "replicas": 3.0}), "")
            .unwrap();
        assert_eq!(state["replicas"], json!(3));
    }

    #[test]
    fn test_integer_out_of_range() {
        let object = ObjectType::new(vec![
            Attribute::new("big", AttrType::Int64),
            Attribute::new("small", AttrType::Int32),
        ]);
        let state = decode_object(&object, &json!({"big": -9e15, "small": -7}), "").unwrap();
        assert_eq!(state["big"], json!(-9_000_000_000_000_000_i64));
        assert_eq!(state["small"], json!(-7));

        for manifest in [
            json!({"big": 1e20}),
            json!({"big": u64::MAX}),
            json!({"small": 3_000_000_000_u64}),
            json!({"small": 1e10}),
        ] {
            let err = decode_object(&object, &manifest, "").unwrap_err();
            assert!(matches!(err, DecodeError::TypeMismatch { .. }), "{}", manifest);
        }
    }
}
