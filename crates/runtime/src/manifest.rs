//! Kubernetes manifest documents

use crate::error::DecodeError;
use serde_json::{Map, Value};

/// A Kubernetes API object split into its type header and body
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    pub api_version: String,
    pub kind: String,
    /// Every top-level key except `apiVersion` and `kind`
    pub body: Map<String, Value>,
}

impl ManifestDocument {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, body: Map<String, Value>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            body,
        }
    }

    /// Split a full manifest value
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let Value::Object(mut body) = value else {
            return Err(DecodeError::type_mismatch(".", "object", &value));
        };
        let api_version = take_string(&mut body, "apiVersion")?;
        let kind = take_string(&mut body, "kind")?;
        Ok(Self {
            api_version,
            kind,
            body,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("apiVersion".to_string(), Value::String(self.api_version.clone()));
        object.insert("kind".to_string(), Value::String(self.kind.clone()));
        object.extend(self.body.iter().map(|(k, v)| (k.clone(), v.clone())));
        Value::Object(object)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::from_value(value)?)
    }

    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Ok(Self::from_value(value)?)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    /// Render as YAML with `apiVersion` and `kind` first
    pub fn to_yaml(&self) -> crate::Result<String> {
        let mut header = serde_yaml::Mapping::new();
        header.insert("apiVersion".into(), self.api_version.clone().into());
        header.insert("kind".into(), self.kind.clone().into());
        for (key, value) in &self.body {
            header.insert(key.clone().into(), serde_yaml::to_value(value)?);
        }
        Ok(serde_yaml::to_string(&header)?)
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.body.get("metadata").and_then(Value::as_object)
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata()?.get("name")?.as_str()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata()?.get("namespace")?.as_str()
    }
}

fn take_string(body: &mut Map<String, Value>, key: &str) -> Result<String, DecodeError> {
    match body.remove(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(DecodeError::type_mismatch(key, "string", &other)),
        None => Err(DecodeError::missing(key)),
    }
}
