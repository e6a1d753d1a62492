//! Swagger 2.0 type definitions
//!
//! Only the parts of the document the loader needs: `definitions` and the
//! path templates used to infer scope.

use crate::raw::RawSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Swagger document root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwaggerSpec {
    /// Swagger version ("2.0")
    pub swagger: String,

    #[serde(default)]
    pub info: Option<Info>,

    /// Named schemas; absent only in malformed documents
    #[serde(default)]
    pub definitions: Option<BTreeMap<String, RawSchema>>,

    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
}

/// API information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
}

/// Path item; only the action extension of each method is inspected
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub get: Option<Operation>,
    #[serde(default)]
    pub put: Option<Operation>,
    #[serde(default)]
    pub post: Option<Operation>,
    #[serde(default)]
    pub delete: Option<Operation>,
    #[serde(default)]
    pub patch: Option<Operation>,
}

impl PathItem {
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        [&self.get, &self.put, &self.post, &self.delete, &self.patch]
            .into_iter()
            .flatten()
    }
}

/// Operation object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "operationId", default)]
    pub operation_id: Option<String>,

    #[serde(rename = "x-kubernetes-action", default)]
    pub action: Option<String>,

    #[serde(rename = "x-kubernetes-group-version-kind", default)]
    pub group_version_kind: Option<GroupVersionKind>,
}

/// Entry of `x-kubernetes-group-version-kind`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl RawSchema {
    /// Group/version/kind tuples a definition declares
    pub fn group_version_kinds(&self) -> Vec<GroupVersionKind> {
        self.extensions
            .get("x-kubernetes-group-version-kind")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }
}
