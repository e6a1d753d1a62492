//! Traits implemented by generated resources and data sources

use crate::client::ObjectRef;
use crate::error::{ProviderError, Result};
use crate::schema::ResourceSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Namespace used when a namespaced object is addressed without one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Static description of the Kubernetes type behind a generated unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitInfo {
    /// Terraform type name
    pub type_name: &'static str,
    pub api_version: &'static str,
    pub kind: &'static str,
    pub namespaced: bool,
}

impl UnitInfo {
    /// Address an object of this type
    pub fn object_ref(&self, name: &str, namespace: Option<&str>) -> ObjectRef {
        let namespace = if self.namespaced {
            Some(namespace.unwrap_or(DEFAULT_NAMESPACE).to_string())
        } else {
            None
        };
        ObjectRef {
            api_version: self.api_version.to_string(),
            kind: self.kind.to_string(),
            namespace,
            name: name.to_string(),
        }
    }

    /// Parse an import id: `namespace/name` or `name` for namespaced kinds,
    /// `name` for cluster-scoped kinds
    pub fn parse_id(&self, id: &str) -> Result<ObjectRef> {
        let invalid = || ProviderError::InvalidImportId(id.to_string());
        let parts: Vec<&str> = id.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }
        match parts.as_slice() {
            [name] => Ok(self.object_ref(name, None)),
            [namespace, name] if self.namespaced => Ok(self.object_ref(name, Some(*namespace))),
            _ => Err(invalid()),
        }
    }
}

/// A managed Kubernetes object
pub trait Resource {
    type Model: Serialize + DeserializeOwned;

    fn info(&self) -> UnitInfo;

    fn schema(&self) -> ResourceSchema;

    /// Field manager used for server-side apply
    fn field_manager(&self) -> &str;
}

/// A read-only view of a Kubernetes object, or a rendered manifest
pub trait DataSource {
    type Model: Serialize + DeserializeOwned;

    fn info(&self) -> UnitInfo;

    fn schema(&self) -> ResourceSchema;
}
