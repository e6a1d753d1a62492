//! Kubernetes API access used by generated resources
//!
//! The transport (REST calls, authentication, server-side apply) lives
//! outside this crate; providers plug an implementation of
//! [`KubernetesClient`] into the generated resources.

use crate::error::ClientError;
use crate::manifest::ManifestDocument;
use std::fmt;

#[cfg(test)]
use mockall::automock;

/// Address of one API object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub api_version: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectRef {
    /// Terraform id of the object: `namespace/name` or `name`
    pub fn id(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}/{}", namespace, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.api_version, self.kind, self.id())
    }
}

/// Trait abstracting the Kubernetes API operations generated code needs
#[cfg_attr(test, automock)]
pub trait KubernetesClient: Send + Sync {
    /// Server-side apply a manifest and return the object as stored
    fn apply(
        &self,
        manifest: &ManifestDocument,
        field_manager: &str,
    ) -> Result<ManifestDocument, ClientError>;

    /// Fetch an object; `None` when it does not exist
    fn get(&self, object: &ObjectRef) -> Result<Option<ManifestDocument>, ClientError>;

    /// Delete an object; deleting a missing object succeeds
    fn delete(&self, object: &ObjectRef) -> Result<(), ClientError>;
}
