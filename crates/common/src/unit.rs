//! Generation units: one Kind × Version × Scope × Category target

use crate::resolved::{AttributeKind, Presence, TypeId};
use crate::schema::ValidatorSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Group/version/kind of a Kubernetes API type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApiIdentity {
    /// API group; empty for the core group
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl ApiIdentity {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// The `apiVersion` value manifests of this type carry
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    pub fn is_core(&self) -> bool {
        self.group.is_empty()
    }
}

impl fmt::Display for ApiIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.kind)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.kind)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Namespaced,
    Cluster,
}

impl Scope {
    pub fn is_namespaced(self) -> bool {
        self == Scope::Namespaced
    }
}

/// What a unit is emitted as
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Resource,
    DataSource,
    Manifest,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Resource, Category::DataSource, Category::Manifest];

    /// Output directory / module group for the category
    pub fn module_dir(self) -> &'static str {
        match self {
            Category::Resource => "resources",
            Category::DataSource => "data_sources",
            Category::Manifest => "manifests",
        }
    }

    /// Suffix used for generated type and function names
    pub fn suffix(self) -> &'static str {
        match self {
            Category::Resource => "resource",
            Category::DataSource => "data_source",
            Category::Manifest => "manifest",
        }
    }

    /// Terraform keeps resources and data sources in separate namespaces;
    /// manifest data sources live with the other data sources.
    pub fn type_name_scope(self) -> &'static str {
        match self {
            Category::Resource => "resource",
            Category::DataSource | Category::Manifest => "data_source",
        }
    }

    pub fn is_data_source(self) -> bool {
        !matches!(self, Category::Resource)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Identifiers reserved from the naming registry for one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitIdentifiers {
    /// Module (file) name inside the category directory
    pub module: String,
    /// Exported struct implementing the resource or data source
    pub struct_name: String,
    /// Model struct mirroring the schema
    pub model_name: String,
    /// Constructor function
    pub constructor: String,
    /// Terraform type name, e.g. `k8s_apps_deployment_v1`
    pub type_name: String,
}

/// One attribute of an emitted object type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributePlan {
    /// Terraform attribute name
    pub name: String,
    /// Manifest key; `None` for synthetic attributes such as `id`
    pub json_name: Option<String>,
    /// Field identifier in the generated model struct
    pub rust_ident: String,
    pub kind: AttributeKind,
    pub presence: Presence,
    /// Whether the schema lists the property as required (drives the model field type)
    pub schema_required: bool,
    pub description: Option<String>,
    pub validators: Vec<ValidatorSpec>,
}

/// One Kind × Version × Scope × Category target of code generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationUnit {
    pub api: ApiIdentity,
    pub scope: Scope,
    pub category: Category,
    pub root_type: TypeId,
    pub identifiers: UnitIdentifiers,
    pub description: Option<String>,
    pub deprecated: bool,
    /// Root attributes, including synthetic ones
    pub attributes: Vec<AttributePlan>,
    /// Nested attribute paths forced to required (e.g. `metadata.name`)
    pub required_paths: Vec<Vec<String>>,
    /// Object-level validators of the root type
    pub root_validators: Vec<ValidatorSpec>,
}

impl GenerationUnit {
    /// Stable owner key used for name reservations
    pub fn owner_key(&self) -> String {
        format!("{}/{}", self.api, self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version() {
        assert_eq!(ApiIdentity::new("", "v1", "Pod").api_version(), "v1");
        assert_eq!(
            ApiIdentity::new("apps", "v1", "Deployment").api_version(),
            "apps/v1"
        );
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(ApiIdentity::new("", "v1", "Pod").to_string(), "v1/Pod");
        assert_eq!(
            ApiIdentity::new("cert-manager.io", "v1", "Certificate").to_string(),
            "cert-manager.io/v1/Certificate"
        );
    }

    #[test]
    fn test_category_scopes() {
        assert_eq!(Category::Resource.type_name_scope(), "resource");
        assert_eq!(
            Category::DataSource.type_name_scope(),
            Category::Manifest.type_name_scope()
        );
    }
}
