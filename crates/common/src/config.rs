//! Generator configuration loaded from YAML files
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration. CLI flags are applied on top of the loaded value.

use crate::unit::Category;
use crate::{GeneratorError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How a non-required attribute with a schema default is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPolicy {
    /// Defaulted attributes become optional + computed
    #[default]
    ComputedOverridesOptional,
    /// Defaulted attributes stay plain optional
    OptionalOnly,
}

/// Root structure of a generator configuration file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Configuration format version
    pub version: u32,
    /// Terraform provider name; prefixes every type name (e.g. "k8s")
    pub provider_name: String,
    /// Name of the generated crate
    pub crate_name: String,
    /// Dependency line for the runtime crate in the generated Cargo.toml
    pub runtime_dependency: String,
    /// API group patterns to include; empty means all.
    /// Supports `*` wildcards: `*.k8s.io`, `cert-manager*`, `*istio*`
    pub include_groups: Vec<String>,
    /// API group patterns to exclude; applied after `include_groups`
    pub exclude_groups: Vec<String>,
    /// Unit categories to emit
    pub categories: Vec<Category>,
    /// Maximum schema nesting depth before a unit is declared unresolvable
    pub max_depth: usize,
    /// Field manager used for server-side apply by generated resources
    pub field_manager: String,
    pub default_policy: DefaultPolicy,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            version: 1,
            provider_name: "k8s".to_string(),
            crate_name: "terraform-provider-k8s".to_string(),
            runtime_dependency: "kubernetes-provider-runtime = \"0.1\"".to_string(),
            include_groups: Vec::new(),
            exclude_groups: Vec::new(),
            categories: Category::ALL.to_vec(),
            max_depth: 64,
            field_manager: "terraform-provider-k8s".to_string(),
            default_policy: DefaultPolicy::default(),
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GeneratorError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_yaml(&content).map_err(|e| match e {
            GeneratorError::Config(msg) => {
                GeneratorError::Config(format!("{} (in {:?})", msg, path))
            }
            other => other,
        })
    }

    /// Parse configuration from a YAML string and validate it
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: GeneratorConfig = if content.trim().is_empty() {
            GeneratorConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                GeneratorError::Config(format!("Failed to parse config YAML: {}", e))
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the generator relies on
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(GeneratorError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        let valid_name = !self.provider_name.is_empty()
            && self
                .provider_name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            && !self.provider_name.starts_with(|c: char| c.is_ascii_digit());
        if !valid_name {
            return Err(GeneratorError::Config(format!(
                "provider_name {:?} must be a lowercase identifier",
                self.provider_name
            )));
        }
        if self.crate_name.is_empty() {
            return Err(GeneratorError::Config("crate_name must not be empty".into()));
        }
        if self.categories.is_empty() {
            return Err(GeneratorError::Config(
                "at least one category must be enabled".into(),
            ));
        }
        if self.max_depth == 0 {
            return Err(GeneratorError::Config("max_depth must be positive".into()));
        }
        if self.field_manager.is_empty() {
            return Err(GeneratorError::Config(
                "field_manager must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Whether units of the given API group should be generated
    pub fn includes_group(&self, group: &str) -> bool {
        let included = self.include_groups.is_empty()
            || self
                .include_groups
                .iter()
                .any(|pattern| group_matches(pattern, group));
        included
            && !self
                .exclude_groups
                .iter()
                .any(|pattern| group_matches(pattern, group))
    }

    pub fn category_enabled(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}

/// Match an API group against a pattern
///
/// Supports:
/// - Exact matches: "apps"
/// - Prefix wildcards: "cert-manager*"
/// - Suffix wildcards: "*.k8s.io"
/// - Contains wildcards: "*istio*"
/// - The literal "core" for the core (empty) group
fn group_matches(pattern: &str, group: &str) -> bool {
    if pattern == "core" {
        return group.is_empty();
    }
    if pattern.len() > 1 && pattern.starts_with('*') && pattern.ends_with('*') {
        group.contains(pattern.trim_matches('*'))
    } else if let Some(suffix) = pattern.strip_prefix('*') {
        group.ends_with(suffix)
    } else if let Some(prefix) = pattern.strip_suffix('*') {
        group.starts_with(prefix)
    } else {
        group == pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_matches() {
        assert!(group_matches("apps", "apps"));
        assert!(!group_matches("apps", "apps.example.com"));
        assert!(group_matches("*.k8s.io", "networking.k8s.io"));
        assert!(group_matches("cert-manager*", "cert-manager.io"));
        assert!(group_matches("*istio*", "networking.istio.io"));
        assert!(group_matches("*", "anything"));
        assert!(group_matches("core", ""));
        assert!(!group_matches("core", "apps"));
    }

    #[test]
    fn test_includes_group_with_exclusions() {
        let config = GeneratorConfig {
            include_groups: vec!["*.k8s.io".into(), "core".into()],
            exclude_groups: vec!["admissionregistration*".into()],
            ..GeneratorConfig::default()
        };
        assert!(config.includes_group(""));
        assert!(config.includes_group("networking.k8s.io"));
        assert!(!config.includes_group("admissionregistration.k8s.io"));
        assert!(!config.includes_group("cert-manager.io"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = GeneratorConfig::from_yaml("").unwrap();
        assert_eq!(config, GeneratorConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = GeneratorConfig::from_yaml(
            "provider_name: kube\ncategories: [resource]\ndefault_policy: optional_only\n",
        )
        .unwrap();
        assert_eq!(config.provider_name, "kube");
        assert_eq!(config.categories, vec![Category::Resource]);
        assert_eq!(config.default_policy, DefaultPolicy::OptionalOnly);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_invalid_provider_name() {
        let err = GeneratorConfig::from_yaml("provider_name: Kube-Provider\n").unwrap_err();
        assert!(matches!(err, GeneratorError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generator.yaml");
        std::fs::write(&path, "max_depth: 8\n").unwrap();
        let config = GeneratorConfig::load(&path).unwrap();
        assert_eq!(config.max_depth, 8);

        let missing = GeneratorConfig::load(&dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(GeneratorError::Config(_))));
    }
}
