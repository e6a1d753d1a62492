//! Type resolution, classification and code emission for Kubernetes providers
//!
//! This crate turns a loaded [`SchemaRegistry`] into the sources of a
//! Terraform provider crate:
//!
//! 1. [`resolver`] builds one deduplicated type graph over every kind
//! 2. [`classifier`] decides attribute kinds and presence
//! 3. [`planner`] reserves names and lays out generation units
//! 4. [`render`] fills the templates
//!
//! Output is a pure function of the registry and configuration: two runs over
//! the same schema directory produce byte-identical files.

pub mod classifier;
pub mod naming;
pub mod planner;
pub mod render;
pub mod resolver;
pub mod schema_builder;
mod templates;

pub use planner::{plan, NestedTypePlan, ProviderPlan};
pub use render::RenderedFiles;

use kubernetes_provider_generator_common::{
    Category, Diagnostic, GenerationReport, GeneratorConfig, GeneratorError, Result,
    SchemaRegistry,
};
use std::fs;
use std::path::Path;
use tera::Tera;
use tracing::{debug, info};

/// Provider generator
///
/// Transforms a [`SchemaRegistry`] into a complete provider crate:
/// - Cargo.toml and README.md
/// - `src/types.rs` with the nested object types shared between units
/// - one module per resource, data source and manifest data source
pub struct ProviderGenerator {
    config: GeneratorConfig,
    tera: Tera,
}

impl ProviderGenerator {
    /// Create a new provider generator
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let tera = templates::load_templates()?;
        Ok(Self { config, tera })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Resolve, classify and name every unit of the registry
    pub fn plan(&self, registry: &SchemaRegistry) -> ProviderPlan {
        planner::plan(registry, &self.config)
    }

    /// Render the provider crate in memory
    pub fn render(&self, plan: &ProviderPlan) -> Result<RenderedFiles> {
        render::render(&self.tera, plan)
    }

    /// Check every planned schema with `validate_implementation`
    ///
    /// Returns one error diagnostic per violation; an empty list means every
    /// unit is structurally valid.
    pub fn validate(&self, plan: &ProviderPlan) -> Result<Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();
        for unit in &plan.units {
            let schema = schema_builder::build_schema(plan, unit)?;
            if let Err(violations) = schema.validate_implementation() {
                for violation in violations {
                    diagnostics.push(Diagnostic::error(
                        unit.identifiers.type_name.clone(),
                        violation.to_string(),
                    ));
                }
            }
        }
        debug!(
            "Validated {} units, {} violations",
            plan.units.len(),
            diagnostics.len()
        );
        Ok(diagnostics)
    }

    /// Generate the provider crate into a directory
    ///
    /// Category directories under `src/` are recreated so units removed from
    /// the schema directory do not linger.
    pub fn generate_to_directory(
        &self,
        registry: &SchemaRegistry,
        output_dir: &Path,
    ) -> Result<GenerationReport> {
        let plan = self.plan(registry);

        let violations = self.validate(&plan)?;
        if !violations.is_empty() {
            let listed: Vec<String> = violations.iter().map(ToString::to_string).collect();
            return Err(GeneratorError::Generation(format!(
                "generated schemas are invalid:\n{}",
                listed.join("\n")
            )));
        }

        let files = self.render(&plan)?;
        write_files(output_dir, &files)?;

        let mut report = plan.report;
        report.files_written = files.len();
        info!(
            "Wrote {} files for {} units to {}",
            report.files_written,
            report.generated.len(),
            output_dir.display()
        );
        Ok(report)
    }
}

/// Write rendered files below `output_dir`
pub fn write_files(output_dir: &Path, files: &RenderedFiles) -> Result<()> {
    fs::create_dir_all(output_dir).map_err(|e| {
        GeneratorError::Generation(format!("Failed to create output directory: {}", e))
    })?;

    let src_dir = output_dir.join("src");
    for category in Category::ALL {
        let dir = src_dir.join(category.module_dir());
        if dir.is_dir() {
            fs::remove_dir_all(&dir).map_err(|e| {
                GeneratorError::Generation(format!("Failed to clear {}: {}", dir.display(), e))
            })?;
        }
    }

    for (relative, content) in files {
        let path = output_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GeneratorError::Generation(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        fs::write(&path, content).map_err(|e| {
            GeneratorError::Generation(format!("Failed to write {}: {}", relative.display(), e))
        })?;
    }

    Ok(())
}

/// Generate a provider crate (convenience function)
pub fn generate_provider(
    registry: &SchemaRegistry,
    config: GeneratorConfig,
    output_dir: &Path,
) -> Result<GenerationReport> {
    ProviderGenerator::new(config)?.generate_to_directory(registry, output_dir)
}
