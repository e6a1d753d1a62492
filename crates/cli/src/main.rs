//! Kubernetes Provider Generator CLI
//!
//! Command-line interface for generating Terraform providers from Kubernetes
//! OpenAPI documents and CRD manifests.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use kubernetes_provider_generator_common::{
    Category, Diagnostic, GenerationReport, GeneratorConfig, Scope,
};
use kubernetes_provider_generator_generator::ProviderGenerator;
use kubernetes_provider_generator_parser::{load_schema_directory, LoadOutcome};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kubernetes-provider-generator")]
#[command(version, about = "Generate Terraform providers from Kubernetes API schemas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the kinds and units found in a schema directory
    #[command(after_help = "EXAMPLES:\n  \
        # Inspect the API server's OpenAPI document and installed CRDs\n  \
        kubernetes-provider-generator inspect --schema-dir ./schemas\n\n  \
        # Only look at cert-manager groups\n  \
        kubernetes-provider-generator inspect --schema-dir ./schemas --include-group 'cert-manager*'")]
    Inspect {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Generate a provider crate
    #[command(after_help = "EXAMPLES:\n  \
        # Generate every category\n  \
        kubernetes-provider-generator generate \\\n    \
        --schema-dir ./schemas \\\n    \
        --output ./terraform-provider-k8s\n\n  \
        # Resources only, core and apps groups, failing on skipped kinds\n  \
        kubernetes-provider-generator generate \\\n    \
        --schema-dir ./schemas \\\n    \
        --include-group core,apps \\\n    \
        --category resource \\\n    \
        --fail-on-skip \\\n    \
        --output ./provider")]
    Generate {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Exit with an error if any kind was skipped
        #[arg(long)]
        fail_on_skip: bool,
    },

    /// Check every planned schema without writing files
    Validate {
        #[command(flatten)]
        source: SourceArgs,

        /// Exit with an error if any kind was skipped
        #[arg(long)]
        fail_on_skip: bool,
    },
}

/// Schema source and configuration shared by every subcommand
#[derive(Args)]
struct SourceArgs {
    /// Directory containing OpenAPI v2 documents and CRD manifests
    #[arg(short, long)]
    schema_dir: PathBuf,

    /// Generator configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Terraform provider name prefixing every type name
    #[arg(long)]
    provider_name: Option<String>,

    /// API group patterns to include (comma-separated, `*` wildcards, `core` for the core group)
    #[arg(long = "include-group", value_delimiter = ',')]
    include_groups: Vec<String>,

    /// API group patterns to exclude (comma-separated)
    #[arg(long = "exclude-group", value_delimiter = ',')]
    exclude_groups: Vec<String>,

    /// Categories to generate (comma-separated)
    #[arg(long = "category", value_delimiter = ',')]
    categories: Vec<CategoryArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CategoryArg {
    /// Managed resources
    Resource,
    /// Read-only lookups of existing objects
    DataSource,
    /// Manifest rendering without cluster access
    Manifest,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Resource => Category::Resource,
            CategoryArg::DataSource => Category::DataSource,
            CategoryArg::Manifest => Category::Manifest,
        }
    }
}

impl SourceArgs {
    /// Configuration file (or defaults) with command-line overrides applied
    fn config(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => GeneratorConfig::default(),
        };

        if let Some(name) = &self.provider_name {
            // names derived from the provider name follow it unless set explicitly
            let derived = format!("terraform-provider-{}", config.provider_name);
            if config.crate_name == derived {
                config.crate_name = format!("terraform-provider-{}", name);
            }
            if config.field_manager == derived {
                config.field_manager = format!("terraform-provider-{}", name);
            }
            config.provider_name = name.clone();
        }
        if !self.include_groups.is_empty() {
            config.include_groups = self.include_groups.clone();
        }
        if !self.exclude_groups.is_empty() {
            config.exclude_groups = self.exclude_groups.clone();
        }
        if !self.categories.is_empty() {
            config.categories = self.categories.iter().map(|c| Category::from(*c)).collect();
            config.categories.sort();
            config.categories.dedup();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn load(&self) -> Result<LoadOutcome> {
        println!(
            "{} Loading schemas from: {}",
            "→".cyan(),
            self.schema_dir.display()
        );
        let outcome = load_schema_directory(&self.schema_dir).with_context(|| {
            format!("Failed to load schema directory: {}", self.schema_dir.display())
        })?;
        println!(
            "{} Read {} files: {} kinds, {} definitions",
            "✓".green(),
            outcome.files_read,
            outcome.registry.kinds.len(),
            outcome.registry.definitions.len()
        );
        Ok(outcome)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        println!("{} Verbose mode enabled", "→".cyan());
    }

    match cli.command {
        Commands::Inspect { source } => inspect_command(&source, cli.verbose),
        Commands::Generate {
            source,
            output,
            fail_on_skip,
        } => generate_command(&source, &output, fail_on_skip, cli.verbose),
        Commands::Validate {
            source,
            fail_on_skip,
        } => validate_command(&source, fail_on_skip, cli.verbose),
    }
}

/// Log to stderr; `RUST_LOG` wins unless `--verbose` is given
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn inspect_command(source: &SourceArgs, verbose: bool) -> Result<()> {
    let config = source.config()?;
    let outcome = source.load()?;

    println!("\n{}", "Discovered kinds:".bold());
    for kind in outcome.registry.kinds.values() {
        let scope = match kind.scope {
            Scope::Namespaced => "namespaced",
            Scope::Cluster => "cluster",
        };
        let filtered = if config.includes_group(&kind.api.group) {
            String::new()
        } else {
            format!(" {}", "(filtered)".dimmed())
        };
        println!(
            "  • {} {} [{}]{}",
            kind.api.api_version().yellow(),
            kind.api.kind.cyan(),
            scope,
            filtered
        );
        if verbose {
            println!("    Source: {}", kind.source.display());
            println!("    Root: {}", kind.root_definition);
        }
    }

    let generator = ProviderGenerator::new(config).context("Failed to create generator")?;
    let plan = generator.plan(&outcome.registry);

    println!("\n{}", "Planned units:".bold());
    for unit in &plan.units {
        println!(
            "  • {} ({}, {} attributes)",
            unit.identifiers.type_name.cyan(),
            unit.category,
            unit.attributes.len()
        );
        if verbose {
            println!(
                "    Module: src/{}/{}.rs",
                unit.category.module_dir(),
                unit.identifiers.module
            );
            println!("    Struct: {}", unit.identifiers.struct_name);
        }
    }
    if verbose {
        println!("\n{}", "Nested types:".bold());
        for nested in plan.sorted_nested_types() {
            println!(
                "  • {} ({} users)",
                nested.struct_name.cyan(),
                nested.users.len()
            );
        }
    }

    let report = merged_report(plan.report.clone(), outcome.diagnostics);
    print_report(&report, verbose);
    Ok(())
}

fn generate_command(
    source: &SourceArgs,
    output: &std::path::Path,
    fail_on_skip: bool,
    verbose: bool,
) -> Result<()> {
    let config = source.config()?;
    if verbose {
        println!("  Provider: {}", config.provider_name);
        println!("  Crate: {}", config.crate_name);
        println!("  Output: {}", output.display());
    }
    let outcome = source.load()?;

    println!("{} Generating provider files...", "→".cyan());
    let generator = ProviderGenerator::new(config).context("Failed to create generator")?;
    let report = generator
        .generate_to_directory(&outcome.registry, output)
        .context("Failed to generate provider")?;
    let report = merged_report(report, outcome.diagnostics);

    println!("\n{}", "✓ Generation complete!".green().bold());
    print_report(&report, verbose);
    println!("\n{}", "Next steps:".bold());
    println!("  1. Review generated files in {}", output.display());
    println!("  2. Build provider: cd {} && cargo build", output.display());

    check_skipped(&report, fail_on_skip)
}

fn validate_command(source: &SourceArgs, fail_on_skip: bool, verbose: bool) -> Result<()> {
    let config = source.config()?;
    let outcome = source.load()?;

    println!("{} Validating planned schemas...", "→".cyan());
    let generator = ProviderGenerator::new(config).context("Failed to create generator")?;
    let plan = generator.plan(&outcome.registry);
    let violations = generator
        .validate(&plan)
        .context("Failed to build schemas")?;

    let report = merged_report(plan.report, outcome.diagnostics);
    print_report(&report, verbose);

    if !violations.is_empty() {
        println!("\n{}", "Schema violations:".bold());
        for violation in &violations {
            println!("  {} {}", "✗".red(), violation);
        }
        anyhow::bail!("{} schema violations found", violations.len());
    }

    println!(
        "\n{}",
        format!("✓ {} units are valid", plan.units.len()).green().bold()
    );
    check_skipped(&report, fail_on_skip)
}

/// Add loader diagnostics to a generation report
fn merged_report(mut report: GenerationReport, diagnostics: Vec<Diagnostic>) -> GenerationReport {
    for diagnostic in diagnostics {
        report.push(diagnostic);
    }
    report.normalize();
    report
}

fn print_report(report: &GenerationReport, verbose: bool) {
    println!("\n{}", "Summary:".bold());
    println!("  Units: {}", report.generated.len().to_string().yellow());
    println!("  Shared nested types: {}", report.shared_types);
    if report.files_written > 0 {
        println!("  Files written: {}", report.files_written);
    }
    println!("  Warnings: {}", report.warnings.len());
    println!("  Skipped: {}", report.skipped.len());

    if verbose {
        for name in &report.generated {
            println!("    {} {}", "✓".green(), name);
        }
    }
    if !report.warnings.is_empty() {
        println!("\n{}", "Warnings:".bold());
        for warning in &report.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }
    if !report.skipped.is_empty() {
        println!("\n{}", "Skipped:".bold());
        for skipped in &report.skipped {
            println!("  {} {}", "✗".red(), skipped);
        }
    }
}

fn check_skipped(report: &GenerationReport, fail_on_skip: bool) -> Result<()> {
    if fail_on_skip && report.has_skipped() {
        anyhow::bail!(
            "{} kinds or schema files were skipped (--fail-on-skip)",
            report.skipped.len()
        );
    }
    Ok(())
}
