//! Diagnostics collected during a generation run

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

/// A warning or error attributed to a schema source or unit
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// File, definition or unit the diagnostic is about
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn error(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Outcome of a generation run
///
/// A run succeeds as long as the schema directory could be read; units that
/// fail to resolve are listed in `skipped` instead of aborting the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Terraform type names of generated units
    pub generated: Vec<String>,
    pub skipped: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    /// Number of nested types emitted once and shared between units
    pub shared_types: usize,
    pub files_written: usize,
}

impl GenerationReport {
    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => self.warnings.push(diagnostic),
            Severity::Error => self.skipped.push(diagnostic),
        }
    }

    /// Sort all lists so reports compare equal across runs
    pub fn normalize(&mut self) {
        self.generated.sort();
        self.generated.dedup();
        self.skipped.sort();
        self.skipped.dedup();
        self.warnings.sort();
        self.warnings.dedup();
    }
}
