//! Schema loading for Kubernetes API types
//!
//! This crate reads Kubernetes schema documents into the normalized
//! [`SchemaNode`] representation shared with the generator.
//!
//! ## Input formats
//!
//! - OpenAPI v2 (Swagger) documents published by the API server: every
//!   `definitions` entry is normalized; entries with
//!   `x-kubernetes-group-version-kind` become discovered kinds.
//! - CRD v1 manifests: each served version's `openAPIV3Schema` becomes
//!   one definition keyed by `group/version/Kind`.
//!
//! Both formats share the schema keyword set in [`raw`] and go through the
//! same normalization, so equivalent schemas produce identical nodes.

pub mod crd;
mod loader;
pub mod normalize;
pub mod openapi;
pub mod raw;

pub use crd::CrdParser;
pub use loader::{detect_format, load_document, load_schema_directory, LoadOutcome, SchemaLoader};
pub use normalize::{normalize, Dialect};
pub use openapi::OpenApiParser;

use kubernetes_provider_generator_common::{Diagnostic, DiscoveredKind, SchemaNode};
use std::collections::BTreeMap;

/// Definitions, kinds and diagnostics produced from one schema file
#[derive(Debug, Clone, Default)]
pub struct LoadedDocument {
    pub definitions: BTreeMap<String, SchemaNode>,
    pub kinds: Vec<DiscoveredKind>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadedDocument {
    pub fn merge(&mut self, other: LoadedDocument) {
        self.definitions.extend(other.definitions);
        self.kinds.extend(other.kinds);
        self.diagnostics.extend(other.diagnostics);
    }
}
