//! CustomResourceDefinition loader
//!
//! Each served version of an `apiextensions.k8s.io/v1` CRD becomes one
//! discovered kind. The version's `openAPIV3Schema` is normalized with the
//! CRD dialect (no `$ref`) and its `metadata` is replaced with the standard
//! object metadata shape.

mod converter;
mod parser;
mod types;

pub use converter::{definition_name, standard_object_meta};
pub use parser::CrdParser;
pub use types::*;
