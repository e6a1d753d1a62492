//! Kubernetes OpenAPI v2 (Swagger) loader
//!
//! Built-in Kubernetes types are published as one Swagger 2.0 document.
//! Every entry of `definitions` is normalized into a
//! [`SchemaNode`](kubernetes_provider_generator_common::SchemaNode); entries
//! carrying `x-kubernetes-group-version-kind` with `apiVersion`, `kind` and
//! `metadata` properties become discovered kinds.
//!
//! ## Sources
//! - From a cluster: `kubectl get --raw /openapi/v2 > swagger.json`
//! - From GitHub: `https://github.com/kubernetes/kubernetes/blob/master/api/openapi-spec/swagger.json`
//!
//! ## Usage
//! ```rust,ignore
//! use kubernetes_provider_generator_parser::openapi::OpenApiParser;
//!
//! let document = OpenApiParser::from_file("swagger.json")?.parse()?;
//! ```

mod converter;
mod parser;
mod types;

pub use parser::OpenApiParser;
pub use types::*;
