//! Runtime support for generated Kubernetes providers
//!
//! Generated provider crates depend on this crate for:
//!
//! - [`schema`]: attribute descriptors and the structural
//!   [`validate_implementation`](ResourceSchema::validate_implementation) check
//! - [`codec`]: converting between manifests and Terraform-shaped state
//! - [`ops`]: the create/read/update/delete/import bodies of every resource
//! - [`validators`]: value checks attached to attributes
//!
//! The Kubernetes transport itself is abstracted behind [`KubernetesClient`].
//!
//! ## Example
//!
//! ```rust
//! use kubernetes_provider_runtime::{codec, AttrType, Attribute, ObjectType, ResourceSchema};
//! use kubernetes_provider_runtime::ManifestDocument;
//!
//! let schema = ResourceSchema::new(
//!     "k8s_config_map_v1",
//!     ObjectType::new(vec![Attribute::new("data", AttrType::map(AttrType::String))]),
//! );
//! let manifest = ManifestDocument::from_yaml("apiVersion: v1\nkind: ConfigMap\ndata:\n  a: \"1\"\n").unwrap();
//! let state = codec::decode_state(&schema, &manifest).unwrap();
//! assert_eq!(state["data"]["a"], "1");
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod int_or_string;
pub mod manifest;
pub mod ops;
pub mod resource;
pub mod schema;
pub mod validators;

pub use client::{KubernetesClient, ObjectRef};
pub use codec::{decode, decode_state, encode, from_state, UNKNOWN_FIELDS_KEY};
pub use error::{ClientError, DecodeError, Diagnostic, ProviderError, Result, Severity};
pub use int_or_string::IntOrString;
pub use manifest::ManifestDocument;
pub use resource::{DataSource, Resource, UnitInfo, DEFAULT_NAMESPACE};
pub use schema::{AttrType, Attribute, ObjectType, ResourceSchema, SchemaViolation};
pub use validators::Validator;
