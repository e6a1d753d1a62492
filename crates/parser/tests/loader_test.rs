//! Integration tests for loading a schema directory

use kubernetes_provider_generator_common::{ApiIdentity, NodeKind, Scope, Severity, SourceFormat};
use kubernetes_provider_generator_parser::{crd::standard_object_meta, load_schema_directory};
use std::fs;

const CERTIFICATE_CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: certificates.cert-manager.io
spec:
  group: cert-manager.io
  scope: Namespaced
  names:
    kind: Certificate
    plural: certificates
  versions:
    - name: v1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              required: [secretName]
              properties:
                secretName:
                  type: string
                  x-kubernetes-validations:
                    - rule: self == oldSelf
                      message: secretName is immutable
                dnsNames:
                  type: array
                  items:
                    type: string
                  x-kubernetes-list-type: set
            status:
              type: object
              x-kubernetes-preserve-unknown-fields: true
"#;

const CLUSTER_ISSUER_CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: clusterissuers.cert-manager.io
spec:
  group: cert-manager.io
  scope: Cluster
  names:
    kind: ClusterIssuer
    plural: clusterissuers
  versions:
    - name: v1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              x-kubernetes-preserve-unknown-fields: true
"#;

const SWAGGER: &str = r#"{
    "swagger": "2.0",
    "paths": {},
    "definitions": {
        "io.k8s.api.core.v1.Secret": {
            "type": "object",
            "properties": {
                "apiVersion": {"type": "string"},
                "kind": {"type": "string"},
                "metadata": {"type": "object", "properties": {"name": {"type": "string"}}},
                "stringData": {"type": "object", "additionalProperties": {"type": "string"}}
            },
            "x-kubernetes-group-version-kind": [{"group": "", "version": "v1", "kind": "Secret"}]
        }
    }
}"#;

#[test]
fn test_load_mixed_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("crds")).unwrap();
    fs::write(dir.path().join("crds/certificate.yaml"), CERTIFICATE_CRD).unwrap();
    fs::write(dir.path().join("crds/clusterissuer.yml"), CLUSTER_ISSUER_CRD).unwrap();
    fs::write(dir.path().join("swagger.json"), SWAGGER).unwrap();
    fs::write(dir.path().join("README.md"), "not a schema").unwrap();

    let outcome = load_schema_directory(dir.path()).unwrap();
    assert_eq!(outcome.files_read, 3);
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);

    let registry = &outcome.registry;
    assert_eq!(registry.kinds.len(), 3);

    let certificate = &registry.kinds[&ApiIdentity::new("cert-manager.io", "v1", "Certificate")];
    assert_eq!(certificate.format, SourceFormat::CrdV1);
    assert_eq!(certificate.scope, Scope::Namespaced);

    let issuer = &registry.kinds[&ApiIdentity::new("cert-manager.io", "v1", "ClusterIssuer")];
    assert_eq!(issuer.scope, Scope::Cluster);

    let secret = &registry.kinds[&ApiIdentity::new("", "v1", "Secret")];
    assert_eq!(secret.format, SourceFormat::OpenApiV2);
    assert_eq!(secret.root_definition, "io.k8s.api.core.v1.Secret");
}

#[test]
fn test_crd_schema_normalization() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("certificate.yaml"), CERTIFICATE_CRD).unwrap();

    let outcome = load_schema_directory(dir.path()).unwrap();
    let root = outcome
        .registry
        .definition("cert-manager.io/v1/Certificate")
        .unwrap();

    assert_eq!(root.children["metadata"], standard_object_meta());
    let spec = &root.children["spec"];
    assert!(spec.is_required("secretName"));
    assert!(spec.children["secretName"]
        .validators
        .contains(&kubernetes_provider_generator_common::ValidatorSpec::Immutable));
    assert_eq!(
        spec.children["dnsNames"].extensions.list_type.as_deref(),
        Some("set")
    );

    let status = &root.children["status"];
    assert_eq!(status.kind, NodeKind::Unknown);
    assert!(status.extensions.preserve_unknown_fields);
}

#[test]
fn test_broken_file_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a-broken.json"), "{\"swagger\": ").unwrap();
    fs::write(dir.path().join("b-certificate.yaml"), CERTIFICATE_CRD).unwrap();

    let outcome = load_schema_directory(dir.path()).unwrap();
    assert_eq!(outcome.registry.kinds.len(), 1);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].severity, Severity::Error);
    assert!(outcome.diagnostics[0].subject.ends_with("a-broken.json"));
}

#[test]
fn test_non_utf8_file_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a-certificate.yaml"), CERTIFICATE_CRD).unwrap();
    fs::write(dir.path().join("b-corrupt.json"), [0x7b, 0xff, 0xfe, 0x7d]).unwrap();

    let outcome = load_schema_directory(dir.path()).unwrap();
    assert_eq!(outcome.files_read, 2);
    assert_eq!(outcome.registry.kinds.len(), 1);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].severity, Severity::Error);
    assert!(outcome.diagnostics[0].subject.ends_with("b-corrupt.json"));
    assert!(outcome.diagnostics[0].message.contains("unreadable"));
}

#[test]
fn test_duplicate_kind_keeps_first() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.yaml"), CERTIFICATE_CRD).unwrap();
    fs::write(dir.path().join("b.yaml"), CERTIFICATE_CRD).unwrap();

    let outcome = load_schema_directory(dir.path()).unwrap();
    assert_eq!(outcome.registry.kinds.len(), 1);
    let kind = outcome.registry.kinds.values().next().unwrap();
    assert!(kind.source.ends_with("a.yaml"));
    assert!(outcome
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning && d.subject == "cert-manager.io/v1/Certificate"));
}

#[test]
fn test_missing_directory_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_schema_directory(dir.path().join("missing")).unwrap_err();
    assert!(err.is_fatal());
}
