//! Integration tests for provider generation

use kubernetes_provider_generator_common::{
    AttributeKind, GeneratorConfig, Presence, SchemaRegistry, Severity,
};
use kubernetes_provider_generator_generator::ProviderGenerator;
use kubernetes_provider_generator_parser::load_schema_directory;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const WIDGET_CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.example.com
spec:
  group: example.com
  scope: Namespaced
  names:
    kind: Widget
    plural: widgets
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
              required: [name]
              properties:
                name:
                  type: string
                replicas:
                  type: integer
                  format: int32
            status:
              type: object
              properties:
                ready:
                  type: boolean
"#;

const GADGET_CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: gadgets.example.com
spec:
  group: example.com
  scope: Cluster
  names:
    kind: Gadget
    plural: gadgets
  versions:
    - name: v1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            count:
              type: integer
            spec:
              type: object
              properties:
                type:
                  type: string
                mode:
                  type: string
                  enum: [fast, slow]
                labels:
                  type: object
                  additionalProperties:
                    type: string
"#;

const SWAGGER: &str = r##"{
    "swagger": "2.0",
    "paths": {},
    "definitions": {
        "io.k8s.apimachinery.pkg.apis.meta.v1.ObjectMeta": {
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "namespace": {"type": "string"}
            }
        },
        "io.k8s.api.core.v1.ConfigMap": {
            "type": "object",
            "properties": {
                "apiVersion": {"type": "string"},
                "kind": {"type": "string"},
                "metadata": {"$ref": "#/definitions/io.k8s.apimachinery.pkg.apis.meta.v1.ObjectMeta"},
                "data": {"type": "object", "additionalProperties": {"type": "string"}}
            },
            "x-kubernetes-group-version-kind": [{"group": "", "version": "v1", "kind": "ConfigMap"}]
        },
        "io.k8s.api.core.v1.Broken": {
            "type": "object",
            "properties": {
                "apiVersion": {"type": "string"},
                "kind": {"type": "string"},
                "metadata": {"$ref": "#/definitions/io.k8s.apimachinery.pkg.apis.meta.v1.ObjectMeta"},
                "spec": {"$ref": "#/definitions/io.k8s.api.core.v1.Missing"}
            },
            "x-kubernetes-group-version-kind": [{"group": "", "version": "v1", "kind": "Broken"}]
        }
    }
}"##;

fn schema_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn load(dir: &Path) -> SchemaRegistry {
    let outcome = load_schema_directory(dir).unwrap();
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    outcome.registry
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative))
        .unwrap_or_else(|e| panic!("failed to read {}: {}", relative, e))
}

#[test]
fn test_generate_provider_crate() {
    let schemas = schema_dir(&[("widget.yaml", WIDGET_CRD), ("gadget.yaml", GADGET_CRD)]);
    let output = tempfile::tempdir().unwrap();

    let generator = ProviderGenerator::new(GeneratorConfig::default()).unwrap();
    let report = generator
        .generate_to_directory(&load(schemas.path()), output.path())
        .unwrap();

    assert!(report.skipped.is_empty(), "{:?}", report.skipped);
    assert_eq!(report.generated.len(), 6);
    assert!(report
        .generated
        .contains(&"k8s_example_com_widget_v1".to_string()));
    assert!(report
        .generated
        .contains(&"k8s_example_com_widget_v1_manifest".to_string()));
    // Cargo.toml, README.md, lib.rs, types.rs, three mod.rs, six units
    assert_eq!(report.files_written, 13);

    for path in [
        "Cargo.toml",
        "README.md",
        "src/lib.rs",
        "src/types.rs",
        "src/resources/mod.rs",
        "src/resources/example_com_widget_v1.rs",
        "src/data_sources/example_com_gadget_v1.rs",
        "src/manifests/example_com_widget_v1.rs",
    ] {
        assert!(output.path().join(path).is_file(), "missing {}", path);
    }

    let cargo_toml = read(output.path(), "Cargo.toml");
    assert!(cargo_toml.contains("name = \"terraform-provider-k8s\""));
    assert!(cargo_toml.contains("kubernetes-provider-runtime = \"0.1\""));

    let lib_rs = read(output.path(), "src/lib.rs");
    assert!(lib_rs.contains("pub mod types;"));
    assert!(lib_rs.contains("pub mod data_sources;"));
    assert!(lib_rs.contains("schemas.extend(manifests::schemas());"));

    let resource = read(output.path(), "src/resources/example_com_widget_v1.rs");
    assert!(resource.contains("pub fn new_example_com_widget_v1_resource("));
    assert!(resource.contains("impl Resource for ExampleComWidgetV1Resource"));
    assert!(resource.contains("pub struct ExampleComWidgetV1ResourceModel"));
    assert!(resource.contains("pub metadata: types::ObjectMeta,"));
    assert!(resource.contains("AttrType::Object(types::object_meta_type())"));
    assert!(resource.contains("block.require_path(&[\"metadata\", \"name\"]);"));
    assert!(resource.contains("namespaced: true,"));
    assert!(resource.contains("fn test_schema_is_valid()"));

    let mod_rs = read(output.path(), "src/resources/mod.rs");
    assert!(mod_rs.contains("pub mod example_com_widget_v1;"));
    assert!(mod_rs.contains("example_com_gadget_v1::schema(),"));

    let readme = read(output.path(), "README.md");
    assert!(readme.contains("| `k8s_example_com_gadget_v1` | `example.com/v1` | Gadget |"));
}

#[test]
fn test_unit_kinds_render_their_operations() {
    let schemas = schema_dir(&[("widget.yaml", WIDGET_CRD)]);
    let output = tempfile::tempdir().unwrap();
    let generator = ProviderGenerator::new(GeneratorConfig::default()).unwrap();
    generator
        .generate_to_directory(&load(schemas.path()), output.path())
        .unwrap();

    let resource = read(output.path(), "src/resources/example_com_widget_v1.rs");
    for call in [
        "ops::create(self, client, planned)",
        "ops::read(self, client, current)",
        "ops::update(self, client, prior, planned)",
        "ops::delete(self, client, current)",
        "ops::import_state(self, client, id)",
    ] {
        assert!(resource.contains(call), "missing {}", call);
    }

    let data_source = read(output.path(), "src/data_sources/example_com_widget_v1.rs");
    assert!(data_source.contains("ops::read_data_source(self, client, config)"));
    assert!(data_source.contains("impl DataSource for ExampleComWidgetV1DataSource"));
    assert!(data_source
        .contains("AttrType::Object(types::object_meta_type().computed_except(&[\"name\", \"namespace\"]))"));
    assert!(!data_source.contains("KubernetesClient, ObjectType, Resource,"));

    let manifest = read(output.path(), "src/manifests/example_com_widget_v1.rs");
    assert!(manifest.contains("ops::render_manifest(self, config)"));
    assert!(manifest.contains("Attribute::synthetic(\"yaml\", AttrType::String)"));
    assert!(!manifest.contains("KubernetesClient"));
}

#[test]
fn test_rendered_fields_and_validators() {
    let schemas = schema_dir(&[("gadget.yaml", GADGET_CRD)]);
    let output = tempfile::tempdir().unwrap();
    let generator = ProviderGenerator::new(GeneratorConfig::default()).unwrap();
    generator
        .generate_to_directory(&load(schemas.path()), output.path())
        .unwrap();

    let types = read(output.path(), "src/types.rs");
    assert!(types.contains("pub struct GadgetSpec {"));
    assert!(types.contains("pub r#type: Option<String>,"));
    assert!(types.contains("pub labels: Option<BTreeMap<String, String>>,"));
    assert!(types.contains(
        "Validator::one_of(vec![serde_json::Value::String(\"fast\".to_string()), \
         serde_json::Value::String(\"slow\".to_string())])"
    ));
    assert!(types.contains("rename = \"__unknown_fields\""));

    // `count` is reserved at the top level of a Terraform resource
    let resource = read(output.path(), "src/resources/example_com_gadget_v1.rs");
    assert!(resource.contains("Attribute::new(\"count_field\", AttrType::Int64)"));
    assert!(resource.contains(".with_json_name(\"count\")"));
    assert!(resource.contains("namespaced: false,"));
    assert!(!resource.contains("require_path(&[\"metadata\", \"namespace\"])"));
}

#[test]
fn test_polymorphic_fields() {
    let crd = GADGET_CRD.replace(
        "                labels:\n",
        "                choice:\n                  oneOf:\n                    - type: string\n                    - type: integer\n                port:\n                  x-kubernetes-int-or-string: true\n                labels:\n",
    );
    let schemas = schema_dir(&[("gadget.yaml", crd.as_str())]);
    let generator = ProviderGenerator::new(GeneratorConfig::default()).unwrap();
    let plan = generator.plan(&load(schemas.path()));

    let spec = plan
        .nested_types
        .values()
        .find(|t| t.struct_name == "GadgetSpec")
        .unwrap();
    let choice = spec.attribute_by_json_name("choice").unwrap();
    assert_eq!(choice.kind, AttributeKind::Opaque);
    assert_eq!(choice.presence, Presence::OptionalComputed);

    let files = generator.render(&plan).unwrap();
    let types = &files[Path::new("src/types.rs")];
    assert!(types.contains(
        "Attribute::new(\"choice\", AttrType::Json)\n            .optional_computed()"
    ));
    assert!(types.contains("pub port: Option<kubernetes_provider_runtime::IntOrString>,"));
    assert!(generator.validate(&plan).unwrap().is_empty());
}

#[test]
fn test_generation_is_deterministic() {
    let schemas = schema_dir(&[("widget.yaml", WIDGET_CRD), ("gadget.yaml", GADGET_CRD)]);

    let first = {
        let generator = ProviderGenerator::new(GeneratorConfig::default()).unwrap();
        generator
            .render(&generator.plan(&load(schemas.path())))
            .unwrap()
    };
    let second = {
        let generator = ProviderGenerator::new(GeneratorConfig::default()).unwrap();
        generator
            .render(&generator.plan(&load(schemas.path())))
            .unwrap()
    };
    assert_eq!(first, second);

    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();
    let generator = ProviderGenerator::new(GeneratorConfig::default()).unwrap();
    generator
        .generate_to_directory(&load(schemas.path()), first_dir.path())
        .unwrap();
    generator
        .generate_to_directory(&load(schemas.path()), second_dir.path())
        .unwrap();
    for relative in first.keys() {
        assert_eq!(
            fs::read(first_dir.path().join(relative)).unwrap(),
            fs::read(second_dir.path().join(relative)).unwrap(),
            "{} differs",
            relative.display()
        );
    }
}

#[test]
fn test_removed_units_do_not_linger() {
    let both = schema_dir(&[("widget.yaml", WIDGET_CRD), ("gadget.yaml", GADGET_CRD)]);
    let widget_only = schema_dir(&[("widget.yaml", WIDGET_CRD)]);
    let output = tempfile::tempdir().unwrap();
    let generator = ProviderGenerator::new(GeneratorConfig::default()).unwrap();

    generator
        .generate_to_directory(&load(both.path()), output.path())
        .unwrap();
    let gadget: PathBuf = output.path().join("src/resources/example_com_gadget_v1.rs");
    assert!(gadget.is_file());

    generator
        .generate_to_directory(&load(widget_only.path()), output.path())
        .unwrap();
    assert!(!gadget.exists());
    assert!(output
        .path()
        .join("src/resources/example_com_widget_v1.rs")
        .is_file());
}

#[test]
fn test_unresolvable_kind_is_skipped() {
    let schemas = schema_dir(&[("swagger.json", SWAGGER)]);
    let output = tempfile::tempdir().unwrap();
    let generator = ProviderGenerator::new(GeneratorConfig::default()).unwrap();
    let report = generator
        .generate_to_directory(&load(schemas.path()), output.path())
        .unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].severity, Severity::Error);
    assert_eq!(report.skipped[0].subject, "v1/Broken");
    assert!(report.skipped[0].message.contains("io.k8s.api.core.v1.Missing"));

    assert!(report.generated.contains(&"k8s_config_map_v1".to_string()));
    assert!(output.path().join("src/resources/config_map_v1.rs").is_file());
    assert!(!output.path().join("src/resources/broken_v1.rs").exists());
}

#[test]
fn test_group_and_category_filters() {
    let schemas = schema_dir(&[("widget.yaml", WIDGET_CRD), ("swagger.json", SWAGGER)]);
    let config = GeneratorConfig::from_yaml(
        "include_groups: [core]\ncategories: [resource]\nprovider_name: kube\n",
    )
    .unwrap();
    let generator = ProviderGenerator::new(config).unwrap();
    let outcome = load_schema_directory(schemas.path()).unwrap();
    let plan = generator.plan(&outcome.registry);

    let names: Vec<&str> = plan
        .units
        .iter()
        .map(|u| u.identifiers.type_name.as_str())
        .collect();
    assert_eq!(names, vec!["kube_config_map_v1"]);

    let files = generator.render(&plan).unwrap();
    assert!(files.contains_key(Path::new("src/resources/mod.rs")));
    assert!(!files.contains_key(Path::new("src/data_sources/mod.rs")));
    assert!(!files.contains_key(Path::new("src/manifests/mod.rs")));
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = GeneratorConfig {
        categories: Vec::new(),
        ..GeneratorConfig::default()
    };
    assert!(ProviderGenerator::new(config).is_err());
}
