//! Identifier stability and collision handling across a whole registry

use kubernetes_provider_generator_common::{Category, GeneratorConfig, UnitIdentifiers};
use kubernetes_provider_generator_generator::{ProviderGenerator, ProviderPlan};
use kubernetes_provider_generator_parser::load_schema_directory;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;

fn crd(group: &str, kind: &str, extra_root: &str) -> String {
    format!(
        r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: {plural}.{group}
spec:
  group: {group}
  scope: Namespaced
  names:
    kind: {kind}
    plural: {plural}
  versions:
    - name: v1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
          properties:{extra_root}
            spec:
              type: object
              properties:
                size:
                  type: integer
"#,
        group = group,
        kind = kind,
        plural = format!("{}s", kind.to_lowercase()),
        extra_root = extra_root,
    )
}

fn plan_for(files: &[(String, String)]) -> ProviderPlan {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    let outcome = load_schema_directory(dir.path()).unwrap();
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    ProviderGenerator::new(GeneratorConfig::default())
        .unwrap()
        .plan(&outcome.registry)
}

/// Identifiers keyed by `group/version/Kind` and category
fn identifiers(plan: &ProviderPlan) -> BTreeMap<String, UnitIdentifiers> {
    plan.units
        .iter()
        .map(|u| (u.owner_key(), u.identifiers.clone()))
        .collect()
}

#[test]
fn test_colliding_groups_get_distinct_names() {
    let plan = plan_for(&[
        ("dash.yaml".to_string(), crd("a-b.io", "Thing", "")),
        ("dot.yaml".to_string(), crd("a.b.io", "Thing", "")),
    ]);
    let ids = identifiers(&plan);

    // neither group keeps the contested stem
    let dashed = &ids["a-b.io/v1/Thing/resource"];
    let dotted = &ids["a.b.io/v1/Thing/resource"];
    assert_eq!(dashed.type_name, "k8s_a_b_io_thing_v1_a_dash_b_dot_io");
    assert_eq!(dashed.module, "a_b_io_thing_v1_a_dash_b_dot_io");
    assert_eq!(dotted.type_name, "k8s_a_b_io_thing_v1_a_dot_b_dot_io");
    assert_ne!(dotted.module, dashed.module);
    assert_ne!(dotted.struct_name, dashed.struct_name);
    assert_ne!(dotted.constructor, dashed.constructor);
}

#[test]
fn test_identifiers_are_unique() {
    let plan = plan_for(&[
        ("dash.yaml".to_string(), crd("a-b.io", "Thing", "")),
        ("dot.yaml".to_string(), crd("a.b.io", "Thing", "")),
        ("gadget.yaml".to_string(), crd("example.com", "Gadget", "")),
    ]);

    for category in Category::ALL {
        let units: Vec<_> = plan.units_in(category).collect();
        let type_names: BTreeSet<_> = units.iter().map(|u| &u.identifiers.type_name).collect();
        let modules: BTreeSet<_> = units.iter().map(|u| &u.identifiers.module).collect();
        assert_eq!(type_names.len(), units.len());
        assert_eq!(modules.len(), units.len());
    }

    let structs: BTreeSet<_> = plan
        .units
        .iter()
        .flat_map(|u| [&u.identifiers.struct_name, &u.identifiers.model_name])
        .chain(plan.nested_types.values().map(|t| &t.struct_name))
        .collect();
    assert_eq!(structs.len(), plan.units.len() * 2 + plan.nested_types.len());

    let constructors: BTreeSet<_> = plan.units.iter().map(|u| &u.identifiers.constructor).collect();
    assert_eq!(constructors.len(), plan.units.len());
}

/// Spec struct name per `group/version/Kind`, for specs used by one kind only
fn nested_names(plan: &ProviderPlan) -> BTreeMap<String, String> {
    plan.nested_types
        .values()
        .filter(|t| t.users.len() == 1 && t.attribute_by_json_name("size").is_some())
        .flat_map(|t| t.users.iter().map(move |u| (u.clone(), t.struct_name.clone())))
        .collect()
}

/// A kind whose spec differs from [`crd`]'s, so its spec type is not shared
fn widget(group: &str) -> String {
    crd(group, "Widget", "").replace("size:\n                  type: integer", "size:\n                  type: string")
}

#[test]
fn test_unrelated_kind_keeps_existing_names() {
    let base = vec![
        ("dash.yaml".to_string(), crd("a-b.io", "Thing", "")),
        ("dot.yaml".to_string(), crd("a.b.io", "Thing", "")),
        ("widget.yaml".to_string(), widget("b.io")),
    ];
    let before = plan_for(&base);

    let mut extended = base.clone();
    extended.push(("aaa.yaml".to_string(), crd("aaa.io", "Gizmo", "")));
    extended.push(("zzz.yaml".to_string(), crd("zzz.io", "Gizmo", "")));
    let after = plan_for(&extended);

    let (ids_before, ids_after) = (identifiers(&before), identifiers(&after));
    assert_eq!(ids_after.len(), ids_before.len() + 6);
    for (owner, ids) in &ids_before {
        assert_eq!(&ids_after[owner], ids, "{} was renamed", owner);
    }
    assert_eq!(nested_names(&before)["b.io/v1/Widget"], "WidgetSpec");
    assert_eq!(nested_names(&after)["b.io/v1/Widget"], "WidgetSpec");
}

#[test]
fn test_colliding_kind_names_do_not_depend_on_order() {
    let alone = plan_for(&[("b.yaml".to_string(), widget("b.io"))]);
    assert_eq!(nested_names(&alone)["b.io/v1/Widget"], "WidgetSpec");

    // one contender sorts before b.io, the other after it
    let with_first = plan_for(&[
        ("b.yaml".to_string(), widget("b.io")),
        ("a.yaml".to_string(), widget("a.io").replace("string", "boolean")),
    ]);
    let with_last = plan_for(&[
        ("b.yaml".to_string(), widget("b.io")),
        ("z.yaml".to_string(), widget("z.io").replace("string", "boolean")),
    ]);

    let first = nested_names(&with_first);
    let last = nested_names(&with_last);
    assert_eq!(first["b.io/v1/Widget"], "WidgetSpecV1BIo");
    assert_eq!(last["b.io/v1/Widget"], "WidgetSpecV1BIo");
    assert_eq!(first["a.io/v1/Widget"], "WidgetSpecV1AIo");
    assert_eq!(last["z.io/v1/Widget"], "WidgetSpecV1ZIo");

    // unit identifiers are per group and unaffected
    assert_eq!(
        identifiers(&with_first)["b.io/v1/Widget/resource"],
        identifiers(&alone)["b.io/v1/Widget/resource"]
    );
}

#[test]
fn test_root_field_clashing_with_id_is_qualified() {
    let extra = "\n            id:\n              type: string";
    let plan = plan_for(&[("thing.yaml".to_string(), crd("example.com", "Thing", extra))]);

    for unit in &plan.units {
        let id = unit.attributes.iter().find(|a| a.name == "id").unwrap();
        assert_eq!(id.json_name, None);

        let field = unit
            .attributes
            .iter()
            .find(|a| a.json_name.as_deref() == Some("id"))
            .unwrap();
        assert_eq!(field.name, "id_field");
    }
}

#[test]
fn test_planning_twice_yields_same_names() {
    let files = vec![
        ("dash.yaml".to_string(), crd("a-b.io", "Thing", "")),
        ("dot.yaml".to_string(), crd("a.b.io", "Thing", "")),
    ];
    let first = plan_for(&files);
    let second = plan_for(&files);

    assert_eq!(identifiers(&first), identifiers(&second));
    let nested = |plan: &ProviderPlan| -> Vec<String> {
        plan.sorted_nested_types()
            .into_iter()
            .map(|t| format!("{} {}", t.struct_name, t.builder_fn))
            .collect()
    };
    assert_eq!(nested(&first), nested(&second));
}
