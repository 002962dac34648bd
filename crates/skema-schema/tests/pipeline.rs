//! End-to-end: files on disk, preprocessing, caching, the `jsonschema`
//! backend and example synthesis working together.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use skema_core::{path_to_uri, SkemaError};
use skema_schema::{
    ExampleBuilder, JsonSchemaBackend, LoaderOptions, Presence, PreprocessorPolicy, SchemaLoader, ValidatorBackend,
    ROOT_POINTER,
};

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    fn loader(&self) -> SchemaLoader {
        SchemaLoader::new(self.dir.path().join("cache")).with_options(LoaderOptions {
            always_rebuild: false,
            ..LoaderOptions::default()
        })
    }
}

fn load(loader: &SchemaLoader, path: &Path) -> skema_core::SchemaNode {
    loader.load_schema(path, ROOT_POINTER, Presence::Required).unwrap().unwrap()
}

#[test]
fn synthesized_example_validates_against_its_schema() {
    let ws = Workspace::new();
    let path = ws.write(
        "counter.yaml",
        "type: object\nproperties:\n  n: {type: integer}\nrequired: [n]\n",
    );
    let loader = ws.loader();
    let schema = load(&loader, &path);

    let backend = JsonSchemaBackend::with_loader(loader.clone());
    let example = ExampleBuilder::new(Some(&backend)).build_example(&schema).unwrap();

    assert!(example["n"].is_i64(), "got {example}");
    assert!(backend.check(&example, &schema).unwrap().is_empty());
}

#[test]
fn all_of_conflict_is_reported() {
    let ws = Workspace::new();
    let path = ws.write("conflict.yaml", "allOf:\n  - example: 1\n  - example: a\n");
    let schema = load(&ws.loader(), &path);
    let err = ExampleBuilder::new(None).build_example(&schema).unwrap_err();
    assert!(matches!(err, SkemaError::SynthesisConflict { .. }), "got {err}");
}

#[test]
fn policy_normalized_schema_rejects_undeclared_fields() {
    let ws = Workspace::new();
    let path = ws.write(
        "account.yaml",
        "\
type: object
properties:
  owner: {$ref: '#/definitions/Person'}
  nickname: {type: string}
optional: [nickname]
",
    );
    let policy = PreprocessorPolicy::new()
        .allow_optional_constraint(true)
        .disallow_additional_properties_by_default(true)
        .require_all_properties_by_default(true)
        .global_definitions([(
            "Person",
            skema_core::SchemaNode::from_json(json!({
                "type": "object",
                "properties": {"name": {"type": "string", "minLength": 2}}
            }))
            .unwrap(),
        )]);
    let loader = ws.loader().with_policy(policy);
    let schema = load(&loader, &path);

    let as_json = schema.to_json().unwrap();
    assert_eq!(as_json["required"], json!(["owner"]));
    assert_eq!(as_json["definitions"]["Person"]["required"], json!(["name"]));
    assert_eq!(as_json["definitions"]["Person"]["additionalProperties"], json!(false));

    let backend = JsonSchemaBackend::with_loader(loader.clone());
    let example = ExampleBuilder::new(Some(&backend)).build_example(&schema).unwrap();
    assert_eq!(example, json!({"owner": {"name": "aa"}, "nickname": "a"}));

    let issues = backend
        .check(&json!({"owner": {"name": "ab", "age": 3}}), &schema)
        .unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].path, vec!["owner"]);
}

#[test]
fn references_across_files_resolve_through_the_loader() {
    let ws = Workspace::new();
    ws.write(
        "common.yaml",
        "definitions:\n  Currency: {type: string, enum: [PKR, USD]}\n",
    );
    let path = ws.write(
        "payment.yaml",
        "type: object\nproperties:\n  currency: {$ref: 'common.yaml#/definitions/Currency'}\nrequired: [currency]\n",
    );
    let loader = ws.loader();
    let schema = load(&loader, &path);
    assert_eq!(schema.get_str("id").unwrap(), path_to_uri(&path).unwrap());

    let backend = JsonSchemaBackend::with_loader(loader.clone());
    assert!(backend.check(&json!({"currency": "PKR"}), &schema).unwrap().is_empty());
    let issues = backend.check(&json!({"currency": "EUR"}), &schema).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].path, vec!["currency"]);

    // The referenced document went through the cache as well.
    let common = ws.dir.path().join("common.yaml");
    let key = skema_core::CacheKey::new(&common, ROOT_POINTER);
    assert!(loader.store().exists(&key, skema_schema::ArtifactKind::Tree));
}

#[test]
fn references_resolve_from_directories_with_reserved_characters() {
    let ws = Workspace::new();
    let dir = ws.dir.path().join("my schemas #2");
    std::fs::create_dir(&dir).unwrap();
    let common = dir.join("common.yaml");
    std::fs::write(&common, "definitions:\n  Code: {type: string, minLength: 2}\n").unwrap();
    let path = dir.join("main.yaml");
    std::fs::write(&path, "properties:\n  code: {$ref: 'common.yaml#/definitions/Code'}\n").unwrap();

    let loader = ws.loader();
    let schema = load(&loader, &path);
    let id = schema.get_str("id").unwrap();
    assert!(id.contains("my%20schemas%20%232"), "{id}");

    let backend = JsonSchemaBackend::with_loader(loader.clone());
    assert!(backend.check(&json!({"code": "ab"}), &schema).unwrap().is_empty());
    assert_eq!(backend.check(&json!({"code": "a"}), &schema).unwrap().len(), 1);

    let key = skema_core::CacheKey::new(&common, ROOT_POINTER);
    assert!(loader.store().exists(&key, skema_schema::ArtifactKind::Tree));
}

#[test]
fn relative_reference_without_id_is_malformed() {
    let ws = Workspace::new();
    ws.write("common.yaml", "definitions:\n  Code: {type: string}\n");
    let path = ws.write("main.yaml", "properties:\n  code: {$ref: 'common.yaml#/definitions/Code'}\n");
    let loader = ws.loader().with_options(LoaderOptions {
        stamp_id: false,
        always_rebuild: false,
        rebuild_stale: false,
    });
    let schema = load(&loader, &path);

    let backend = JsonSchemaBackend::with_loader(loader);
    let err = backend.check(&json!({"code": "x"}), &schema).unwrap_err();
    assert!(matches!(err, SkemaError::MalformedInput { .. }), "got {err}");
}

#[test]
fn sub_pointer_loads_share_nothing_with_root_loads() {
    let ws = Workspace::new();
    let path = ws.write(
        "catalog.yaml",
        "definitions:\n  Item: {type: object, properties: {sku: {type: string}}}\n",
    );
    let loader = ws.loader();
    let item = loader
        .load_schema(&path, &["definitions", "Item"], Presence::Required)
        .unwrap()
        .unwrap();
    assert_eq!(item.get_str("id").unwrap(), path_to_uri(&path).unwrap());

    let missing = loader
        .load_schema(&path, &["definitions", "Order"], Presence::Optional)
        .unwrap();
    assert!(missing.is_none());

    let example = ExampleBuilder::new(None).build_example(&item).unwrap();
    assert_eq!(example, json!({"sku": "a"}));
}

#[test]
fn raw_artifact_is_portable_json() {
    let ws = Workspace::new();
    let path = ws.write("tag.yaml", "type: string\nminLength: 1\n");
    let raw = ws
        .loader()
        .load_raw_schema(&path, ROOT_POINTER, Presence::Required)
        .unwrap()
        .unwrap();
    let value: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        value,
        json!({"type": "string", "minLength": 1, "id": path_to_uri(&path).unwrap()})
    );
}
