//! # Validator Backends
//!
//! The engine never interprets JSON-Schema keywords itself. Validation is
//! delegated to a [`ValidatorBackend`], which reports issues as
//! `(path segments, message)` pairs independent of the backend that
//! produced them.
//!
//! ## JSON Schema Backend
//!
//! [`JsonSchemaBackend`] compiles schemas with the `jsonschema` crate
//! (Draft 7). Loaded schemas carry their location under `id`; the backend
//! mirrors it into `$id` so relative `$ref`s resolve against the schema's
//! own file. Referenced documents are fetched by a retriever that only
//! serves `file:///` URIs, through a [`SchemaLoader`] so they are decoded
//! and preprocessed exactly like the schema that references them.

use jsonschema::{Retrieve, Uri};
use serde_json::Value;
use skema_core::location::{pointer_segments, split_fragment};
use skema_core::{uri_to_path, SchemaNode, SkemaError, ValidationIssue, ID_KEY};

use crate::loader::{Presence, SchemaLoader};

/// Identifier key understood by Draft 6 and later.
const DOLLAR_ID_KEY: &str = "$id";

/// Validator capability used by the example synthesizer and the CLI.
pub trait ValidatorBackend: Send + Sync {
    /// Validate `value` against `schema`. An empty list means valid.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` if the schema cannot be compiled, including
    /// any `$ref` that cannot be resolved.
    fn check(&self, value: &Value, schema: &SchemaNode) -> Result<Vec<ValidationIssue>, SkemaError>;
}

/// Backend built on the `jsonschema` crate.
#[derive(Debug, Clone, Default)]
pub struct JsonSchemaBackend {
    loader: Option<SchemaLoader>,
}

impl JsonSchemaBackend {
    /// A backend that reads referenced files directly, without caching.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that loads referenced files through `loader`'s cache.
    pub fn with_loader(loader: SchemaLoader) -> Self {
        Self { loader: Some(loader) }
    }

    fn compile(&self, schema: &SchemaNode) -> Result<jsonschema::Validator, SkemaError> {
        let document = backend_document(schema.to_json()?);

        let retriever = match &self.loader {
            Some(loader) => LoaderRetriever {
                loader: loader.clone(),
                cached: true,
            },
            None => LoaderRetriever {
                loader: SchemaLoader::new(std::env::temp_dir()),
                cached: false,
            },
        };

        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft7);
        opts.with_retriever(retriever);
        opts.build(&document)
            .map_err(|e| SkemaError::malformed(schema.describe(), e.to_string()))
    }
}

impl ValidatorBackend for JsonSchemaBackend {
    fn check(&self, value: &Value, schema: &SchemaNode) -> Result<Vec<ValidationIssue>, SkemaError> {
        let validator = self.compile(schema)?;
        let issues: Vec<ValidationIssue> = validator
            .iter_errors(value)
            .map(|e| ValidationIssue::new(pointer_segments(&e.instance_path.to_string()), e.to_string()))
            .collect();
        if !issues.is_empty() {
            tracing::debug!(schema = %schema.describe(), count = issues.len(), "validation issues");
        }
        Ok(issues)
    }
}

/// Serves `file:///` references through a [`SchemaLoader`].
struct LoaderRetriever {
    loader: SchemaLoader,
    cached: bool,
}

impl Retrieve for LoaderRetriever {
    fn retrieve(&self, uri: &Uri<&str>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        let (document, pointer) = split_fragment(uri_str);
        let path = uri_to_path(document).map_err(|_| {
            format!("unable to resolve '$ref' to {uri_str}: only local file:/// URIs are supported; the referencing schema is probably missing 'id'")
        })?;

        let node = if self.cached {
            self.loader.load_schema(&path, pointer.as_slice(), Presence::Required)?
        } else {
            self.loader.build(&path, pointer.as_slice(), Presence::Required)?
        };
        let node = node.ok_or_else(|| format!("{uri_str} resolved to nothing"))?;
        tracing::debug!(uri = uri_str, "retrieved referenced schema");
        Ok(backend_document(node.to_json()?))
    }
}

/// Mirror a root `id` into `$id` for Draft 7 resolution.
fn backend_document(mut document: Value) -> Value {
    if let Value::Object(map) = &mut document {
        if !map.contains_key(DOLLAR_ID_KEY) {
            if let Some(Value::String(id)) = map.get(ID_KEY).cloned() {
                map.insert(DOLLAR_ID_KEY.to_string(), Value::String(id));
            }
        }
    }
    document
}
