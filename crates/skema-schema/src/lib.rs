//! # skema-schema — Schema Processing Pipeline
//!
//! Everything between a schema file on disk and a usable, normalized,
//! validated schema tree:
//!
//! - [`decode`] — YAML/JSON source text to [`SchemaNode`](skema_core::SchemaNode) trees.
//! - [`preprocess`] — policy-driven normalization with reference-closure
//!   inlining of global definitions.
//! - [`cache`] — durable key-addressed artifact store with advisory locking
//!   and temp-then-rename publishing.
//! - [`loader`] — the build-once pipeline tying the above together.
//! - [`validate`] — validator backends, including one built on `jsonschema`.
//! - [`example`] — example synthesis from schema structure.
//! - [`config`] — file-based loader configuration.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use skema_schema::{ExampleBuilder, JsonSchemaBackend, Presence, SchemaLoader, ROOT_POINTER};
//!
//! let loader = SchemaLoader::new("/var/cache/skema");
//! let schema = loader
//!     .load_schema(Path::new("/srv/schemas/user.yaml"), ROOT_POINTER, Presence::Required)?
//!     .expect("required lookups never return None");
//! let backend = JsonSchemaBackend::with_loader(loader.clone());
//! let example = ExampleBuilder::new(Some(&backend)).build_example(&schema)?;
//! println!("{example}");
//! # Ok::<(), skema_core::SkemaError>(())
//! ```

pub mod cache;
pub mod config;
pub mod decode;
pub mod example;
pub mod loader;
pub mod preprocess;
pub mod validate;

pub use cache::{ArtifactKind, CacheLock, CacheStore};
pub use config::{PolicyConfig, SkemaConfig};
pub use decode::{Decoder, JsonDecoder, YamlDecoder};
pub use example::ExampleBuilder;
pub use loader::{LoaderOptions, Presence, SchemaLoader, ROOT_POINTER};
pub use preprocess::PreprocessorPolicy;
pub use validate::{JsonSchemaBackend, ValidatorBackend};
