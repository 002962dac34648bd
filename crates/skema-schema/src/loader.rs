//! # Cache-Backed Schema Loader
//!
//! Resolves `(source path, sub-pointer)` pairs to schema trees and keeps
//! the result as a durable cache artifact.
//!
//! ## Build Steps
//!
//! 1. Read the source at an absolute local path and decode it.
//! 2. Descend the sub-pointer one mapping key at a time.
//! 3. Stamp the node's `id` with the source's `file://` URI (optional).
//! 4. Run the configured preprocessing policy over the node (optional).
//!
//! ## Build-Once Contract
//!
//! Concurrent loads of the same key, from any number of threads or
//! processes, trigger at most one build. The artifact's exclusive lock is
//! held across check, build, publish and the final read, so a caller that
//! waited on the lock always reads the freshly published artifact. When
//! `always_rebuild` is off an existing artifact is read without locking;
//! artifacts only ever appear through an atomic rename.
//!
//! Two references to one node in a built tree are not the same node after
//! reload: artifacts are reconstructed fresh on every load.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skema_core::{path_to_uri, CacheKey, SchemaNode, SchemaValue, SkemaError, ID_KEY};

use crate::cache::{ArtifactKind, CacheStore};
use crate::decode::{Decoder, YamlDecoder};
use crate::preprocess::PreprocessorPolicy;

/// Sub-pointer selecting the document root.
pub const ROOT_POINTER: &[&str] = &[];

/// Version of the tree artifact envelope.
const TREE_FORMAT: u32 = 1;

/// Whether a missing source or pointer segment is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// A missing segment is `NotFound`.
    Required,
    /// A missing segment yields `Ok(None)`.
    Optional,
}

/// Loader toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Rebuild on every load, ignoring existing artifacts.
    pub always_rebuild: bool,
    /// Stamp loaded nodes with their source URI under `id`.
    pub stamp_id: bool,
    /// Rebuild when the source was modified after its artifact.
    pub rebuild_stale: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            always_rebuild: true,
            stamp_id: true,
            rebuild_stale: false,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TreeEnvelope {
    format: u32,
    source: String,
    schema: Value,
}

/// Loads schemas through a durable build-once cache.
///
/// Cheap to clone; clones share the decoder and policy.
#[derive(Clone)]
pub struct SchemaLoader {
    store: CacheStore,
    decoder: Arc<dyn Decoder>,
    policy: Option<Arc<PreprocessorPolicy>>,
    options: LoaderOptions,
}

impl std::fmt::Debug for SchemaLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaLoader")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SchemaLoader {
    /// A loader caching into `cache_dir` with the YAML decoder, no policy,
    /// and default options.
    pub fn new(cache_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            store: CacheStore::new(cache_dir),
            decoder: Arc::new(YamlDecoder),
            policy: None,
            options: LoaderOptions::default(),
        }
    }

    /// Replace the decoder.
    pub fn with_decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Preprocess every built node with `policy`.
    pub fn with_policy(mut self, policy: PreprocessorPolicy) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    /// Replace the options.
    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    pub fn options(&self) -> LoaderOptions {
        self.options
    }

    /// The backing artifact store.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// The configured policy, if any.
    pub fn policy(&self) -> Option<&PreprocessorPolicy> {
        self.policy.as_deref()
    }

    /// Build a node from source, bypassing the cache.
    ///
    /// # Errors
    ///
    /// - `MalformedInput` for a relative path, undecodable source, or a
    ///   pointer segment that exists but is not a mapping.
    /// - `NotFound` if the source cannot be read, or a pointer segment is
    ///   missing and `presence` is `Required`.
    /// - `PolicyConflict` from preprocessing.
    pub fn build<S: AsRef<str>>(
        &self,
        path: &Path,
        pointer: &[S],
        presence: Presence,
    ) -> Result<Option<SchemaNode>, SkemaError> {
        let uri = path_to_uri(path)?;
        let text = std::fs::read_to_string(path).map_err(|e| SkemaError::NotFound {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let root = self.decoder.decode(&text).map_err(|e| match e {
            SkemaError::MalformedInput { reason, .. } => SkemaError::malformed(path.display().to_string(), reason),
            other => other,
        })?;

        let Some(node) = descend(root, path, pointer, presence)? else {
            return Ok(None);
        };

        if self.options.stamp_id {
            node.insert(ID_KEY, uri);
        }
        if let Some(policy) = &self.policy {
            policy.apply_recursive(&node)?;
        }
        Ok(Some(node))
    }

    /// Load a node through the tree cache.
    ///
    /// # Errors
    ///
    /// Everything [`build`](SchemaLoader::build) returns, plus
    /// `StorageFailure` at the cache boundary and `MalformedInput` for an
    /// unreadable artifact.
    pub fn load_schema<S: AsRef<str>>(
        &self,
        path: &Path,
        pointer: &[S],
        presence: Presence,
    ) -> Result<Option<SchemaNode>, SkemaError> {
        let key = CacheKey::new(path, pointer);
        let bytes = self.resolve_cached(&key, ArtifactKind::Tree, path, || {
            let schema = match self.build(path, pointer, presence)? {
                Some(node) => node.to_json()?,
                None => Value::Null,
            };
            let envelope = TreeEnvelope {
                format: TREE_FORMAT,
                source: path.display().to_string(),
                schema,
            };
            serde_json::to_vec(&envelope).map_err(|e| SkemaError::malformed(path.display().to_string(), e.to_string()))
        })?;

        let artifact = self.store.artifact_path(&key, ArtifactKind::Tree);
        let context = || artifact.display().to_string();
        let envelope: TreeEnvelope =
            serde_json::from_slice(&bytes).map_err(|e| SkemaError::malformed(context(), e.to_string()))?;
        if envelope.format != TREE_FORMAT {
            return Err(SkemaError::malformed(
                context(),
                format!("unsupported artifact format {}", envelope.format),
            ));
        }
        match envelope.schema {
            Value::Null => absent(path, pointer, presence),
            schema => SchemaNode::from_json(schema).map(Some),
        }
    }

    /// Load a node through the source cache, returning canonical JSON text.
    ///
    /// # Errors
    ///
    /// Same as [`load_schema`](SchemaLoader::load_schema).
    pub fn load_raw_schema<S: AsRef<str>>(
        &self,
        path: &Path,
        pointer: &[S],
        presence: Presence,
    ) -> Result<Option<String>, SkemaError> {
        let key = CacheKey::new(path, pointer);
        let bytes = self.resolve_cached(&key, ArtifactKind::Source, path, || {
            let value = match self.build(path, pointer, presence)? {
                Some(node) => node.to_json()?,
                None => Value::Null,
            };
            serde_json::to_vec_pretty(&value).map_err(|e| SkemaError::malformed(path.display().to_string(), e.to_string()))
        })?;

        let text = String::from_utf8(bytes).map_err(|e| {
            SkemaError::malformed(
                self.store.artifact_path(&key, ArtifactKind::Source).display().to_string(),
                e.to_string(),
            )
        })?;
        if text.trim() == "null" {
            return absent(path, pointer, presence);
        }
        Ok(Some(text))
    }

    fn resolve_cached<F>(
        &self,
        key: &CacheKey,
        kind: ArtifactKind,
        source: &Path,
        build: F,
    ) -> Result<Vec<u8>, SkemaError>
    where
        F: FnOnce() -> Result<Vec<u8>, SkemaError>,
    {
        path_to_uri(source)?;
        if !self.options.always_rebuild && !self.is_stale(key, kind, source) {
            if let Some(bytes) = self.store.read(key, kind)? {
                tracing::debug!(key = %key, kind = kind.as_str(), "cache hit");
                return Ok(bytes);
            }
        }

        let _lock = self.store.lock(key, kind)?;
        let rebuild =
            self.options.always_rebuild || !self.store.exists(key, kind) || self.is_stale(key, kind, source);
        if rebuild {
            tracing::debug!(key = %key, kind = kind.as_str(), source = %source.display(), "building cache artifact");
            let bytes = build()?;
            self.store.publish(key, kind, &bytes)?;
        } else {
            tracing::debug!(key = %key, kind = kind.as_str(), "artifact built by another caller");
        }
        self.store.read(key, kind)?.ok_or_else(|| SkemaError::NotFound {
            path: self.store.artifact_path(key, kind).display().to_string(),
            reason: "cache artifact vanished after publish".into(),
        })
    }

    fn is_stale(&self, key: &CacheKey, kind: ArtifactKind, source: &Path) -> bool {
        if !self.options.rebuild_stale {
            return false;
        }
        let source_modified = std::fs::metadata(source).and_then(|m| m.modified()).ok();
        match (source_modified, self.store.modified(key, kind)) {
            (Some(source), Some(artifact)) => source > artifact,
            _ => false,
        }
    }
}

fn descend<S: AsRef<str>>(
    root: SchemaNode,
    path: &Path,
    pointer: &[S],
    presence: Presence,
) -> Result<Option<SchemaNode>, SkemaError> {
    let mut node = root;
    for (depth, segment) in pointer.iter().enumerate() {
        let segment = segment.as_ref();
        match node.get(segment) {
            None | Some(SchemaValue::Null) => return absent(path, &pointer[..=depth], presence),
            Some(SchemaValue::Node(child)) => node = child,
            Some(_) => {
                return Err(SkemaError::malformed(
                    format!("{}#{}", path.display(), render_pointer(&pointer[..=depth])),
                    "pointer segment does not select a mapping",
                ))
            }
        }
    }
    Ok(Some(node))
}

fn absent<S: AsRef<str>, T>(path: &Path, pointer: &[S], presence: Presence) -> Result<Option<T>, SkemaError> {
    match presence {
        Presence::Optional => Ok(None),
        Presence::Required => Err(SkemaError::NotFound {
            path: format!("{}#{}", path.display(), render_pointer(pointer)),
            reason: "required pointer segment is missing".into(),
        }),
    }
}

fn render_pointer<S: AsRef<str>>(pointer: &[S]) -> String {
    pointer
        .iter()
        .map(|s| format!("/{}", s.as_ref().replace('~', "~0").replace('/', "~1")))
        .collect()
}
