//! # Durable Cache Storage
//!
//! A key-addressed byte store on the local filesystem. Each [`CacheKey`]
//! addresses one artifact per [`ArtifactKind`]:
//!
//! ```text
//! {dir}/{key}.tree.json   engine-native tree envelope
//! {dir}/{key}.json        canonical JSON re-encoding of the source
//! ```
//!
//! ## Publishing
//!
//! Artifacts are never written in place. [`CacheStore::publish`] writes
//! `{artifact}.tmp`, syncs it, then renames it over the canonical path, so
//! readers observe either the previous artifact or the complete new one.
//! On any failure the temp file is removed.
//!
//! ## Locking
//!
//! [`CacheStore::lock`] takes an exclusive advisory lock on
//! `{artifact}.lock`. The lock is held by the returned [`CacheLock`] and
//! released when it is dropped. Lock files are left in place.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use skema_core::{CacheKey, SkemaError};

// ---------------------------------------------------------------------------
// Artifact kinds
// ---------------------------------------------------------------------------

/// Namespace of a cache artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Serialized tree, reloaded by this engine.
    Tree,
    /// Canonical JSON text, for other validator backends.
    Source,
}

impl ArtifactKind {
    /// File extension of this namespace.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tree => "tree.json",
            Self::Source => "json",
        }
    }

    /// Short name used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Source => "source",
        }
    }
}

// ---------------------------------------------------------------------------
// CacheStore
// ---------------------------------------------------------------------------

/// Filesystem-backed artifact store rooted at one directory.
///
/// The directory does not need to exist yet; it is created on the first
/// [`lock`](CacheStore::lock) or [`publish`](CacheStore::publish).
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

/// Exclusive advisory lock on one cache artifact.
#[derive(Debug)]
pub struct CacheLock {
    // Closing the handle releases the lock.
    _file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore {
    /// Create a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Canonical path of the artifact for `key` in namespace `kind`.
    pub fn artifact_path(&self, key: &CacheKey, kind: ArtifactKind) -> PathBuf {
        self.dir.join(format!("{}.{}", key.to_hex(), kind.extension()))
    }

    /// Returns true if the artifact has been published.
    pub fn exists(&self, key: &CacheKey, kind: ArtifactKind) -> bool {
        self.artifact_path(key, kind).is_file()
    }

    /// Block until the exclusive lock for the artifact is acquired.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure` if the cache directory or lock file cannot
    /// be created, or the lock cannot be taken.
    pub fn lock(&self, key: &CacheKey, kind: ArtifactKind) -> Result<CacheLock, SkemaError> {
        fs::create_dir_all(&self.dir).map_err(|e| SkemaError::storage(&self.dir, e))?;
        let path = with_suffix(&self.artifact_path(key, kind), "lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| SkemaError::storage(&path, e))?;
        fs2::FileExt::lock_exclusive(&file).map_err(|e| SkemaError::storage(&path, e))?;
        Ok(CacheLock { _file: file, path })
    }

    /// Read a published artifact. Returns `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure` for any other I/O error.
    pub fn read(&self, key: &CacheKey, kind: ArtifactKind) -> Result<Option<Vec<u8>>, SkemaError> {
        let path = self.artifact_path(key, kind);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SkemaError::storage(path, e)),
        }
    }

    /// Atomically replace the artifact with `bytes`.
    ///
    /// # Errors
    ///
    /// Returns `StorageFailure` if staging or renaming fails. No temp file
    /// is left behind and the canonical path is untouched in that case.
    pub fn publish(&self, key: &CacheKey, kind: ArtifactKind, bytes: &[u8]) -> Result<PathBuf, SkemaError> {
        fs::create_dir_all(&self.dir).map_err(|e| SkemaError::storage(&self.dir, e))?;
        let path = self.artifact_path(key, kind);
        let tmp = with_suffix(&path, "tmp");

        let staged = write_synced(&tmp, bytes).and_then(|()| fs::rename(&tmp, &path));
        if let Err(e) = staged {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %tmp.display(), error = %cleanup, "failed to discard temp artifact");
                }
            }
            return Err(SkemaError::storage(path, e));
        }
        tracing::debug!(key = %key, kind = kind.as_str(), path = %path.display(), "published cache artifact");
        Ok(path)
    }

    /// Modification time of a published artifact, if it exists.
    pub fn modified(&self, key: &CacheKey, kind: ArtifactKind) -> Option<SystemTime> {
        fs::metadata(self.artifact_path(key, kind))
            .and_then(|m| m.modified())
            .ok()
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
