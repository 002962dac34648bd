//! # Location Identity — Paths and URIs
//!
//! Loaded schemas are stamped with an `id` derived from their absolute local
//! path so validator backends can resolve relative `$ref`s against it. The
//! transform is reversible: `uri_to_path(path_to_uri(p)) == p` for every
//! accepted path without empty or `.` components. Reserved characters are
//! percent-encoded on the way out and decoded on the way back.
//!
//! Only local absolute paths are accepted as resolution roots. Relative
//! paths and any URI scheme other than `file://` are rejected.

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::SkemaError;

/// Returns true for `/…`, `\…`, and drive-letter paths such as `C:\…`.
pub fn is_local_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    match bytes.first() {
        Some(b'/') | Some(b'\\') => true,
        Some(c) if c.is_ascii_alphabetic() => {
            bytes.get(1) == Some(&b':') && matches!(bytes.get(2), Some(b'/') | Some(b'\\'))
        }
        _ => false,
    }
}

/// Convert an absolute local path to a `file://` URI.
///
/// Reserved characters (`%`, `#`, `?`, spaces, non-ASCII) are
/// percent-encoded, so the result is a valid `id` for any validator backend.
///
/// # Errors
///
/// Returns `MalformedInput` for relative or non-UTF-8 paths, and for paths
/// the host platform does not consider absolute.
pub fn path_to_uri(path: &Path) -> Result<String, SkemaError> {
    let raw = path
        .to_str()
        .ok_or_else(|| SkemaError::malformed(path.display().to_string(), "path is not valid UTF-8"))?;
    if !is_local_absolute(raw) {
        return Err(SkemaError::malformed(raw, "only local absolute paths are supported"));
    }
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| SkemaError::malformed(raw, "only local absolute paths are supported"))
}

/// Convert a `file:///` URI back to a local path. Any fragment is ignored.
///
/// # Errors
///
/// Returns `MalformedInput` for any other scheme, a URI naming a remote
/// host, or a URI without an absolute path.
pub fn uri_to_path(uri: &str) -> Result<PathBuf, SkemaError> {
    let url = Url::parse(uri).map_err(|e| SkemaError::malformed(uri, format!("invalid URI: {e}")))?;
    if url.scheme() != "file" {
        return Err(SkemaError::malformed(uri, "only local URIs are supported"));
    }
    url.to_file_path()
        .map_err(|()| SkemaError::malformed(uri, "only local URIs are supported"))
}

/// Split a URI into its document part and the JSON-pointer segments of its
/// fragment.
pub fn split_fragment(uri: &str) -> (&str, Vec<String>) {
    match uri.split_once('#') {
        Some((document, fragment)) => (document, pointer_segments(fragment)),
        None => (uri, Vec::new()),
    }
}

/// Split a JSON pointer (`/a/b~1c`) into unescaped segments.
pub fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect()
}
