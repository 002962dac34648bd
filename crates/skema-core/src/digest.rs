//! # Cache Key Digest
//!
//! Every cache artifact is addressed by a SHA-256 digest over the source
//! path and the sub-pointer that selected the node:
//!
//! ```text
//! sha256(path || 0x00 || segment_1 || 0x00 || segment_2 ...)
//! ```
//!
//! The key deliberately covers only the address, not the source content.
//! Staleness is handled by the loader's rebuild options.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Digest addressing one cache artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Compute the key for a source path and sub-pointer.
    pub fn new<S: AsRef<str>>(source: &Path, pointer: &[S]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        for (i, segment) in pointer.iter().enumerate() {
            if i > 0 {
                hasher.update([0u8]);
            }
            hasher.update(segment.as_ref().as_bytes());
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the key as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_POINTER: [&str; 0] = [];

    #[test]
    fn test_key_is_deterministic() {
        let a = CacheKey::new(Path::new("/srv/a.yaml"), &["definitions", "user"]);
        let b = CacheKey::new(Path::new("/srv/a.yaml"), &["definitions", "user"]);
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 64);
        assert!(a.to_hex().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_key_depends_on_pointer() {
        let root = CacheKey::new(Path::new("/srv/a.yaml"), &NO_POINTER);
        let sub = CacheKey::new(Path::new("/srv/a.yaml"), &["definitions"]);
        assert_ne!(root, sub);
    }

    #[test]
    fn test_segment_boundaries_matter() {
        let joined = CacheKey::new(Path::new("/srv/a.yaml"), &["ab"]);
        let split = CacheKey::new(Path::new("/srv/a.yaml"), &["a", "b"]);
        assert_ne!(joined, split);
    }

    #[test]
    fn test_known_digest_of_path_only() {
        // sha256("/a\0")
        let key = CacheKey::new(Path::new("/a"), &NO_POINTER);
        let expected = {
            let mut h = Sha256::new();
            h.update(b"/a\0");
            h.finalize()
        };
        assert_eq!(key.as_bytes().as_slice(), expected.as_slice());
    }

    #[test]
    fn test_display_is_hex() {
        let key = CacheKey::new(Path::new("/srv/a.yaml"), &["x"]);
        assert_eq!(key.to_string(), key.to_hex());
    }
}
