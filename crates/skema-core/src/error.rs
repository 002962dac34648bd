//! # Error Types — Structured Error Taxonomy
//!
//! Defines the single error type shared by every skema crate. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Nothing is retried internally. Every variant propagates to the caller,
//!   which decides recovery policy.
//! - `NotFound` is the only variant a caller routinely recovers from (by
//!   asking for an optional lookup instead of a required one).
//! - Storage failures carry the path that failed and the underlying I/O
//!   error; a failed build never leaves a partial artifact behind.
//! - Synthesis failures carry the offending example and the full list of
//!   validation issues so the authoring error can be located.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Top-level error type for skema.
#[derive(Error, Debug)]
pub enum SkemaError {
    /// A source file or a required sub-pointer segment does not exist.
    #[error("not found: {path}: {reason}")]
    NotFound {
        /// The path (or path plus pointer) that was looked up.
        path: String,
        /// What was missing.
        reason: String,
    },

    /// Source text failed to decode, or a reference or address could not be
    /// resolved. Always an authoring or configuration defect.
    #[error("malformed input in {context}: {reason}")]
    MalformedInput {
        /// Where the defect was found (a path, URI, or node description).
        context: String,
        /// Description of the defect.
        reason: String,
    },

    /// A normalization rule's preconditions are violated by the schema.
    #[error("policy conflict at {node}: {reason}")]
    PolicyConflict {
        /// Description of the offending node.
        node: String,
        /// The violated precondition.
        reason: String,
    },

    /// Example synthesis hit incompatible partial candidates, or the
    /// synthesized example does not validate against its own schema.
    #[error("example synthesis failed: {reason}{}", render_issues(.issues))]
    SynthesisConflict {
        /// Why synthesis failed.
        reason: String,
        /// The offending example value.
        example: Value,
        /// Validation issues reported for `example`, empty for merge conflicts.
        issues: Vec<ValidationIssue>,
    },

    /// Lock acquisition, temp-file write, or atomic publish failed.
    #[error("storage failure at {}: {source}", .path.display())]
    StorageFailure {
        /// The file the operation was acting on.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl SkemaError {
    /// Shorthand for [`SkemaError::MalformedInput`].
    pub fn malformed(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`SkemaError::StorageFailure`].
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageFailure {
            path: path.into(),
            source,
        }
    }

    /// Returns true for [`SkemaError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A single issue reported by a validator backend.
///
/// The path is a structural locator into the validated value, independent of
/// which backend produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Segments leading from the value root to the offending element.
    pub path: Vec<String>,
    /// Human-readable description of the issue.
    pub message: String,
}

impl ValidationIssue {
    /// Create an issue from path segments and a message.
    pub fn new(path: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}: {}", self.path.join("/"), self.message)
    }
}

fn render_issues(issues: &[ValidationIssue]) -> String {
    issues.iter().map(|i| format!("\n  {i}")).collect()
}
