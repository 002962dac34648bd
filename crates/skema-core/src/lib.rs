//! # skema-core — Schema Document Model and Traversal
//!
//! The leaf crate of the skema workspace. It defines the in-memory schema
//! tree, the traversal engine that walks it, and the small set of shared
//! primitives every other crate builds on.
//!
//! ## Key Design Principles
//!
//! 1. **Identity, not structure.** [`SchemaNode`] is a shared handle. Two
//!    handles are the same node iff they point at the same allocation, and
//!    cycle detection de-duplicates on that identity ([`NodeId`]).
//!
//! 2. **Explicit work stacks.** Traversal is pull-based ([`iter`]); the
//!    cycle-safe walk keeps a visited set keyed by [`NodeId`] and always
//!    terminates.
//!
//! 3. **One error taxonomy.** [`SkemaError`] covers not-found, malformed
//!    input, policy conflicts, synthesis conflicts, and storage failures.
//!    Nothing is retried internally.
//!
//! 4. **Local addressing only.** [`location`] converts absolute local paths
//!    to `file://` identifiers and back; everything else is rejected.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `skema-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod iter;
pub mod location;
pub mod node;

// Re-export primary types for ergonomic imports.
pub use digest::CacheKey;
pub use error::{SkemaError, ValidationIssue};
pub use iter::{recursive, recursive_unguarded, shallow};
pub use location::{path_to_uri, uri_to_path};
pub use node::{NodeId, SchemaNode, SchemaValue, ID_KEY, REF_KEY};
