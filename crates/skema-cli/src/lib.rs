//! # skema-cli — Command-Line Interface
//!
//! Thin clap front end over `skema-schema`.
//!
//! ## Subcommands
//!
//! - `load` — print the cached, preprocessed schema tree
//! - `raw` — print the canonical JSON source artifact
//! - `example` — synthesize (and validate) an example document
//! - `check` — validate a document against a schema
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; schema logic lives in `skema-schema`.
//! - Handlers return `anyhow::Result<u8>` exit codes.

pub mod check;
pub mod context;
pub mod example;
pub mod load;
