//! # Load Subcommands
//!
//! `skema load` prints the cached, preprocessed tree for a schema;
//! `skema raw` prints its canonical JSON source artifact.
//!
//! ```bash
//! skema load schemas/user.yaml --pointer definitions/address
//! skema raw schemas/user.yaml --optional --pointer definitions/phone
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use skema_schema::Presence;

use crate::context::{absolute, parse_pointer, GlobalArgs};

/// Arguments shared by `load` and `raw`.
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Schema source file (YAML or JSON).
    pub path: PathBuf,

    /// Sub-pointer selecting a nested schema, e.g. `definitions/user`.
    #[arg(long)]
    pub pointer: Option<String>,

    /// Print `null` instead of failing when the pointer selects nothing.
    #[arg(long)]
    pub optional: bool,
}

impl LoadArgs {
    fn presence(&self) -> Presence {
        if self.optional {
            Presence::Optional
        } else {
            Presence::Required
        }
    }
}

/// Execute `skema load`.
pub fn run_load(args: &LoadArgs, global: &GlobalArgs) -> Result<u8> {
    let loader = global.loader()?;
    let path = absolute(&args.path)?;
    let pointer = parse_pointer(args.pointer.as_deref());

    let node = loader
        .load_schema(&path, &pointer, args.presence())
        .with_context(|| format!("failed to load {}", path.display()))?;
    let value = match node {
        Some(node) => node.to_json()?,
        None => serde_json::Value::Null,
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(0)
}

/// Execute `skema raw`.
pub fn run_raw(args: &LoadArgs, global: &GlobalArgs) -> Result<u8> {
    let loader = global.loader()?;
    let path = absolute(&args.path)?;
    let pointer = parse_pointer(args.pointer.as_deref());

    let text = loader
        .load_raw_schema(&path, &pointer, args.presence())
        .with_context(|| format!("failed to load {}", path.display()))?;
    println!("{}", text.as_deref().unwrap_or("null"));
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(dir: &std::path::Path) -> GlobalArgs {
        GlobalArgs {
            cache_dir: Some(dir.join("cache")),
            ..GlobalArgs::default()
        }
    }

    #[test]
    fn run_load_succeeds_for_existing_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.yaml");
        std::fs::write(&path, "type: string\n").unwrap();
        let args = LoadArgs {
            path,
            pointer: None,
            optional: false,
        };
        assert_eq!(run_load(&args, &global(dir.path())).unwrap(), 0);
        assert_eq!(run_raw(&args, &global(dir.path())).unwrap(), 0);
    }

    #[test]
    fn run_load_missing_required_pointer_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.yaml");
        std::fs::write(&path, "type: string\n").unwrap();
        let args = LoadArgs {
            path,
            pointer: Some("definitions/x".into()),
            optional: false,
        };
        let err = run_load(&args, &global(dir.path())).unwrap_err();
        assert!(format!("{err:#}").contains("not found"));
    }

    #[test]
    fn run_raw_optional_pointer_prints_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.yaml");
        std::fs::write(&path, "type: string\n").unwrap();
        let args = LoadArgs {
            path,
            pointer: Some("definitions/x".into()),
            optional: true,
        };
        assert_eq!(run_raw(&args, &global(dir.path())).unwrap(), 0);
    }
}
