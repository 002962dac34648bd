//! # Example Subcommand
//!
//! Synthesizes an example document for a schema and prints it as JSON.
//! The example is validated with the `jsonschema` backend unless
//! `--no-validate` is given.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use skema_schema::{ExampleBuilder, JsonSchemaBackend, Presence, ValidatorBackend};

use crate::context::{absolute, parse_pointer, GlobalArgs};

/// Arguments for `skema example`.
#[derive(Args, Debug)]
pub struct ExampleArgs {
    /// Schema source file (YAML or JSON).
    pub path: PathBuf,

    /// Sub-pointer selecting a nested schema.
    #[arg(long)]
    pub pointer: Option<String>,

    /// Skip validating the synthesized example.
    #[arg(long)]
    pub no_validate: bool,
}

/// Execute `skema example`.
pub fn run_example(args: &ExampleArgs, global: &GlobalArgs) -> Result<u8> {
    let loader = global.loader()?;
    let path = absolute(&args.path)?;
    let pointer = parse_pointer(args.pointer.as_deref());

    let schema = loader
        .load_schema(&path, &pointer, Presence::Required)
        .with_context(|| format!("failed to load {}", path.display()))?
        .context("schema lookup returned nothing")?;

    let backend = JsonSchemaBackend::with_loader(loader);
    let validator: Option<&dyn ValidatorBackend> = if args.no_validate { None } else { Some(&backend) };
    let example = ExampleBuilder::new(validator)
        .build_example(&schema)
        .with_context(|| format!("failed to synthesize an example for {}", path.display()))?;

    println!("{}", serde_json::to_string_pretty(&example)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_example_prints_valid_example() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.yaml");
        std::fs::write(&path, "type: object\nproperties:\n  name: {type: string}\nrequired: [name]\n").unwrap();
        let args = ExampleArgs {
            path,
            pointer: None,
            no_validate: false,
        };
        let global = GlobalArgs {
            cache_dir: Some(dir.path().join("cache")),
            ..GlobalArgs::default()
        };
        assert_eq!(run_example(&args, &global).unwrap(), 0);
    }

    #[test]
    fn run_example_reports_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "allOf:\n  - const: 1\n  - const: two\n").unwrap();
        let args = ExampleArgs {
            path,
            pointer: None,
            no_validate: true,
        };
        let global = GlobalArgs {
            cache_dir: Some(dir.path().join("cache")),
            ..GlobalArgs::default()
        };
        let err = run_example(&args, &global).unwrap_err();
        assert!(format!("{err:#}").contains("example synthesis failed"));
    }
}
