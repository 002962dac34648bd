//! # Check Subcommand
//!
//! Validates a YAML or JSON document against a schema and lists every
//! issue. Exits with status 1 when the document is invalid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use skema_schema::decode::parse_yaml;
use skema_schema::{JsonSchemaBackend, Presence, ValidatorBackend};

use crate::context::{absolute, parse_pointer, GlobalArgs};

/// Arguments for `skema check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema source file (YAML or JSON).
    pub path: PathBuf,

    /// Document to validate.
    #[arg(long)]
    pub instance: PathBuf,

    /// Sub-pointer selecting a nested schema.
    #[arg(long)]
    pub pointer: Option<String>,
}

/// Execute `skema check`.
pub fn run_check(args: &CheckArgs, global: &GlobalArgs) -> Result<u8> {
    let loader = global.loader()?;
    let path = absolute(&args.path)?;
    let pointer = parse_pointer(args.pointer.as_deref());

    let schema = loader
        .load_schema(&path, &pointer, Presence::Required)
        .with_context(|| format!("failed to load {}", path.display()))?
        .context("schema lookup returned nothing")?;

    let text = std::fs::read_to_string(&args.instance)
        .with_context(|| format!("failed to read {}", args.instance.display()))?;
    let instance = parse_yaml(&text).with_context(|| format!("failed to parse {}", args.instance.display()))?;

    let issues = JsonSchemaBackend::with_loader(loader).check(&instance, &schema)?;
    if issues.is_empty() {
        println!("OK: {}", args.instance.display());
        return Ok(0);
    }

    println!("INVALID: {} ({} issues)", args.instance.display(), issues.len());
    for issue in &issues {
        println!("  {issue}");
    }
    Ok(1)
}
