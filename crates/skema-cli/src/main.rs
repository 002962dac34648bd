//! # skema CLI entry point
//!
//! Parses command-line arguments, installs the tracing subscriber, and
//! dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use skema_cli::check::{run_check, CheckArgs};
use skema_cli::context::GlobalArgs;
use skema_cli::example::{run_example, ExampleArgs};
use skema_cli::load::{run_load, run_raw, LoadArgs};

/// Load, normalize, cache, and exercise schema documents.
#[derive(Parser, Debug)]
#[command(name = "skema", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the cached, preprocessed schema tree as JSON.
    Load(LoadArgs),

    /// Print the canonical JSON source artifact.
    Raw(LoadArgs),

    /// Synthesize an example document for a schema.
    Example(ExampleArgs),

    /// Validate a document against a schema.
    Check(CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "skema CLI starting");

    let result = match &cli.command {
        Commands::Load(args) => run_load(args, &cli.global),
        Commands::Raw(args) => run_raw(args, &cli.global),
        Commands::Example(args) => run_example(args, &cli.global),
        Commands::Check(args) => run_check(args, &cli.global),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cli_parse_load_with_pointer() {
        let cli = Cli::try_parse_from(["skema", "load", "a.yaml", "--pointer", "definitions/user"]).unwrap();
        if let Commands::Load(args) = cli.command {
            assert_eq!(args.path, PathBuf::from("a.yaml"));
            assert_eq!(args.pointer.as_deref(), Some("definitions/user"));
            assert!(!args.optional);
        } else {
            panic!("expected load");
        }
    }

    #[test]
    fn cli_parse_raw_optional() {
        let cli = Cli::try_parse_from(["skema", "raw", "a.yaml", "--optional"]).unwrap();
        assert!(matches!(cli.command, Commands::Raw(ref args) if args.optional));
    }

    #[test]
    fn cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "skema",
            "example",
            "a.yaml",
            "--cache-dir",
            "/tmp/skema",
            "--always-rebuild",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.global.cache_dir, Some(PathBuf::from("/tmp/skema")));
        assert!(cli.global.always_rebuild);
        assert!(matches!(cli.command, Commands::Example(ref args) if !args.no_validate));
    }

    #[test]
    fn cli_parse_check_requires_instance() {
        assert!(Cli::try_parse_from(["skema", "check", "a.yaml"]).is_err());
        let cli = Cli::try_parse_from(["skema", "check", "a.yaml", "--instance", "doc.json"]).unwrap();
        if let Commands::Check(args) = cli.command {
            assert_eq!(args.instance, PathBuf::from("doc.json"));
        } else {
            panic!("expected check");
        }
    }

    #[test]
    fn cli_parse_conflicting_cache_flags() {
        assert!(Cli::try_parse_from(["skema", "load", "a.yaml", "--always-rebuild", "--reuse-cache"]).is_err());
    }

    #[test]
    fn cli_parse_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["skema"]).is_err());
    }
}
