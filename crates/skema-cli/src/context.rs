//! # Shared CLI Context
//!
//! Global flags and the helpers every subcommand uses to turn them into a
//! configured [`SchemaLoader`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use skema_core::location::pointer_segments;
use skema_schema::{SchemaLoader, SkemaConfig};

/// Flags accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to a YAML or JSON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache directory; overrides the configuration file.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Rebuild every artifact instead of reusing cached ones.
    #[arg(long, global = true)]
    pub always_rebuild: bool,

    /// Reuse cached artifacts even when the configuration says to rebuild.
    #[arg(long, global = true, conflicts_with = "always_rebuild")]
    pub reuse_cache: bool,
}

impl GlobalArgs {
    /// Resolve the effective configuration: file (or defaults), then flags.
    pub fn config(&self) -> Result<SkemaConfig> {
        let mut config = match &self.config {
            Some(path) => SkemaConfig::from_file(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?,
            None => SkemaConfig::default(),
        };
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = absolute(dir)?;
        }
        if self.always_rebuild {
            config.always_rebuild = true;
        }
        if self.reuse_cache {
            config.always_rebuild = false;
        }
        Ok(config)
    }

    /// Build the loader for this invocation.
    pub fn loader(&self) -> Result<SchemaLoader> {
        let config = self.config()?;
        tracing::debug!(
            cache_dir = %config.cache_dir.display(),
            always_rebuild = config.always_rebuild,
            "configured loader"
        );
        config.loader().context("invalid preprocessing configuration")
    }
}

/// Split a `--pointer` argument (`definitions/user` or `/definitions/user`)
/// into segments.
pub fn parse_pointer(pointer: Option<&str>) -> Vec<String> {
    pointer.map(pointer_segments).unwrap_or_default()
}

/// Make a command-line path absolute against the working directory.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pointer_accepts_leading_slash() {
        assert_eq!(parse_pointer(Some("/definitions/user")), vec!["definitions", "user"]);
        assert_eq!(parse_pointer(Some("definitions/a~1b")), vec!["definitions", "a/b"]);
        assert!(parse_pointer(None).is_empty());
    }

    #[test]
    fn absolute_keeps_absolute_paths() {
        let path = std::env::temp_dir().join("a.yaml");
        assert_eq!(absolute(&path).unwrap(), path);
        assert!(absolute(Path::new("a.yaml")).unwrap().is_absolute());
    }

    #[test]
    fn flags_override_configuration_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("skema.yaml");
        std::fs::write(&config_path, "always_rebuild: false\ncache_dir: /var/cache/skema\n").unwrap();

        let args = GlobalArgs {
            config: Some(config_path.clone()),
            cache_dir: Some(dir.path().join("cache")),
            always_rebuild: true,
            reuse_cache: false,
        };
        let config = args.config().unwrap();
        assert!(config.always_rebuild);
        assert_eq!(config.cache_dir, dir.path().join("cache"));

        let args = GlobalArgs {
            config: Some(config_path),
            ..GlobalArgs::default()
        };
        let config = args.config().unwrap();
        assert!(!config.always_rebuild);
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/skema"));
    }

    #[test]
    fn missing_configuration_file_is_an_error() {
        let args = GlobalArgs {
            config: Some(PathBuf::from("/nonexistent/skema.yaml")),
            ..GlobalArgs::default()
        };
        assert!(args.config().is_err());
    }
}
