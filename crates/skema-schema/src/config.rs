//! # Configuration
//!
//! File-based configuration for a [`SchemaLoader`] and its preprocessing
//! policy. Files are YAML (or JSON, which `serde_yaml` also reads):
//!
//! ```yaml
//! cache_dir: /var/cache/skema
//! always_rebuild: false
//! preprocess:
//!   allow_optional_constraint: true
//!   require_all_properties_by_default: true
//!   removed_keys: [example]
//!   global_definitions:
//!     Money: {type: object, properties: {amount: {type: string}}}
//! ```
//!
//! Every field is optional. Unknown fields are rejected so typos surface
//! instead of silently falling back to defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use skema_core::{SchemaNode, SkemaError};

use crate::loader::{LoaderOptions, SchemaLoader};
use crate::preprocess::PreprocessorPolicy;

// ---------------------------------------------------------------------------
// SkemaConfig
// ---------------------------------------------------------------------------

/// Loader configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkemaConfig {
    /// Directory holding cache artifacts.
    pub cache_dir: PathBuf,
    /// Rebuild on every load.
    pub always_rebuild: bool,
    /// Stamp loaded schemas with their source URI.
    pub stamp_id: bool,
    /// Rebuild artifacts older than their source.
    pub rebuild_stale: bool,
    /// Preprocessing policy; none when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocess: Option<PolicyConfig>,
}

impl Default for SkemaConfig {
    fn default() -> Self {
        let options = LoaderOptions::default();
        Self {
            cache_dir: std::env::temp_dir().join("skema-cache"),
            always_rebuild: options.always_rebuild,
            stamp_id: options.stamp_id,
            rebuild_stale: options.rebuild_stale,
            preprocess: None,
        }
    }
}

impl SkemaConfig {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` for invalid YAML or unknown fields.
    pub fn from_yaml_str(text: &str) -> Result<Self, SkemaError> {
        serde_yaml::from_str(text).map_err(|e| SkemaError::malformed("configuration", e.to_string()))
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file cannot be read, else as
    /// [`from_yaml_str`](SkemaConfig::from_yaml_str) with the path as context.
    pub fn from_file(path: &Path) -> Result<Self, SkemaError> {
        let text = std::fs::read_to_string(path).map_err(|e| SkemaError::NotFound {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_yaml::from_str(&text).map_err(|e| SkemaError::malformed(path.display().to_string(), e.to_string()))
    }

    /// Loader options selected by this configuration.
    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            always_rebuild: self.always_rebuild,
            stamp_id: self.stamp_id,
            rebuild_stale: self.rebuild_stale,
        }
    }

    /// Build a loader with the default decoder.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` if a global definition is not a mapping.
    pub fn loader(&self) -> Result<SchemaLoader, SkemaError> {
        let loader = SchemaLoader::new(&self.cache_dir).with_options(self.loader_options());
        Ok(match &self.preprocess {
            Some(policy) => loader.with_policy(policy.clone().into_policy()?),
            None => loader,
        })
    }
}

// ---------------------------------------------------------------------------
// PolicyConfig
// ---------------------------------------------------------------------------

/// Serializable form of a [`PreprocessorPolicy`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Accept `optional` as the complement of `required`.
    pub allow_optional_constraint: bool,
    /// Require every declared property of object schemas by default.
    pub require_all_properties_by_default: bool,
    /// Disallow undeclared properties of object schemas by default.
    pub disallow_additional_properties_by_default: bool,
    /// Keys stripped from every node.
    pub removed_keys: Vec<String>,
    /// Definitions inlined into schemas that reference them.
    pub global_definitions: serde_json::Map<String, serde_json::Value>,
}

impl PolicyConfig {
    /// Convert into a policy.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` naming the first global definition that is
    /// not a mapping.
    pub fn into_policy(self) -> Result<PreprocessorPolicy, SkemaError> {
        let mut definitions = Vec::with_capacity(self.global_definitions.len());
        for (name, value) in self.global_definitions {
            let node = SchemaNode::from_json(value).map_err(|e| match e {
                SkemaError::MalformedInput { reason, .. } => {
                    SkemaError::malformed(format!("global definition '{name}'"), reason)
                }
                other => other,
            })?;
            definitions.push((name, node));
        }
        Ok(PreprocessorPolicy::new()
            .allow_optional_constraint(self.allow_optional_constraint)
            .require_all_properties_by_default(self.require_all_properties_by_default)
            .disallow_additional_properties_by_default(self.disallow_additional_properties_by_default)
            .removed_keys(self.removed_keys)
            .global_definitions(definitions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SkemaConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, SkemaConfig::default());
        assert!(config.always_rebuild);
        assert!(config.stamp_id);
        assert!(!config.rebuild_stale);
        assert!(config.preprocess.is_none());
    }

    #[test]
    fn test_full_document() {
        let config = SkemaConfig::from_yaml_str(
            "\
cache_dir: /var/cache/skema
always_rebuild: false
rebuild_stale: true
preprocess:
  allow_optional_constraint: true
  removed_keys: [example, description]
  global_definitions:
    Money: {type: object, properties: {amount: {type: string}}}
    Code: {type: string}
",
        )
        .unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/skema"));
        assert_eq!(
            config.loader_options(),
            LoaderOptions {
                always_rebuild: false,
                stamp_id: true,
                rebuild_stale: true,
            }
        );

        let policy = config.preprocess.clone().unwrap().into_policy().unwrap();
        assert!(policy.allows_optional_constraint());
        assert!(!policy.requires_all_properties_by_default());
        assert_eq!(
            policy.removed_key_set().iter().collect::<Vec<_>>(),
            vec!["description", "example"]
        );
        let names: Vec<&String> = policy.global_definition_map().keys().collect();
        assert_eq!(names, vec!["Money", "Code"]);

        let loader = config.loader().unwrap();
        assert!(loader.policy().is_some());
        assert_eq!(loader.store().dir(), Path::new("/var/cache/skema"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = SkemaConfig::from_yaml_str("cache_directory: /tmp\n").unwrap_err();
        assert!(matches!(err, SkemaError::MalformedInput { .. }));

        let err = SkemaConfig::from_yaml_str("preprocess: {remove_keys: [a]}\n").unwrap_err();
        assert!(matches!(err, SkemaError::MalformedInput { .. }));
    }

    #[test]
    fn test_global_definition_must_be_mapping() {
        let config = SkemaConfig::from_yaml_str("preprocess: {global_definitions: {Bad: [1, 2]}}\n").unwrap();
        let err = config.loader().unwrap_err();
        assert!(err.to_string().contains("global definition 'Bad'"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skema.yaml");
        std::fs::write(&path, "stamp_id: false\n").unwrap();
        let config = SkemaConfig::from_file(&path).unwrap();
        assert!(!config.stamp_id);

        let missing = SkemaConfig::from_file(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(missing.is_not_found());
    }
}
