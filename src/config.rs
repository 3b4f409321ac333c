//! Engine configuration

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Default cap on checkpoint ancestry walks.
pub const DEFAULT_MAX_LINEAGE_DEPTH: usize = 1024;

/// Configuration of a [`crate::LineageStore`].
///
/// Deserializable from JSON; missing fields take their defaults.
///
/// ```rust
/// use trueno_lineage::LineageConfig;
///
/// let config = LineageConfig::from_json(r#"{"max_lineage_depth": 16}"#)?;
/// assert_eq!(config.max_lineage_depth, 16);
/// assert!(config.strict_schema_checks);
/// # Ok::<(), trueno_lineage::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LineageConfig {
    /// Directory model bytes are written under, one sub-directory per use case
    pub model_root: PathBuf,
    /// Fail registration when a type is already registered with another schema
    pub strict_schema_checks: bool,
    /// Maximum number of ancestors followed when walking checkpoint lineage
    pub max_lineage_depth: usize,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            model_root: std::env::temp_dir().join("trueno_lineage").join("models"),
            strict_schema_checks: true,
            max_lineage_depth: DEFAULT_MAX_LINEAGE_DEPTH,
        }
    }
}

impl LineageConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> LineageConfigBuilder {
        LineageConfigBuilder::default()
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] for malformed JSON or unknown
    /// fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the file cannot be read and
    /// [`crate::Error::Serialization`] if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Directory holding the model bytes of one use case.
    #[must_use]
    pub fn use_case_dir(&self, use_case_name: &str) -> PathBuf {
        self.model_root.join(use_case_name)
    }
}

/// Builder for [`LineageConfig`].
#[derive(Debug, Default)]
pub struct LineageConfigBuilder {
    config: LineageConfig,
}

impl LineageConfigBuilder {
    /// Set the model byte root directory.
    #[must_use]
    pub fn model_root(mut self, model_root: impl Into<PathBuf>) -> Self {
        self.config.model_root = model_root.into();
        self
    }

    /// Enable or disable strict schema checks on registration.
    #[must_use]
    pub const fn strict_schema_checks(mut self, strict: bool) -> Self {
        self.config.strict_schema_checks = strict;
        self
    }

    /// Set the lineage walk depth cap.
    #[must_use]
    pub const fn max_lineage_depth(mut self, depth: usize) -> Self {
        self.config.max_lineage_depth = depth;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> LineageConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LineageConfig::default();
        assert!(config.strict_schema_checks);
        assert_eq!(config.max_lineage_depth, DEFAULT_MAX_LINEAGE_DEPTH);
        assert!(config.model_root.ends_with("trueno_lineage/models"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = LineageConfig::builder()
            .model_root("/srv/models")
            .strict_schema_checks(false)
            .max_lineage_depth(8)
            .build();
        assert_eq!(config.model_root, PathBuf::from("/srv/models"));
        assert!(!config.strict_schema_checks);
        assert_eq!(config.use_case_dir("churn"), PathBuf::from("/srv/models/churn"));
    }

    #[test]
    fn test_json_partial_and_unknown_fields() {
        let config = LineageConfig::from_json(r#"{"strict_schema_checks": false}"#).unwrap();
        assert!(!config.strict_schema_checks);
        assert_eq!(config.max_lineage_depth, DEFAULT_MAX_LINEAGE_DEPTH);
        assert!(LineageConfig::from_json(r#"{"depth": 3}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.json");
        std::fs::write(&path, r#"{"model_root": "/data/models"}"#).unwrap();
        let config = LineageConfig::load(&path).unwrap();
        assert_eq!(config.model_root, PathBuf::from("/data/models"));
        assert!(LineageConfig::load(dir.path().join("missing.json")).is_err());
    }
}
