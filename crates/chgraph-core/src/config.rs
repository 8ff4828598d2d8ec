//! Configuration schema (chgraph.toml)

use serde::{Deserialize, Serialize};

/// Databases that never take part in discovery
pub const DEFAULT_EXCLUDED_DATABASES: &[&str] = &["system", "information_schema", "INFORMATION_SCHEMA"];

/// Name fragments that mark a same-database dependency as a view target
pub const DEFAULT_TARGET_KEYWORDS: &[&str] = &["agg", "summary", "mart", "dim", "fact"];

/// Catalog discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Databases excluded from every catalog query
    #[serde(default = "default_excluded_databases")]
    pub excluded_databases: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            excluded_databases: default_excluded_databases(),
        }
    }
}

fn default_excluded_databases() -> Vec<String> {
    DEFAULT_EXCLUDED_DATABASES.iter().map(|s| s.to_string()).collect()
}

/// Source/target classification settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Keywords checked (case-insensitively) against dependency names
    /// when a view has no explicit write destination
    #[serde(default = "default_target_keywords")]
    pub target_keywords: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            target_keywords: default_target_keywords(),
        }
    }
}

fn default_target_keywords() -> Vec<String> {
    DEFAULT_TARGET_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

impl ClassificationConfig {
    /// Check whether a table name carries one of the target keywords
    pub fn is_target_name(&self, table: &str) -> bool {
        let lowered = table.to_lowercase();
        self.target_keywords
            .iter()
            .any(|keyword| lowered.contains(&keyword.to_lowercase()))
    }
}

/// Thresholds used when turning health metrics into recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthThresholds {
    /// Recommend cleanup above this many orphaned tables
    #[serde(default = "default_max_orphans")]
    pub max_orphans: usize,

    /// Recommend simplification above this dependency depth
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Flag clusters with more than `ratio * tables` materialized views
    #[serde(default = "default_max_view_table_ratio")]
    pub max_view_table_ratio: usize,

    /// How many of the most connected tables to report
    #[serde(default = "default_top_connected")]
    pub top_connected: usize,
}

fn default_max_orphans() -> usize {
    10
}

fn default_max_depth() -> usize {
    5
}

fn default_max_view_table_ratio() -> usize {
    2
}

fn default_top_connected() -> usize {
    5
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            max_orphans: default_max_orphans(),
            max_depth: default_max_depth(),
            max_view_table_ratio: default_max_view_table_ratio(),
            top_connected: default_top_connected(),
        }
    }
}

/// Default export settings for the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Export format name (json, node-link, dot, graphml)
    #[serde(default = "default_export_format")]
    pub format: String,

    /// Collapse view nodes into labelled table-to-table edges
    #[serde(default)]
    pub collapse_views: bool,
}

fn default_export_format() -> String {
    "json".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: default_export_format(),
            collapse_views: false,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Cluster name recorded in graph metadata
    #[serde(default = "default_cluster")]
    pub cluster: String,

    /// Catalog discovery
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Source/target classification
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Health recommendation thresholds
    #[serde(default)]
    pub health: HealthThresholds,

    /// Export defaults
    #[serde(default)]
    pub export: ExportConfig,
}

fn default_cluster() -> String {
    "default".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster: default_cluster(),
            catalog: CatalogConfig::default(),
            classification: ClassificationConfig::default(),
            health: HealthThresholds::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.cluster, "default");
        assert_eq!(config.catalog.excluded_databases.len(), 3);
        assert_eq!(config.health.max_orphans, 10);
        assert_eq!(config.health.top_connected, 5);
        assert_eq!(config.export.format, "json");
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_sections_keep_field_defaults() {
        let config = Config::from_toml(
            r#"
            cluster = "prod"

            [health]
            max_depth = 8

            [classification]
            target_keywords = ["rollup"]
            "#,
        )
        .unwrap();

        assert_eq!(config.cluster, "prod");
        assert_eq!(config.health.max_depth, 8);
        assert_eq!(config.health.max_orphans, 10);
        assert_eq!(config.classification.target_keywords, vec!["rollup".to_string()]);
    }

    #[test]
    fn target_keyword_matching_ignores_case() {
        let rules = ClassificationConfig::default();
        assert!(rules.is_target_name("events_AGG"));
        assert!(rules.is_target_name("dim_users"));
        assert!(!rules.is_target_name("events"));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let result = Config::from_toml("cluster = [");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chgraph.toml");

        let mut config = Config::default();
        config.cluster = "staging".to_string();
        config.export.collapse_views = true;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
