//! chgraph core
//!
//! Shared domain types for materialized-view dependency graphs.
//! Never rename warning codes - they are part of the public API.

pub mod config;
pub mod ddl;
pub mod report;
pub mod warning;

pub use config::{CatalogConfig, ClassificationConfig, Config, ConfigError, ExportConfig, HealthThresholds};
pub use ddl::{parse_write_destination, QualifiedName};
pub use report::{
    ClusterStatistics, ConnectedTable, DatabaseStats, HealthMetrics, HealthReport, ReportVersion,
    NO_ISSUES_RECOMMENDATION,
};
pub use warning::{BuildWarning, WarningCode};
