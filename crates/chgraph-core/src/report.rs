//! Pipeline health and cluster statistics reports (stable v1)
//!
//! These records are STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Headline numbers of a pipeline health check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    /// Nodes that are not the `via` of any edge
    pub total_tables: usize,

    /// Nodes that are the `via` of at least one edge
    pub total_materialized_views: usize,

    /// Number of edges
    pub total_dependencies: usize,

    /// Number of reported cycles (overlapping cycles count separately)
    pub dependency_cycles: usize,

    /// Number of nodes touched by no edge
    pub orphaned_tables: usize,

    /// Longest dependency depth among table nodes
    pub max_dependency_depth: usize,

    /// Mean of in+out edge counts over all nodes
    pub avg_connections_per_table: f64,
}

/// A node ranked by how many edges touch it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedTable {
    /// Node FQDN
    pub fqdn: String,

    /// Incoming plus outgoing edge count
    pub connections: usize,
}

/// Pipeline health report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Schema version
    pub version: ReportVersion,

    /// Summary metrics
    pub metrics: HealthMetrics,

    /// Dependency depth -> number of table nodes at that depth
    pub depth_distribution: BTreeMap<usize, usize>,

    /// Most connected nodes, highest first
    pub highly_connected_tables: Vec<ConnectedTable>,

    /// Each detected cycle as a list of FQDNs
    pub cycles: Vec<Vec<String>>,

    /// FQDNs of orphaned nodes
    pub orphaned_tables: Vec<String>,

    /// Human-readable recommendations
    pub recommendations: Vec<String>,
}

impl HealthReport {
    /// True when no recommendation rule fired
    pub fn is_healthy(&self) -> bool {
        self.metrics.dependency_cycles == 0
            && self.recommendations.len() == 1
            && self.recommendations[0] == NO_ISSUES_RECOMMENDATION
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Recommendation emitted when no health rule fires
pub const NO_ISSUES_RECOMMENDATION: &str = "No significant issues detected";

/// Per-database relation counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    /// Relations that are not materialized views
    pub tables: u64,

    /// Materialized views
    pub materialized_views: u64,
}

/// Cluster-wide relation counts, queried fresh from the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatistics {
    /// Number of distinct databases
    pub total_databases: usize,

    /// Non-view relations across all databases
    pub total_tables: u64,

    /// Materialized views across all databases
    pub total_materialized_views: u64,

    /// Counts per database
    pub databases: BTreeMap<String, DatabaseStats>,
}
