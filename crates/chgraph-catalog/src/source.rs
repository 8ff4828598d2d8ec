//! Metadata source trait for reading cluster catalogs

use chgraph_core::QualifiedName;
use serde::{Deserialize, Serialize};

/// Engine name the catalog reports for materialized views
pub const MATERIALIZED_VIEW_ENGINE: &str = "MaterializedView";

/// One catalog relation (table, view or materialized view)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Database name
    pub database: String,

    /// Relation name
    pub name: String,

    /// Storage engine (e.g. "MergeTree", "MaterializedView")
    pub engine: String,
}

impl Relation {
    /// Create a new relation
    pub fn new(database: impl Into<String>, name: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            engine: engine.into(),
        }
    }

    /// The relation's `database.name` key
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.database, &self.name)
    }

    /// Get fully qualified name
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }

    /// Check if the catalog reports this relation as a materialized view
    pub fn is_materialized_view(&self) -> bool {
        self.engine == MATERIALIZED_VIEW_ENGINE
    }
}

/// Errors that can occur when reading catalog metadata
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

/// Read-only access to a cluster catalog
///
/// Every method blocks on its underlying query. Implementations own any
/// connection, timeout or retry policy; the graph builder only propagates
/// the errors they return.
pub trait MetadataSource: Send + Sync {
    /// Cluster name recorded in graph metadata
    fn cluster_name(&self) -> &str;

    /// All relations outside internal databases, ordered by `(database, name)`
    fn list_relations(&self) -> Result<Vec<Relation>, CatalogError>;

    /// Materialized views only, ordered by `(database, name)`
    fn list_materialized_views(&self) -> Result<Vec<QualifiedName>, CatalogError>;

    /// Relations a view reads from or writes to
    fn view_dependencies(&self, view: &QualifiedName) -> Result<Vec<QualifiedName>, CatalogError>;

    /// The view's `CREATE` statement, if the catalog has one
    fn create_statement(&self, view: &QualifiedName) -> Result<Option<String>, CatalogError>;

    /// Distinct database names outside internal databases
    fn list_databases(&self) -> Result<Vec<String>, CatalogError>;

    /// Per-database count of relations that are not materialized views
    fn table_counts(&self) -> Result<Vec<(String, u64)>, CatalogError>;

    /// Per-database count of materialized views
    fn view_counts(&self) -> Result<Vec<(String, u64)>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_identity() {
        let relation = Relation::new("analytics", "mv_events_agg", "MaterializedView");
        assert_eq!(relation.fqdn(), "analytics.mv_events_agg");
        assert_eq!(relation.qualified_name(), QualifiedName::new("analytics", "mv_events_agg"));
        assert!(relation.is_materialized_view());
        assert!(!Relation::new("raw", "events", "MergeTree").is_materialized_view());
    }

    #[test]
    fn error_messages() {
        let error = CatalogError::PermissionDenied("system.tables".to_string());
        assert_eq!(error.to_string(), "Permission denied: system.tables");

        // Writing a snapshot and reading one fail with distinct messages
        let error = CatalogError::SerializeError("key must be a string".to_string());
        assert_eq!(error.to_string(), "Serialize error: key must be a string");
        assert_ne!(error, CatalogError::ParseError("key must be a string".to_string()));
    }
}
