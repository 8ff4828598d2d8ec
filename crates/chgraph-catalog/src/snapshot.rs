//! Offline catalog snapshots
//!
//! A snapshot is a JSON dump of the catalog rows the graph builder needs,
//! so graphs can be rebuilt and analyzed without a live cluster:
//!
//! ```json
//! {
//!   "cluster": "prod",
//!   "relations": [
//!     {"database": "raw", "name": "events", "engine": "MergeTree"},
//!     {
//!       "database": "analytics",
//!       "name": "mv_events_agg",
//!       "engine": "MaterializedView",
//!       "create_table_query": "CREATE MATERIALIZED VIEW analytics.mv_events_agg TO analytics.events_agg AS SELECT * FROM raw.events",
//!       "dependencies": [
//!         {"database": "raw", "table": "events"},
//!         {"database": "analytics", "table": "events_agg"}
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Internal databases are filtered out on read, mirroring what a live
//! catalog query would return.

use crate::source::{CatalogError, MetadataSource, Relation, MATERIALIZED_VIEW_ENGINE};
use chgraph_core::config::DEFAULT_EXCLUDED_DATABASES;
use chgraph_core::QualifiedName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One relation as stored in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRelation {
    /// Database name
    pub database: String,

    /// Relation name
    pub name: String,

    /// Storage engine
    pub engine: String,

    /// `CREATE` statement (only meaningful for materialized views)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_table_query: Option<String>,

    /// Relations this one depends on (only meaningful for materialized views)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<QualifiedName>,
}

impl SnapshotRelation {
    /// A plain table with the given engine
    pub fn table(database: impl Into<String>, name: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            engine: engine.into(),
            create_table_query: None,
            dependencies: Vec::new(),
        }
    }

    /// A materialized view with its DDL and dependency list
    pub fn materialized_view(
        database: impl Into<String>,
        name: impl Into<String>,
        create_table_query: Option<String>,
        dependencies: Vec<QualifiedName>,
    ) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            engine: MATERIALIZED_VIEW_ENGINE.to_string(),
            create_table_query,
            dependencies,
        }
    }

    fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.database, &self.name)
    }

    fn is_materialized_view(&self) -> bool {
        self.engine == MATERIALIZED_VIEW_ENGINE
    }
}

/// A point-in-time catalog dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Cluster the snapshot was taken from
    pub cluster: String,

    /// Every relation, including internal ones if the dump kept them
    #[serde(default)]
    pub relations: Vec<SnapshotRelation>,

    /// Databases hidden from every listing
    #[serde(default = "default_excluded_databases", skip_serializing)]
    pub excluded_databases: Vec<String>,
}

fn default_excluded_databases() -> Vec<String> {
    DEFAULT_EXCLUDED_DATABASES.iter().map(|s| s.to_string()).collect()
}

impl CatalogSnapshot {
    /// Create an empty snapshot
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            relations: Vec::new(),
            excluded_databases: default_excluded_databases(),
        }
    }

    /// Load a snapshot from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::IoError(format!("{}: {}", path.display(), e)))?;

        let snapshot = Self::from_json(&contents)?;
        tracing::debug!(
            "Loaded catalog snapshot from {} ({} relations)",
            path.display(),
            snapshot.relations.len()
        );
        Ok(snapshot)
    }

    /// Parse a snapshot from a JSON string
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(json).map_err(|e| CatalogError::ParseError(e.to_string()))
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, CatalogError> {
        serde_json::to_string_pretty(self).map_err(|e| CatalogError::SerializeError(e.to_string()))
    }

    /// Write the snapshot to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), CatalogError> {
        std::fs::write(path, self.to_json()?)
            .map_err(|e| CatalogError::IoError(format!("{}: {}", path.display(), e)))
    }

    /// Replace the list of databases hidden from listings
    pub fn with_excluded_databases(mut self, databases: Vec<String>) -> Self {
        self.excluded_databases = databases;
        self
    }

    /// Append a relation
    pub fn push(&mut self, relation: SnapshotRelation) {
        self.relations.push(relation);
    }

    /// Visible relations ordered by `(database, name)`
    fn visible(&self) -> Vec<&SnapshotRelation> {
        let mut visible: Vec<&SnapshotRelation> = self
            .relations
            .iter()
            .filter(|r| !self.excluded_databases.contains(&r.database))
            .collect();
        visible.sort_by(|a, b| (&a.database, &a.name).cmp(&(&b.database, &b.name)));
        visible
    }

    fn find(&self, view: &QualifiedName) -> Option<&SnapshotRelation> {
        self.relations.iter().find(|r| view.is(&r.database, &r.name))
    }

    fn counts_where(&self, predicate: impl Fn(&SnapshotRelation) -> bool) -> Vec<(String, u64)> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for relation in self.visible().into_iter().filter(|r| predicate(*r)) {
            *counts.entry(relation.database.clone()).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }
}

impl MetadataSource for CatalogSnapshot {
    fn cluster_name(&self) -> &str {
        &self.cluster
    }

    fn list_relations(&self) -> Result<Vec<Relation>, CatalogError> {
        Ok(self
            .visible()
            .into_iter()
            .map(|r| Relation::new(&r.database, &r.name, &r.engine))
            .collect())
    }

    fn list_materialized_views(&self) -> Result<Vec<QualifiedName>, CatalogError> {
        Ok(self
            .visible()
            .into_iter()
            .filter(|r| r.is_materialized_view())
            .map(SnapshotRelation::qualified_name)
            .collect())
    }

    fn view_dependencies(&self, view: &QualifiedName) -> Result<Vec<QualifiedName>, CatalogError> {
        Ok(self
            .find(view)
            .map(|r| {
                r.dependencies
                    .iter()
                    .filter(|d| !d.database.is_empty() && !d.table.is_empty())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn create_statement(&self, view: &QualifiedName) -> Result<Option<String>, CatalogError> {
        Ok(self
            .find(view)
            .and_then(|r| r.create_table_query.clone())
            .filter(|sql| !sql.is_empty()))
    }

    fn list_databases(&self) -> Result<Vec<String>, CatalogError> {
        let mut databases: Vec<String> = self.visible().into_iter().map(|r| r.database.clone()).collect();
        databases.dedup();
        Ok(databases)
    }

    fn table_counts(&self) -> Result<Vec<(String, u64)>, CatalogError> {
        Ok(self.counts_where(|r| !r.is_materialized_view()))
    }

    fn view_counts(&self) -> Result<Vec<(String, u64)>, CatalogError> {
        Ok(self.counts_where(SnapshotRelation::is_materialized_view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SNAPSHOT: &str = r#"{
        "cluster": "demo",
        "relations": [
            {"database": "raw", "name": "users", "engine": "MergeTree"},
            {"database": "system", "name": "parts", "engine": "SystemParts"},
            {"database": "raw", "name": "events", "engine": "MergeTree"},
            {"database": "analytics", "name": "events_agg", "engine": "SummingMergeTree"},
            {
                "database": "analytics",
                "name": "mv_events_agg",
                "engine": "MaterializedView",
                "create_table_query": "CREATE MATERIALIZED VIEW analytics.mv_events_agg TO analytics.events_agg AS SELECT * FROM raw.events",
                "dependencies": [
                    {"database": "raw", "table": "events"},
                    {"database": "analytics", "table": "events_agg"},
                    {"database": "", "table": ""}
                ]
            }
        ]
    }"#;

    #[test]
    fn relations_are_sorted_and_filtered() {
        let snapshot = CatalogSnapshot::from_json(SNAPSHOT).unwrap();
        let fqdns: Vec<String> = snapshot
            .list_relations()
            .unwrap()
            .iter()
            .map(Relation::fqdn)
            .collect();

        assert_eq!(
            fqdns,
            vec!["analytics.events_agg", "analytics.mv_events_agg", "raw.events", "raw.users"]
        );
    }

    #[test]
    fn views_dependencies_and_ddl() {
        let snapshot = CatalogSnapshot::from_json(SNAPSHOT).unwrap();
        let view = QualifiedName::new("analytics", "mv_events_agg");

        assert_eq!(snapshot.list_materialized_views().unwrap(), vec![view.clone()]);
        assert_eq!(
            snapshot.view_dependencies(&view).unwrap(),
            vec![
                QualifiedName::new("raw", "events"),
                QualifiedName::new("analytics", "events_agg"),
            ]
        );
        assert!(snapshot.create_statement(&view).unwrap().is_some());

        let unknown = QualifiedName::new("analytics", "nope");
        assert!(snapshot.view_dependencies(&unknown).unwrap().is_empty());
        assert_eq!(snapshot.create_statement(&unknown).unwrap(), None);
    }

    #[test]
    fn statistics_queries() {
        let snapshot = CatalogSnapshot::from_json(SNAPSHOT).unwrap();
        assert_eq!(snapshot.list_databases().unwrap(), vec!["analytics", "raw"]);
        assert_eq!(
            snapshot.table_counts().unwrap(),
            vec![("analytics".to_string(), 1), ("raw".to_string(), 2)]
        );
        assert_eq!(snapshot.view_counts().unwrap(), vec![("analytics".to_string(), 1)]);
    }

    #[test]
    fn invalid_json_is_parse_error() {
        assert!(matches!(
            CatalogSnapshot::from_json("{\"relations\": 3}"),
            Err(CatalogError::ParseError(_))
        ));
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        let mut snapshot = CatalogSnapshot::new("roundtrip");
        snapshot.push(SnapshotRelation::table("raw", "events", "MergeTree"));
        snapshot.push(SnapshotRelation::materialized_view(
            "analytics",
            "mv",
            None,
            vec![QualifiedName::new("raw", "events")],
        ));
        snapshot.save_to_file(&path).unwrap();

        let loaded = CatalogSnapshot::from_file(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = CatalogSnapshot::from_file(Path::new("/nonexistent/catalog.json"));
        assert!(matches!(result, Err(CatalogError::IoError(_))));
    }
}
