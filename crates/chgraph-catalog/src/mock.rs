//! Mock metadata source for testing
//!
//! Serves a predefined catalog from memory without connecting to a cluster.
//! It's useful for:
//! - Unit testing graph construction and analysis
//! - Simulating catalog failures part-way through a build
//! - Asserting how many queries an operation issued
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chgraph_catalog::{MockCatalogBuilder, CatalogOperation, CatalogError};
//!
//! let catalog = MockCatalogBuilder::new("test")
//!     .with_table("raw", "events", "MergeTree")
//!     .with_table("analytics", "events_agg", "SummingMergeTree")
//!     .with_view(
//!         "analytics",
//!         "mv_events_agg",
//!         Some("CREATE MATERIALIZED VIEW analytics.mv_events_agg TO analytics.events_agg AS SELECT * FROM raw.events"),
//!         &[("raw", "events"), ("analytics", "events_agg")],
//!     )
//!     .build();
//!
//! // Simulate a permission problem on the dependency table
//! let failing = MockCatalogBuilder::new("test")
//!     .with_error(CatalogOperation::ViewDependencies, CatalogError::PermissionDenied("system.dependencies".into()))
//!     .build();
//! ```

use crate::snapshot::{CatalogSnapshot, SnapshotRelation};
use crate::source::{CatalogError, MetadataSource, Relation};
use chgraph_core::QualifiedName;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

const OPERATION_COUNT: usize = 7;

/// The individual catalog reads a [`MetadataSource`] offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogOperation {
    ListRelations,
    ListMaterializedViews,
    ViewDependencies,
    CreateStatement,
    ListDatabases,
    TableCounts,
    ViewCounts,
}

impl CatalogOperation {
    fn index(self) -> usize {
        self as usize
    }
}

/// Mock metadata source for testing
///
/// Clones share state, so a test can keep a handle for inspecting call
/// counts after handing the catalog to a builder.
pub struct MockCatalog {
    /// Cluster name, fixed at construction
    cluster: Arc<str>,

    /// Catalog contents
    snapshot: Arc<RwLock<CatalogSnapshot>>,

    /// Errors to return per operation
    errors: Arc<RwLock<HashMap<CatalogOperation, CatalogError>>>,

    /// Calls per operation, indexed by `CatalogOperation::index`
    calls: Arc<[AtomicUsize; OPERATION_COUNT]>,
}

impl MockCatalog {
    /// Create an empty mock catalog
    pub fn new(cluster: impl Into<String>) -> Self {
        Self::from_snapshot(CatalogSnapshot::new(cluster))
    }

    /// Serve the contents of an existing snapshot
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            cluster: Arc::from(snapshot.cluster.as_str()),
            snapshot: Arc::new(RwLock::new(snapshot)),
            errors: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(Default::default()),
        }
    }

    /// Add a relation after construction
    pub fn add_relation(&self, relation: SnapshotRelation) {
        if let Ok(mut snapshot) = self.snapshot.write() {
            snapshot.push(relation);
        }
    }

    /// Make every future call of `operation` fail with `error`
    pub fn fail_on(&self, operation: CatalogOperation, error: CatalogError) {
        if let Ok(mut errors) = self.errors.write() {
            errors.insert(operation, error);
        }
    }

    /// Remove all configured errors
    pub fn clear_errors(&self) {
        if let Ok(mut errors) = self.errors.write() {
            errors.clear();
        }
    }

    /// Number of times `operation` was called
    pub fn call_count(&self, operation: CatalogOperation) -> usize {
        self.calls[operation.index()].load(Ordering::SeqCst)
    }

    /// Total number of catalog reads across all operations
    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|c| c.load(Ordering::SeqCst)).sum()
    }

    /// Reset all call counters
    pub fn reset_counts(&self) {
        for counter in self.calls.iter() {
            counter.store(0, Ordering::SeqCst);
        }
    }

    /// Record a call and return the configured error, if any
    fn enter(&self, operation: CatalogOperation) -> Result<(), CatalogError> {
        self.calls[operation.index()].fetch_add(1, Ordering::SeqCst);

        let errors = self
            .errors
            .read()
            .map_err(|e| CatalogError::QueryError(format!("mock error table poisoned: {}", e)))?;

        match errors.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn with_snapshot<T>(&self, read: impl FnOnce(&CatalogSnapshot) -> Result<T, CatalogError>) -> Result<T, CatalogError> {
        let snapshot = self
            .snapshot
            .read()
            .map_err(|e| CatalogError::QueryError(format!("mock catalog poisoned: {}", e)))?;
        read(&snapshot)
    }
}

impl Clone for MockCatalog {
    fn clone(&self) -> Self {
        Self {
            cluster: Arc::clone(&self.cluster),
            snapshot: Arc::clone(&self.snapshot),
            errors: Arc::clone(&self.errors),
            calls: Arc::clone(&self.calls),
        }
    }
}

impl MetadataSource for MockCatalog {
    fn cluster_name(&self) -> &str {
        &self.cluster
    }

    fn list_relations(&self) -> Result<Vec<Relation>, CatalogError> {
        self.enter(CatalogOperation::ListRelations)?;
        self.with_snapshot(|s| s.list_relations())
    }

    fn list_materialized_views(&self) -> Result<Vec<QualifiedName>, CatalogError> {
        self.enter(CatalogOperation::ListMaterializedViews)?;
        self.with_snapshot(|s| s.list_materialized_views())
    }

    fn view_dependencies(&self, view: &QualifiedName) -> Result<Vec<QualifiedName>, CatalogError> {
        self.enter(CatalogOperation::ViewDependencies)?;
        self.with_snapshot(|s| s.view_dependencies(view))
    }

    fn create_statement(&self, view: &QualifiedName) -> Result<Option<String>, CatalogError> {
        self.enter(CatalogOperation::CreateStatement)?;
        self.with_snapshot(|s| s.create_statement(view))
    }

    fn list_databases(&self) -> Result<Vec<String>, CatalogError> {
        self.enter(CatalogOperation::ListDatabases)?;
        self.with_snapshot(|s| s.list_databases())
    }

    fn table_counts(&self) -> Result<Vec<(String, u64)>, CatalogError> {
        self.enter(CatalogOperation::TableCounts)?;
        self.with_snapshot(|s| s.table_counts())
    }

    fn view_counts(&self) -> Result<Vec<(String, u64)>, CatalogError> {
        self.enter(CatalogOperation::ViewCounts)?;
        self.with_snapshot(|s| s.view_counts())
    }
}

/// Builder for creating a MockCatalog with a predefined catalog
///
/// # Example
///
/// ```rust,ignore
/// let catalog = MockCatalogBuilder::new("demo")
///     .with_table("raw", "users", "MergeTree")
///     .with_table("analytics", "user_stats", "AggregatingMergeTree")
///     .with_view("analytics", "mv_user_stats", None, &[("raw", "users"), ("analytics", "user_stats")])
///     .build();
/// ```
pub struct MockCatalogBuilder {
    snapshot: CatalogSnapshot,
    errors: HashMap<CatalogOperation, CatalogError>,
}

impl MockCatalogBuilder {
    /// Create a new builder for the named cluster
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            snapshot: CatalogSnapshot::new(cluster),
            errors: HashMap::new(),
        }
    }

    /// Add a plain table
    pub fn with_table(mut self, database: &str, name: &str, engine: &str) -> Self {
        self.snapshot.push(SnapshotRelation::table(database, name, engine));
        self
    }

    /// Add a materialized view with its DDL and `(database, table)` dependencies
    pub fn with_view(
        mut self,
        database: &str,
        name: &str,
        create_table_query: Option<&str>,
        dependencies: &[(&str, &str)],
    ) -> Self {
        self.snapshot.push(SnapshotRelation::materialized_view(
            database,
            name,
            create_table_query.map(str::to_string),
            dependencies
                .iter()
                .map(|(db, table)| QualifiedName::new(*db, *table))
                .collect(),
        ));
        self
    }

    /// Add an arbitrary snapshot relation
    pub fn with_relation(mut self, relation: SnapshotRelation) -> Self {
        self.snapshot.push(relation);
        self
    }

    /// Make every call of `operation` fail
    pub fn with_error(mut self, operation: CatalogOperation, error: CatalogError) -> Self {
        self.errors.insert(operation, error);
        self
    }

    /// Build the MockCatalog
    pub fn build(self) -> MockCatalog {
        let catalog = MockCatalog::from_snapshot(self.snapshot);
        for (operation, error) in self.errors {
            catalog.fail_on(operation, error);
        }
        catalog
    }
}
