//! Integration tests for catalog sources
//!
//! Every source is exercised through the `MetadataSource` trait object, the
//! way the graph builder consumes it.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p chgraph-catalog --test integration_tests
//! ```

mod fixtures;

use chgraph_catalog::{
    CatalogError, CatalogOperation, CatalogSnapshot, MetadataSource, MockCatalog, MockCatalogBuilder,
    SnapshotRelation,
};
use chgraph_core::{parse_write_destination, QualifiedName};
use pretty_assertions::assert_eq;

// =============================================================================
// Helper Functions
// =============================================================================

/// Collect every read a graph build and a statistics pass would issue
fn full_listing(source: &dyn MetadataSource) -> Result<Vec<String>, CatalogError> {
    let mut lines = Vec::new();

    for relation in source.list_relations()? {
        lines.push(format!("relation {} {}", relation.fqdn(), relation.engine));
    }
    for view in source.list_materialized_views()? {
        let dependencies: Vec<String> = source
            .view_dependencies(&view)?
            .iter()
            .map(QualifiedName::fqdn)
            .collect();
        lines.push(format!("view {} <- [{}]", view, dependencies.join(", ")));
    }
    lines.push(format!("databases {:?}", source.list_databases()?));
    lines.push(format!("tables {:?}", source.table_counts()?));
    lines.push(format!("views {:?}", source.view_counts()?));

    Ok(lines)
}

// =============================================================================
// Snapshot Tests
// =============================================================================

#[test]
fn test_snapshot_hides_internal_databases() {
    let snapshot = fixtures::analytics_snapshot();
    let relations = snapshot.list_relations().unwrap();

    assert_eq!(relations.len(), 6);
    assert!(relations.iter().all(|r| r.database != "system"));
    assert!(relations.iter().all(|r| r.database != "INFORMATION_SCHEMA"));
    assert_eq!(snapshot.list_databases().unwrap(), vec!["analytics", "raw"]);
}

#[test]
fn test_snapshot_ddl_names_write_destination() {
    let snapshot = fixtures::analytics_snapshot();

    for view in snapshot.list_materialized_views().unwrap() {
        let ddl = snapshot.create_statement(&view).unwrap().unwrap();
        let destination = parse_write_destination(&ddl, &view.database).unwrap();

        let dependencies = snapshot.view_dependencies(&view).unwrap();
        assert!(dependencies.contains(&destination), "{} should depend on {}", view, destination);
    }
}

#[test]
fn test_snapshot_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");

    std::fs::write(&path, fixtures::analytics_snapshot_json()).unwrap();
    let loaded = CatalogSnapshot::from_file(&path).unwrap();

    assert_eq!(loaded.cluster_name(), "analytics-cluster");
    assert_eq!(
        full_listing(&loaded).unwrap(),
        full_listing(&fixtures::analytics_snapshot()).unwrap()
    );
}

#[test]
fn test_snapshot_custom_exclusions() {
    let snapshot = fixtures::analytics_snapshot().with_excluded_databases(vec!["raw".to_string()]);

    let databases = snapshot.list_databases().unwrap();
    assert_eq!(databases, vec!["INFORMATION_SCHEMA", "analytics", "system"]);
    assert_eq!(snapshot.view_counts().unwrap(), vec![("analytics".to_string(), 2)]);
}

// =============================================================================
// Mock Catalog Tests
// =============================================================================

#[test]
fn test_mock_matches_snapshot() {
    let snapshot = fixtures::analytics_snapshot();
    let mock = MockCatalog::from_snapshot(snapshot.clone());

    assert_eq!(full_listing(&mock).unwrap(), full_listing(&snapshot).unwrap());
}

#[test]
fn test_mock_counts_every_read() {
    let mock = MockCatalog::from_snapshot(fixtures::analytics_snapshot());
    full_listing(&mock).unwrap();

    assert_eq!(mock.call_count(CatalogOperation::ListRelations), 1);
    assert_eq!(mock.call_count(CatalogOperation::ListMaterializedViews), 1);
    assert_eq!(mock.call_count(CatalogOperation::ViewDependencies), 2);
    assert_eq!(mock.call_count(CatalogOperation::CreateStatement), 0);
    assert_eq!(mock.total_calls(), 7);
}

#[test]
fn test_mock_error_stops_listing() {
    let mock = MockCatalogBuilder::new("failing")
        .with_table("raw", "events", "MergeTree")
        .with_view("analytics", "mv", None, &[("raw", "events")])
        .with_error(
            CatalogOperation::ViewDependencies,
            CatalogError::PermissionDenied("system.dependencies".to_string()),
        )
        .build();

    let result = full_listing(&mock);
    assert_eq!(
        result,
        Err(CatalogError::PermissionDenied("system.dependencies".to_string()))
    );
    // Nothing after the failing read was attempted
    assert_eq!(mock.call_count(CatalogOperation::ListDatabases), 0);
}

#[test]
fn test_mock_handle_sees_late_relations() {
    let mock = MockCatalogBuilder::new("live").build();
    let handle = mock.clone();

    mock.add_relation(SnapshotRelation::table("raw", "late_arrival", "MergeTree"));

    assert_eq!(handle.table_counts().unwrap(), vec![("raw".to_string(), 1)]);
}
