//! Test fixtures for catalog integration tests
//!
//! A small analytics cluster: two raw tables, two aggregate tables and the
//! materialized views between them, plus internal relations that every
//! source must hide.

use chgraph_catalog::{CatalogSnapshot, SnapshotRelation};
use chgraph_core::QualifiedName;

/// Raw event and user tables feeding two aggregates
pub fn analytics_snapshot() -> CatalogSnapshot {
    let mut snapshot = CatalogSnapshot::new("analytics-cluster");

    snapshot.push(SnapshotRelation::table("raw", "events", "MergeTree"));
    snapshot.push(SnapshotRelation::table("raw", "users", "ReplacingMergeTree"));
    snapshot.push(SnapshotRelation::table("analytics", "events_agg", "SummingMergeTree"));
    snapshot.push(SnapshotRelation::table("analytics", "user_stats", "AggregatingMergeTree"));
    snapshot.push(SnapshotRelation::materialized_view(
        "analytics",
        "mv_events_agg",
        Some(
            "CREATE MATERIALIZED VIEW analytics.mv_events_agg TO analytics.events_agg AS \
             SELECT toDate(ts) AS day, count() AS events FROM raw.events GROUP BY day"
                .to_string(),
        ),
        vec![
            QualifiedName::new("raw", "events"),
            QualifiedName::new("analytics", "events_agg"),
        ],
    ));
    snapshot.push(SnapshotRelation::materialized_view(
        "analytics",
        "mv_user_stats",
        Some(
            "CREATE MATERIALIZED VIEW analytics.mv_user_stats TO analytics.user_stats AS \
             SELECT user_id, uniqState(session) AS sessions FROM raw.users GROUP BY user_id"
                .to_string(),
        ),
        vec![
            QualifiedName::new("raw", "users"),
            QualifiedName::new("analytics", "user_stats"),
        ],
    ));

    // Hidden from every listing
    snapshot.push(SnapshotRelation::table("system", "parts", "SystemParts"));
    snapshot.push(SnapshotRelation::table("INFORMATION_SCHEMA", "TABLES", "View"));

    snapshot
}

/// The same catalog as a JSON document
pub fn analytics_snapshot_json() -> String {
    analytics_snapshot()
        .to_json()
        .expect("fixture snapshot serializes")
}
