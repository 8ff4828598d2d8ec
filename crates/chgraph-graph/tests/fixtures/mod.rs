//! Test fixtures for graph integration tests
//!
//! Each fixture is a mock catalog describing a small, realistic pipeline.

use chgraph_catalog::{MockCatalog, MockCatalogBuilder};

/// Two independent pipelines:
/// `raw.events -> analytics.events_agg` and `raw.users -> analytics.user_stats`
pub fn two_pipelines() -> MockCatalog {
    MockCatalogBuilder::new("analytics-cluster")
        .with_table("raw", "events", "MergeTree")
        .with_table("raw", "users", "MergeTree")
        .with_table("analytics", "events_agg", "SummingMergeTree")
        .with_table("analytics", "user_stats", "AggregatingMergeTree")
        .with_view(
            "analytics",
            "mv_events_agg",
            Some("CREATE MATERIALIZED VIEW analytics.mv_events_agg TO analytics.events_agg AS SELECT * FROM raw.events"),
            &[("raw", "events"), ("analytics", "events_agg")],
        )
        .with_view(
            "analytics",
            "mv_user_stats",
            Some("CREATE MATERIALIZED VIEW analytics.mv_user_stats TO analytics.user_stats AS SELECT * FROM raw.users"),
            &[("raw", "users"), ("analytics", "user_stats")],
        )
        .build()
}

/// One view joining two sources into two targets
pub fn fan_out() -> MockCatalog {
    MockCatalogBuilder::new("fan-out")
        .with_table("raw", "clicks", "MergeTree")
        .with_table("raw", "views", "MergeTree")
        .with_table("mart", "daily_summary", "SummingMergeTree")
        .with_table("mart", "weekly_summary", "SummingMergeTree")
        .with_view(
            "mart",
            "mv_engagement",
            None,
            &[
                ("raw", "clicks"),
                ("raw", "views"),
                ("mart", "daily_summary"),
                ("mart", "weekly_summary"),
            ],
        )
        .build()
}

/// `stage.a -> stage.b -> stage.c` through two views, driven by TO clauses
pub fn three_stage_chain() -> MockCatalog {
    MockCatalogBuilder::new("chain")
        .with_table("stage", "a", "MergeTree")
        .with_table("stage", "b", "MergeTree")
        .with_table("stage", "c", "MergeTree")
        .with_view(
            "stage",
            "mv_ab",
            Some("CREATE MATERIALIZED VIEW stage.mv_ab TO stage.b AS SELECT * FROM stage.a"),
            &[("stage", "a"), ("stage", "b")],
        )
        .with_view(
            "stage",
            "mv_bc",
            Some("CREATE MATERIALIZED VIEW stage.mv_bc TO stage.c AS SELECT * FROM stage.b"),
            &[("stage", "b"), ("stage", "c")],
        )
        .build()
}

/// `loop.a <-> loop.b` through two views, plus an unused table
pub fn feedback_loop() -> MockCatalog {
    MockCatalogBuilder::new("loop")
        .with_table("loop", "a", "MergeTree")
        .with_table("loop", "b", "MergeTree")
        .with_table("loop", "unused", "Log")
        .with_view(
            "loop",
            "mv_ab",
            Some("CREATE MATERIALIZED VIEW loop.mv_ab TO loop.b AS SELECT * FROM loop.a"),
            &[("loop", "a"), ("loop", "b")],
        )
        .with_view(
            "loop",
            "mv_ba",
            Some("CREATE MATERIALIZED VIEW loop.mv_ba TO loop.a AS SELECT * FROM loop.b"),
            &[("loop", "b"), ("loop", "a")],
        )
        .build()
}
