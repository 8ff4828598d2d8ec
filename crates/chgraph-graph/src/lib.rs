//! Materialized-view dependency graphs
//!
//! This crate handles:
//! - Building a graph of tables connected by materialized views from catalog metadata
//! - Traversals: sources, targets, lineage, impact, depth, cycles, orphans, paths
//! - Pipeline health scoring and cluster statistics
//! - Exports to JSON, node/link, DOT and GraphML
//!
//! ## Example
//!
//! ```rust,ignore
//! use chgraph_catalog::CatalogSnapshot;
//! use chgraph_graph::{Direction, GraphBuilder};
//!
//! let snapshot = CatalogSnapshot::from_file(Path::new("catalog.json"))?;
//! let outcome = GraphBuilder::new(&snapshot).build()?;
//! let lineage = outcome.graph.lineage("analytics.events_agg", Direction::Upstream);
//! ```

pub mod analyzer;
pub mod builder;
pub mod export;
pub mod health;
pub mod model;
pub mod stats;

pub use analyzer::{Direction, Lineage};
pub use builder::{BuildError, BuildOutcome, GraphBuilder};
pub use export::{
    EdgeRecord, ExportError, ExportFormat, ExportOptions, GraphMetadata, GraphRecord, NodeLinkEdge,
    NodeLinkGraph, NodeLinkNode, NodeRecord, ViewMode,
};
pub use model::{DependencyGraph, Edge, EdgeKind, GraphError, Node, NodeId};
pub use stats::cluster_statistics;
