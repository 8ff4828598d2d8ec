//! Catalog access for materialized-view dependency discovery
//!
//! This crate reads the relations, materialized views and view dependencies
//! that the graph builder needs from a cluster catalog.
//!
//! ## Sources
//!
//! - [`SqlCatalog`] - issues catalog queries through a caller-supplied [`QueryRunner`]
//! - [`CatalogSnapshot`] - an offline JSON dump of the same rows
//! - [`MockCatalog`] - in-memory catalog with error injection and call counting
//!
//! ## Example
//!
//! ```rust,ignore
//! use chgraph_catalog::{CatalogSnapshot, MetadataSource};
//!
//! let snapshot = CatalogSnapshot::from_file(Path::new("catalog.json"))?;
//! for view in snapshot.list_materialized_views()? {
//!     println!("{}", view);
//! }
//! ```

pub mod mock;
pub mod snapshot;
pub mod source;
pub mod sql;

pub use mock::{CatalogOperation, MockCatalog, MockCatalogBuilder};
pub use snapshot::{CatalogSnapshot, SnapshotRelation};
pub use source::{CatalogError, MetadataSource, Relation, MATERIALIZED_VIEW_ENGINE};
pub use sql::{quote_literal, QueryRunner, Row, SqlCatalog};
