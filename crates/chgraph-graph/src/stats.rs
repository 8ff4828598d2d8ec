//! Cluster-wide relation counts
//!
//! Statistics are read straight from the catalog rather than derived from a
//! graph, so they also cover views whose dependencies could not be resolved.

use chgraph_catalog::{CatalogError, MetadataSource};
use chgraph_core::{ClusterStatistics, DatabaseStats};
use std::collections::{BTreeMap, HashMap};

/// Query database, table and view counts from the catalog
pub fn cluster_statistics(source: &dyn MetadataSource) -> Result<ClusterStatistics, CatalogError> {
    let databases = source.list_databases()?;
    let table_counts: HashMap<String, u64> = source.table_counts()?.into_iter().collect();
    let view_counts: HashMap<String, u64> = source.view_counts()?.into_iter().collect();

    let per_database: BTreeMap<String, DatabaseStats> = databases
        .iter()
        .map(|database| {
            let stats = DatabaseStats {
                tables: table_counts.get(database).copied().unwrap_or(0),
                materialized_views: view_counts.get(database).copied().unwrap_or(0),
            };
            (database.clone(), stats)
        })
        .collect();

    tracing::debug!("Collected statistics for {} databases", databases.len());

    Ok(ClusterStatistics {
        total_databases: databases.len(),
        total_tables: table_counts.values().sum(),
        total_materialized_views: view_counts.values().sum(),
        databases: per_database,
    })
}
