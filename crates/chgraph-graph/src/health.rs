//! Pipeline health scoring

use crate::model::DependencyGraph;
use chgraph_core::{
    ConnectedTable, HealthMetrics, HealthReport, HealthThresholds, ReportVersion, NO_ISSUES_RECOMMENDATION,
};
use std::collections::BTreeMap;

impl DependencyGraph {
    /// Health report using the default thresholds
    pub fn pipeline_health(&self) -> HealthReport {
        self.pipeline_health_with(&HealthThresholds::default())
    }

    /// Health report with caller-supplied thresholds
    ///
    /// Tables are nodes that are not the `via` of any edge. Depths are
    /// computed for tables only; connection counts cover every node.
    pub fn pipeline_health_with(&self, thresholds: &HealthThresholds) -> HealthReport {
        let views = self.view_flags();
        let total_materialized_views = views.iter().filter(|&&is_view| is_view).count();
        let total_tables = self.node_count() - total_materialized_views;

        let cycles: Vec<Vec<String>> = self
            .detect_cycles()
            .into_iter()
            .map(|cycle| cycle.into_iter().map(str::to_string).collect())
            .collect();
        let orphaned_tables: Vec<String> = self.orphans().into_iter().map(str::to_string).collect();

        let adjacency = self.adjacency();
        let mut max_depth = 0;
        let mut depth_distribution: BTreeMap<usize, usize> = BTreeMap::new();
        for id in self.node_ids().filter(|id| !views[id.index()]) {
            let depth = self.depth_from(id, &adjacency);
            max_depth = max_depth.max(depth);
            *depth_distribution.entry(depth).or_insert(0) += 1;
        }

        let mut connections = vec![0usize; self.node_count()];
        for edge in self.edges() {
            connections[edge.source.index()] += 1;
            connections[edge.target.index()] += 1;
        }

        let avg_connections_per_table = if connections.is_empty() {
            0.0
        } else {
            connections.iter().sum::<usize>() as f64 / connections.len() as f64
        };

        let mut ranked: Vec<ConnectedTable> = self
            .node_ids()
            .map(|id| ConnectedTable {
                fqdn: self.fqdn(id).to_string(),
                connections: connections[id.index()],
            })
            .collect();
        // Stable sort keeps insertion order among ties
        ranked.sort_by(|a, b| b.connections.cmp(&a.connections));
        ranked.truncate(thresholds.top_connected);

        let metrics = HealthMetrics {
            total_tables,
            total_materialized_views,
            total_dependencies: self.edge_count(),
            dependency_cycles: cycles.len(),
            orphaned_tables: orphaned_tables.len(),
            max_dependency_depth: max_depth,
            avg_connections_per_table,
        };

        HealthReport {
            version: ReportVersion::CURRENT,
            recommendations: recommendations(&metrics, thresholds),
            metrics,
            depth_distribution,
            highly_connected_tables: ranked,
            cycles,
            orphaned_tables,
        }
    }
}

fn recommendations(metrics: &HealthMetrics, thresholds: &HealthThresholds) -> Vec<String> {
    let mut recommendations = Vec::new();

    if metrics.dependency_cycles > 0 {
        recommendations.push(format!(
            "Found {} dependency cycles - may cause processing deadlocks",
            metrics.dependency_cycles
        ));
    }

    if metrics.orphaned_tables > thresholds.max_orphans {
        recommendations.push(format!(
            "{} orphaned tables - consider cleanup or documentation",
            metrics.orphaned_tables
        ));
    }

    if metrics.max_dependency_depth > thresholds.max_depth {
        recommendations.push(format!(
            "Maximum dependency depth is {} - consider simplifying pipelines",
            metrics.max_dependency_depth
        ));
    }

    if metrics.total_materialized_views > metrics.total_tables.saturating_mul(thresholds.max_view_table_ratio) {
        recommendations.push(format!(
            "High MV to table ratio ({}/{}) - may impact performance",
            metrics.total_materialized_views, metrics.total_tables
        ));
    }

    if recommendations.is_empty() {
        recommendations.push(NO_ISSUES_RECOMMENDATION.to_string());
    }

    recommendations
}
