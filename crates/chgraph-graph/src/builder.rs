//! Graph construction from catalog metadata
//!
//! One pass over the catalog: every relation becomes a node, then each
//! materialized view's dependencies are split into sources and targets and
//! joined pairwise into edges.
//!
//! A dependency is a target when it is the view's `TO` destination, or when it
//! sits in the view's database and its name carries a target keyword
//! (`agg`, `summary`, `mart`, `dim`, `fact` by default). Everything else is
//! a source.

use crate::model::{DependencyGraph, NodeId};
use chgraph_catalog::{CatalogError, MetadataSource};
use chgraph_core::{parse_write_destination, BuildWarning, ClassificationConfig, Config, QualifiedName};

/// Errors that abort a build
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// A built graph plus the non-fatal problems found along the way
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub graph: DependencyGraph,
    pub warnings: Vec<BuildWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Source,
    Target,
}

/// Builds a [`DependencyGraph`] from a [`MetadataSource`]
pub struct GraphBuilder<'a> {
    source: &'a dyn MetadataSource,
    classification: ClassificationConfig,
}

impl<'a> GraphBuilder<'a> {
    /// Create a builder with the default target keywords
    pub fn new(source: &'a dyn MetadataSource) -> Self {
        Self {
            source,
            classification: ClassificationConfig::default(),
        }
    }

    /// Create a builder using the classification settings from config
    pub fn from_config(source: &'a dyn MetadataSource, config: &Config) -> Self {
        Self::new(source).with_classification(config.classification.clone())
    }

    /// Replace the source/target classification settings
    pub fn with_classification(mut self, classification: ClassificationConfig) -> Self {
        self.classification = classification;
        self
    }

    /// Discover every relation and view dependency and assemble the graph
    ///
    /// Any catalog error aborts the build; no partial graph is returned.
    pub fn build(&self) -> Result<BuildOutcome, BuildError> {
        let cluster = self.source.cluster_name();
        tracing::info!("Building dependency graph for cluster {}", cluster);

        let relations = self.source.list_relations()?;
        let views = self.source.list_materialized_views()?;
        tracing::info!(
            "Found {} tables, {} materialized views",
            relations.len(),
            views.len()
        );

        let mut graph = DependencyGraph::new(cluster);
        for relation in &relations {
            graph.add_node(relation.database.as_str(), relation.name.as_str());
        }

        let mut warnings = Vec::new();
        for view in &views {
            self.process_view(&mut graph, view, &mut warnings)?;
        }

        graph.mark_built();
        tracing::info!(
            "Graph built: {} nodes, {} edges, {} warnings",
            graph.node_count(),
            graph.edge_count(),
            warnings.len()
        );

        Ok(BuildOutcome { graph, warnings })
    }

    fn process_view(
        &self,
        graph: &mut DependencyGraph,
        view: &QualifiedName,
        warnings: &mut Vec<BuildWarning>,
    ) -> Result<(), BuildError> {
        let view_fqdn = view.fqdn();
        let dependencies = self.source.view_dependencies(view)?;

        if dependencies.is_empty() {
            record(warnings, BuildWarning::no_dependencies(&view_fqdn));
            return Ok(());
        }

        // Fetched on first use; `Some(None)` means the DDL has no TO clause
        let mut destination: Option<Option<QualifiedName>> = None;
        let mut sources: Vec<NodeId> = Vec::new();
        let mut targets: Vec<NodeId> = Vec::new();

        for dependency in &dependencies {
            if dependency == view {
                continue;
            }

            let role = self.classify(view, dependency, &mut destination)?;
            let dependency_fqdn = dependency.fqdn();
            tracing::debug!("{} classified as {:?} of {}", dependency_fqdn, role, view_fqdn);

            match (graph.node_id(&dependency_fqdn), role) {
                (Some(id), Role::Source) => sources.push(id),
                (Some(id), Role::Target) => targets.push(id),
                (None, Role::Source) => {
                    record(warnings, BuildWarning::missing_source(&view_fqdn, dependency_fqdn))
                }
                (None, Role::Target) => {
                    record(warnings, BuildWarning::missing_target(&view_fqdn, dependency_fqdn))
                }
            }
        }

        let Some(via) = graph.node_id(&view_fqdn) else {
            record(warnings, BuildWarning::missing_view_node(&view_fqdn));
            return Ok(());
        };

        for &source in &sources {
            for &target in &targets {
                graph.push_edge(source, target, via);
                tracing::debug!(
                    "Created edge: {} -> {} (via {})",
                    graph.node(source),
                    graph.node(target),
                    view_fqdn
                );
            }
        }

        Ok(())
    }

    fn classify(
        &self,
        view: &QualifiedName,
        dependency: &QualifiedName,
        destination: &mut Option<Option<QualifiedName>>,
    ) -> Result<Role, CatalogError> {
        if destination.is_none() {
            let parsed = self
                .source
                .create_statement(view)?
                .and_then(|sql| parse_write_destination(&sql, &view.database));
            *destination = Some(parsed);
        }

        if destination.as_ref().and_then(Option::as_ref) == Some(dependency) {
            return Ok(Role::Target);
        }

        if dependency.database == view.database && self.classification.is_target_name(&dependency.table) {
            return Ok(Role::Target);
        }

        Ok(Role::Source)
    }
}

fn record(warnings: &mut Vec<BuildWarning>, warning: BuildWarning) {
    tracing::warn!("{}", warning);
    warnings.push(warning);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chgraph_catalog::{CatalogOperation, MockCatalogBuilder, Relation};
    use chgraph_core::WarningCode;
    use pretty_assertions::assert_eq;

    /// Lists a view that its own relation listing leaves out, as a catalog
    /// can when the view is dropped between the two queries
    struct VanishedView;

    impl MetadataSource for VanishedView {
        fn cluster_name(&self) -> &str {
            "test"
        }

        fn list_relations(&self) -> Result<Vec<Relation>, CatalogError> {
            Ok(vec![
                Relation::new("raw", "events", "MergeTree"),
                Relation::new("analytics", "events_agg", "SummingMergeTree"),
            ])
        }

        fn list_materialized_views(&self) -> Result<Vec<QualifiedName>, CatalogError> {
            Ok(vec![QualifiedName::new("analytics", "mv_events_agg")])
        }

        fn view_dependencies(&self, _view: &QualifiedName) -> Result<Vec<QualifiedName>, CatalogError> {
            Ok(vec![
                QualifiedName::new("raw", "events"),
                QualifiedName::new("analytics", "events_agg"),
            ])
        }

        fn create_statement(&self, _view: &QualifiedName) -> Result<Option<String>, CatalogError> {
            Ok(None)
        }

        fn list_databases(&self) -> Result<Vec<String>, CatalogError> {
            Ok(vec!["analytics".to_string(), "raw".to_string()])
        }

        fn table_counts(&self) -> Result<Vec<(String, u64)>, CatalogError> {
            Ok(Vec::new())
        }

        fn view_counts(&self) -> Result<Vec<(String, u64)>, CatalogError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn to_clause_marks_cross_database_target() {
        let catalog = MockCatalogBuilder::new("test")
            .with_table("raw", "events", "MergeTree")
            .with_table("warehouse", "sink", "MergeTree")
            .with_view(
                "analytics",
                "mv",
                Some("CREATE MATERIALIZED VIEW analytics.mv TO warehouse.sink AS SELECT * FROM raw.events"),
                &[("raw", "events"), ("warehouse", "sink")],
            )
            .build();

        let outcome = GraphBuilder::new(&catalog).build().unwrap();
        let graph = &outcome.graph;

        assert!(graph.is_built());
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(
            graph.describe_edge(&graph.edges()[0]),
            "raw.events -> warehouse.sink (via analytics.mv)"
        );
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn keyword_fallback_without_to_clause() {
        let catalog = MockCatalogBuilder::new("test")
            .with_table("raw", "events", "MergeTree")
            .with_table("analytics", "daily_agg", "SummingMergeTree")
            .with_table("raw", "events_agg", "MergeTree")
            .with_view(
                "analytics",
                "mv_daily",
                None,
                &[("raw", "events"), ("analytics", "daily_agg"), ("raw", "events_agg")],
            )
            .build();

        let outcome = GraphBuilder::new(&catalog).build().unwrap();
        let graph = &outcome.graph;

        // Keyword matches only count inside the view's own database
        assert_eq!(graph.sources("analytics.daily_agg"), vec!["raw.events", "raw.events_agg"]);
        assert!(graph.targets("raw.events_agg").contains(&"analytics.daily_agg"));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn self_dependency_is_skipped() {
        let catalog = MockCatalogBuilder::new("test")
            .with_table("raw", "events", "MergeTree")
            .with_table("analytics", "events_agg", "MergeTree")
            .with_view(
                "analytics",
                "mv",
                None,
                &[("analytics", "mv"), ("raw", "events"), ("analytics", "events_agg")],
            )
            .build();

        let outcome = GraphBuilder::new(&catalog).build().unwrap();
        assert_eq!(outcome.graph.edge_count(), 1);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn custom_keywords() {
        let catalog = MockCatalogBuilder::new("test")
            .with_table("db", "input", "MergeTree")
            .with_table("db", "rollup", "MergeTree")
            .with_view("db", "mv", None, &[("db", "input"), ("db", "rollup")])
            .build();

        let default = GraphBuilder::new(&catalog).build().unwrap();
        assert_eq!(default.graph.edge_count(), 0);

        let custom = GraphBuilder::new(&catalog)
            .with_classification(ClassificationConfig {
                target_keywords: vec!["ROLLUP".to_string()],
            })
            .build()
            .unwrap();
        assert_eq!(custom.graph.sources("db.rollup"), vec!["db.input"]);
    }

    #[test]
    fn create_statement_fetched_once_per_view() {
        let catalog = MockCatalogBuilder::new("test")
            .with_table("raw", "a", "MergeTree")
            .with_table("raw", "b", "MergeTree")
            .with_table("out", "x", "MergeTree")
            .with_view(
                "out",
                "mv",
                Some("CREATE MATERIALIZED VIEW out.mv TO out.x AS SELECT * FROM raw.a"),
                &[("raw", "a"), ("raw", "b"), ("out", "x")],
            )
            .with_view("out", "mv_empty", None, &[])
            .build();

        let outcome = GraphBuilder::new(&catalog).build().unwrap();
        assert_eq!(outcome.graph.edge_count(), 2);

        assert_eq!(catalog.call_count(CatalogOperation::ListRelations), 1);
        assert_eq!(catalog.call_count(CatalogOperation::ListMaterializedViews), 1);
        assert_eq!(catalog.call_count(CatalogOperation::ViewDependencies), 2);
        assert_eq!(catalog.call_count(CatalogOperation::CreateStatement), 1);

        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].code, WarningCode::NoDependencies);
    }

    #[test]
    fn view_missing_from_relations_adds_no_edges() {
        let outcome = GraphBuilder::new(&VanishedView).build().unwrap();

        assert_eq!(outcome.graph.node_count(), 2);
        assert_eq!(outcome.graph.edge_count(), 0);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].code, WarningCode::MissingViewNode);
        assert_eq!(outcome.warnings[0].view, "analytics.mv_events_agg");
    }

    #[test]
    fn catalog_errors_abort_the_build() {
        let catalog = MockCatalogBuilder::new("test")
            .with_table("raw", "events", "MergeTree")
            .with_view("analytics", "mv", None, &[("raw", "events")])
            .with_error(
                CatalogOperation::CreateStatement,
                CatalogError::NetworkError("timeout".to_string()),
            )
            .build();

        let result = GraphBuilder::new(&catalog).build();
        assert!(matches!(
            result,
            Err(BuildError::Catalog(CatalogError::NetworkError(_)))
        ));
    }
}
