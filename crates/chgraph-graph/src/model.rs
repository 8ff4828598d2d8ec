//! Dependency graph model
//!
//! Nodes live in an arena addressed by [`NodeId`]; a map from FQDN to index
//! keeps lookups constant time. Edges reference nodes by index, so an edge
//! can never point at a node that is not in the graph.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Index of a node in the graph's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in insertion order
    pub fn index(self) -> usize {
        self.0
    }
}

/// One catalog table or view
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    database: String,
    name: String,
    fqdn: String,
}

impl Node {
    fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        let database = database.into();
        let name = name.into();
        let fqdn = format!("{}.{}", database, name);
        Self { database, name, fqdn }
    }

    /// Database name
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Table or view name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `database.name`, unique within a graph
    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fqdn)
    }
}

/// Kind of dependency an edge records
///
/// Serialized names are part of the export formats. NEVER rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    MaterializedView,
}

impl EdgeKind {
    /// Stable name used in exports
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::MaterializedView => "MaterializedView",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data flows from `source` through the view `via` into `target`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub via: NodeId,
    pub kind: EdgeKind,
}

/// Errors raised while assembling a graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Unknown node: {0}")]
    UnknownNode(String),
}

/// Directed graph of table dependencies created by materialized views
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    cluster: String,
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
    edges: Vec<Edge>,
    built: bool,
}

impl DependencyGraph {
    /// Create an empty, unbuilt graph for the named cluster
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            ..Self::default()
        }
    }

    /// Cluster the graph was discovered from
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Whether a full build has completed
    pub fn is_built(&self) -> bool {
        self.built
    }

    pub(crate) fn mark_built(&mut self) {
        self.built = true;
    }

    /// Add a node, returning the existing index if the FQDN is already present
    pub fn add_node(&mut self, database: impl Into<String>, name: impl Into<String>) -> NodeId {
        let node = Node::new(database, name);
        if let Some(&id) = self.index.get(&node.fqdn) {
            return id;
        }

        let id = NodeId(self.nodes.len());
        self.index.insert(node.fqdn.clone(), id);
        self.nodes.push(node);
        id
    }

    /// Add an edge between existing nodes, addressed by FQDN
    pub fn add_edge(&mut self, source: &str, target: &str, via: &str) -> Result<(), GraphError> {
        let source = self.require(source)?;
        let target = self.require(target)?;
        let via = self.require(via)?;
        self.push_edge(source, target, via);
        Ok(())
    }

    pub(crate) fn push_edge(&mut self, source: NodeId, target: NodeId, via: NodeId) {
        self.edges.push(Edge {
            source,
            target,
            via,
            kind: EdgeKind::MaterializedView,
        });
    }

    fn require(&self, fqdn: &str) -> Result<NodeId, GraphError> {
        self.node_id(fqdn)
            .ok_or_else(|| GraphError::UnknownNode(fqdn.to_string()))
    }

    /// Look up a node's index by FQDN
    pub fn node_id(&self, fqdn: &str) -> Option<NodeId> {
        self.index.get(fqdn).copied()
    }

    /// Look up a node by FQDN
    pub fn get(&self, fqdn: &str) -> Option<&Node> {
        self.node_id(fqdn).map(|id| self.node(id))
    }

    /// Check whether a node exists
    pub fn contains(&self, fqdn: &str) -> bool {
        self.index.contains_key(fqdn)
    }

    /// Resolve an index handed out by this graph
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn fqdn(&self, id: NodeId) -> &str {
        &self.nodes[id.0].fqdn
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Node indices in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// All edges in creation order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Human-readable `source -> target (via view)` form of an edge
    pub fn describe_edge(&self, edge: &Edge) -> String {
        format!(
            "{} -> {} (via {})",
            self.fqdn(edge.source),
            self.fqdn(edge.target),
            self.fqdn(edge.via)
        )
    }

    /// A node is a materialized view when some edge passes through it
    pub fn is_materialized_view(&self, fqdn: &str) -> bool {
        self.node_id(fqdn)
            .map(|id| self.is_view_node(id))
            .unwrap_or(false)
    }

    pub(crate) fn is_view_node(&self, id: NodeId) -> bool {
        self.edges.iter().any(|edge| edge.via == id)
    }

    /// Flags for every node: true when it is the `via` of some edge
    pub(crate) fn view_flags(&self) -> Vec<bool> {
        let mut flags = vec![false; self.nodes.len()];
        for edge in &self.edges {
            flags[edge.via.0] = true;
        }
        flags
    }

    /// Nodes of one database, in insertion order
    pub fn filter_by_database(&self, database: &str) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.database == database).collect()
    }

    /// SHA-256 over the sorted node and edge sets
    ///
    /// Two graphs with the same nodes and edges share a fingerprint no
    /// matter in which order they were added.
    pub fn fingerprint(&self) -> String {
        let mut fqdns: Vec<&str> = self.nodes.iter().map(|n| n.fqdn.as_str()).collect();
        fqdns.sort_unstable();

        let mut edges: Vec<(&str, &str, &str)> = self
            .edges
            .iter()
            .map(|e| (self.fqdn(e.source), self.fqdn(e.target), self.fqdn(e.via)))
            .collect();
        edges.sort_unstable();

        let mut hasher = Sha256::new();
        for fqdn in fqdns {
            hasher.update(b"N");
            hasher.update(fqdn.as_bytes());
            hasher.update(b"\n");
        }
        for (source, target, via) in edges {
            hasher.update(b"E");
            for part in [source, target, via] {
                hasher.update(part.as_bytes());
                hasher.update(b"\t");
            }
            hasher.update(b"\n");
        }

        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DependencyGraph {
        let mut graph = DependencyGraph::new("test");
        graph.add_node("raw", "events");
        graph.add_node("analytics", "mv_events_agg");
        graph.add_node("analytics", "events_agg");
        graph
            .add_edge("raw.events", "analytics.events_agg", "analytics.mv_events_agg")
            .unwrap();
        graph
    }

    #[test]
    fn nodes_are_unique_by_fqdn() {
        let mut graph = DependencyGraph::new("test");
        let first = graph.add_node("raw", "events");
        let second = graph.add_node("raw", "events");

        assert_eq!(first, second);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node(first).fqdn(), "raw.events");
        assert_eq!(graph.node(first).to_string(), "raw.events");
    }

    #[test]
    fn edge_with_unknown_endpoint_is_rejected() {
        let mut graph = sample();
        let result = graph.add_edge("raw.events", "analytics.missing", "analytics.mv_events_agg");

        assert_eq!(result, Err(GraphError::UnknownNode("analytics.missing".to_string())));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn view_membership_comes_from_edges() {
        let graph = sample();
        assert!(graph.is_materialized_view("analytics.mv_events_agg"));
        assert!(!graph.is_materialized_view("raw.events"));
        assert!(!graph.is_materialized_view("nope.nope"));
        assert_eq!(
            graph.describe_edge(&graph.edges()[0]),
            "raw.events -> analytics.events_agg (via analytics.mv_events_agg)"
        );
    }

    #[test]
    fn filter_by_database_keeps_insertion_order() {
        let graph = sample();
        let names: Vec<&str> = graph
            .filter_by_database("analytics")
            .iter()
            .map(|n| n.name())
            .collect();
        assert_eq!(names, vec!["mv_events_agg", "events_agg"]);
    }

    #[test]
    fn fingerprint_ignores_insertion_order() {
        let mut reordered = DependencyGraph::new("other");
        reordered.add_node("analytics", "events_agg");
        reordered.add_node("raw", "events");
        reordered.add_node("analytics", "mv_events_agg");
        reordered
            .add_edge("raw.events", "analytics.events_agg", "analytics.mv_events_agg")
            .unwrap();

        assert_eq!(sample().fingerprint(), reordered.fingerprint());
        assert_eq!(sample().fingerprint().len(), 64);

        reordered.add_node("raw", "users");
        assert_ne!(sample().fingerprint(), reordered.fingerprint());
    }
}
