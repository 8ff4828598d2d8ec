//! Graph exports
//!
//! Formats:
//! - **JSON**: the [`GraphRecord`] interchange document
//! - **Node/link**: NetworkX-compatible `{nodes, edges}` JSON
//! - **DOT**: Graphviz source
//! - **GraphML**: XML for Gephi, yEd and similar tools
//!
//! Every export walks nodes in insertion order and edges in creation order,
//! so output is reproducible for a given graph.

use crate::model::{DependencyGraph, EdgeKind, NodeId};
use chgraph_core::ExportConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors raised while exporting
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("Unsupported format: {0}. Supported formats: json, node-link, dot, graphml")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    NodeLink,
    Dot,
    GraphMl,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::NodeLink => "node-link",
            ExportFormat::Dot => "dot",
            ExportFormat::GraphMl => "graphml",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "node-link" | "nodelink" | "networkx" => Ok(ExportFormat::NodeLink),
            "dot" | "graphviz" => Ok(ExportFormat::Dot),
            "graphml" => Ok(ExportFormat::GraphMl),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// How materialized views appear in node/link and DOT output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    /// Views are nodes; each dependency becomes `source -> view -> target`
    #[default]
    ExpandViews,

    /// Views are dropped; tables connect directly
    CollapseViews,
}

/// Options shared by every export format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub views: ViewMode,

    /// Indent JSON output
    pub pretty: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            views: ViewMode::ExpandViews,
            pretty: true,
        }
    }
}

impl From<&ExportConfig> for ExportOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            views: if config.collapse_views {
                ViewMode::CollapseViews
            } else {
                ViewMode::ExpandViews
            },
            pretty: true,
        }
    }
}

/// One node in the interchange document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub fqdn: String,
    pub database: String,
    pub name: String,

    /// Always `"table"`; views are identified through edges
    #[serde(rename = "type")]
    pub node_type: String,
}

/// One edge in the interchange document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub materialized_view: String,

    #[serde(rename = "type")]
    pub edge_type: EdgeKind,
}

/// Graph-level facts in the interchange document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub cluster: String,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub built: bool,
}

/// Structured, serializable view of a whole graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub metadata: GraphMetadata,
}

impl GraphRecord {
    /// Serialize to JSON
    pub fn to_json(&self, pretty: bool) -> Result<String, ExportError> {
        let result = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        result.map_err(|e| ExportError::Serialize(e.to_string()))
    }

    /// Parse a JSON interchange document
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        serde_json::from_str(json).map_err(|e| ExportError::Parse(e.to_string()))
    }
}

/// Node entry of the node/link format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLinkNode {
    pub id: String,
    pub database: String,
    pub name: String,
    pub label: String,
}

/// Edge entry of the node/link format
///
/// Expanded edges carry `feeds` / `populates`; collapsed edges carry the
/// edge kind and the view they pass through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLinkEdge {
    pub source: String,
    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materialized_view: Option<String>,

    #[serde(rename = "type")]
    pub edge_type: String,
}

/// NetworkX-compatible node/link document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLinkGraph {
    pub nodes: Vec<NodeLinkNode>,
    pub edges: Vec<NodeLinkEdge>,
}

impl DependencyGraph {
    /// Structured record of every node and edge
    pub fn to_record(&self) -> GraphRecord {
        let nodes = self
            .nodes()
            .iter()
            .map(|node| NodeRecord {
                fqdn: node.fqdn().to_string(),
                database: node.database().to_string(),
                name: node.name().to_string(),
                node_type: "table".to_string(),
            })
            .collect();

        let edges = self
            .edges()
            .iter()
            .map(|edge| EdgeRecord {
                source: self.fqdn(edge.source).to_string(),
                target: self.fqdn(edge.target).to_string(),
                materialized_view: self.fqdn(edge.via).to_string(),
                edge_type: edge.kind,
            })
            .collect();

        GraphRecord {
            nodes,
            edges,
            metadata: GraphMetadata {
                cluster: self.cluster().to_string(),
                total_nodes: self.node_count(),
                total_edges: self.edge_count(),
                built: self.is_built(),
            },
        }
    }

    /// The structured record as JSON
    pub fn to_json(&self, pretty: bool) -> Result<String, ExportError> {
        self.to_record().to_json(pretty)
    }

    /// NetworkX-compatible node/link document
    pub fn to_node_link(&self, mode: ViewMode) -> NodeLinkGraph {
        let views = self.view_flags();
        let keep = |id: NodeId| mode == ViewMode::ExpandViews || !views[id.index()];

        let nodes = self
            .node_ids()
            .filter(|&id| keep(id))
            .map(|id| {
                let node = self.node(id);
                NodeLinkNode {
                    id: node.fqdn().to_string(),
                    database: node.database().to_string(),
                    name: node.name().to_string(),
                    label: node.fqdn().to_string(),
                }
            })
            .collect();

        let mut edges = Vec::new();
        for edge in self.edges() {
            let (source, target, via) = (self.fqdn(edge.source), self.fqdn(edge.target), self.fqdn(edge.via));
            match mode {
                ViewMode::ExpandViews => {
                    edges.push(link(source, via, None, "feeds"));
                    edges.push(link(via, target, None, "populates"));
                }
                ViewMode::CollapseViews => {
                    if keep(edge.source) && keep(edge.target) {
                        edges.push(link(source, target, Some(via), edge.kind.as_str()));
                    }
                }
            }
        }

        NodeLinkGraph { nodes, edges }
    }

    /// Graphviz DOT source
    pub fn to_dot(&self, mode: ViewMode) -> String {
        let views = self.view_flags();
        let mut lines = vec![
            "digraph dependency_graph {".to_string(),
            "  rankdir=LR;".to_string(),
            "  node [shape=box, style=filled];".to_string(),
            String::new(),
        ];

        for id in self.node_ids() {
            let is_view = views[id.index()];
            if is_view && mode == ViewMode::CollapseViews {
                continue;
            }

            let fqdn = self.fqdn(id);
            let color = if is_view { "lightblue" } else { "lightgreen" };
            lines.push(format!(
                "  {} [label=\"{}\", fillcolor={}];",
                dot_id(fqdn),
                dot_label(fqdn),
                color
            ));
        }

        lines.push(String::new());

        for edge in self.edges() {
            let source = dot_id(self.fqdn(edge.source));
            let target = dot_id(self.fqdn(edge.target));

            match mode {
                ViewMode::ExpandViews => {
                    let via = dot_id(self.fqdn(edge.via));
                    lines.push(format!("  {} -> {} [label=\"feeds\"];", source, via));
                    lines.push(format!("  {} -> {} [label=\"populates\"];", via, target));
                }
                ViewMode::CollapseViews => {
                    if views[edge.source.index()] || views[edge.target.index()] {
                        continue;
                    }
                    lines.push(format!(
                        "  {} -> {} [label=\"{}\"];",
                        source,
                        target,
                        dot_label(self.node(edge.via).name())
                    ));
                }
            }
        }

        lines.push("}".to_string());
        lines.join("\n")
    }

    /// GraphML document
    pub fn to_graphml(&self) -> String {
        let views = self.view_flags();
        let mut lines = vec![
            r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
            r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns""#.to_string(),
            r#"         xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#.to_string(),
            r#"         xsi:schemaLocation="http://graphml.graphdrawing.org/xmlns"#.to_string(),
            r#"         http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd">"#.to_string(),
            r#"  <key id="database" for="node" attr.name="database" attr.type="string"/>"#.to_string(),
            r#"  <key id="table_name" for="node" attr.name="table_name" attr.type="string"/>"#.to_string(),
            r#"  <key id="node_type" for="node" attr.name="node_type" attr.type="string"/>"#.to_string(),
            r#"  <key id="edge_type" for="edge" attr.name="edge_type" attr.type="string"/>"#.to_string(),
            r#"  <key id="materialized_view" for="edge" attr.name="materialized_view" attr.type="string"/>"#
                .to_string(),
            String::new(),
            r#"  <graph id="dependency_graph" edgedefault="directed">"#.to_string(),
        ];

        for id in self.node_ids() {
            let node = self.node(id);
            let node_type = if views[id.index()] { "MaterializedView" } else { "Table" };

            lines.push(format!("    <node id=\"{}\">", xml_escape(&dot_id(node.fqdn()))));
            lines.push(format!("      <data key=\"database\">{}</data>", xml_escape(node.database())));
            lines.push(format!("      <data key=\"table_name\">{}</data>", xml_escape(node.name())));
            lines.push(format!("      <data key=\"node_type\">{}</data>", node_type));
            lines.push("    </node>".to_string());
        }

        for (i, edge) in self.edges().iter().enumerate() {
            lines.push(format!(
                "    <edge id=\"e{}\" source=\"{}\" target=\"{}\">",
                i,
                xml_escape(&dot_id(self.fqdn(edge.source))),
                xml_escape(&dot_id(self.fqdn(edge.target)))
            ));
            lines.push(format!("      <data key=\"edge_type\">{}</data>", edge.kind));
            lines.push(format!(
                "      <data key=\"materialized_view\">{}</data>",
                xml_escape(self.fqdn(edge.via))
            ));
            lines.push("    </edge>".to_string());
        }

        lines.push("  </graph>".to_string());
        lines.push("</graphml>".to_string());
        lines.join("\n")
    }

    /// Render in the requested format
    pub fn render(&self, format: ExportFormat, options: &ExportOptions) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json => self.to_json(options.pretty),
            ExportFormat::NodeLink => {
                let document = self.to_node_link(options.views);
                let result = if options.pretty {
                    serde_json::to_string_pretty(&document)
                } else {
                    serde_json::to_string(&document)
                };
                result.map_err(|e| ExportError::Serialize(e.to_string()))
            }
            ExportFormat::Dot => Ok(self.to_dot(options.views)),
            ExportFormat::GraphMl => Ok(self.to_graphml()),
        }
    }

    /// Render and write to `path`
    pub fn save_to_file(&self, path: &Path, format: ExportFormat, options: &ExportOptions) -> Result<(), ExportError> {
        let content = self.render(format, options)?;
        std::fs::write(path, content).map_err(|e| ExportError::Io(format!("{}: {}", path.display(), e)))?;

        tracing::info!("Graph saved to {} in {} format", path.display(), format);
        Ok(())
    }
}

fn link(source: &str, target: &str, via: Option<&str>, edge_type: &str) -> NodeLinkEdge {
    NodeLinkEdge {
        source: source.to_string(),
        target: target.to_string(),
        materialized_view: via.map(str::to_string),
        edge_type: edge_type.to_string(),
    }
}

/// Graphviz identifier for an FQDN
fn dot_id(fqdn: &str) -> String {
    fqdn.replace(|c: char| c == '.' || c == '-', "_")
}

fn dot_label(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
