//! Graph traversals
//!
//! Every query here is a read over a built graph. Unknown FQDNs and empty
//! graphs produce empty results rather than errors. Deep pipelines are walked
//! with explicit stacks, so traversal depth is bounded by memory and not by
//! the call stack.

use crate::model::{DependencyGraph, Edge, NodeId};
use serde::Serialize;
use std::collections::VecDeque;

/// Which side of a table to trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upstream,
    Downstream,
    Both,
}

impl Direction {
    fn includes_upstream(self) -> bool {
        matches!(self, Direction::Upstream | Direction::Both)
    }

    fn includes_downstream(self) -> bool {
        matches!(self, Direction::Downstream | Direction::Both)
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" | "upstream" => Ok(Direction::Upstream),
            "down" | "downstream" => Ok(Direction::Downstream),
            "both" => Ok(Direction::Both),
            other => Err(format!("unknown direction '{}' (expected up, down or both)", other)),
        }
    }
}

/// Transitive upstream and/or downstream tables
///
/// A side that was not requested is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Lineage<'g> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<Vec<&'g str>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub downstream: Option<Vec<&'g str>>,
}

/// Edge orientation used by the closure walk
#[derive(Clone, Copy)]
enum Flow {
    /// target -> source
    Up,
    /// source -> target
    Down,
}

impl Flow {
    fn step(self, edge: &Edge) -> (NodeId, NodeId) {
        match self {
            Flow::Up => (edge.target, edge.source),
            Flow::Down => (edge.source, edge.target),
        }
    }
}

impl DependencyGraph {
    /// Tables feeding `fqdn`, one entry per edge
    pub fn sources(&self, fqdn: &str) -> Vec<&str> {
        let Some(id) = self.node_id(fqdn) else {
            return Vec::new();
        };

        self.edges()
            .iter()
            .filter(|e| e.target == id)
            .map(|e| self.fqdn(e.source))
            .collect()
    }

    /// Tables fed by `fqdn`, one entry per edge
    pub fn targets(&self, fqdn: &str) -> Vec<&str> {
        let Some(id) = self.node_id(fqdn) else {
            return Vec::new();
        };

        self.edges()
            .iter()
            .filter(|e| e.source == id)
            .map(|e| self.fqdn(e.target))
            .collect()
    }

    /// Views reading from or writing to `fqdn`, without duplicates
    pub fn materialized_views(&self, fqdn: &str) -> Vec<&str> {
        let Some(id) = self.node_id(fqdn) else {
            return Vec::new();
        };

        let mut seen = vec![false; self.node_count()];
        let mut views = Vec::new();
        for edge in self.edges().iter().filter(|e| e.source == id || e.target == id) {
            if !std::mem::replace(&mut seen[edge.via.index()], true) {
                views.push(self.fqdn(edge.via));
            }
        }
        views
    }

    /// `[source, target]` when a direct edge exists, otherwise empty
    ///
    /// Only a single hop is considered; see [`DependencyGraph::critical_path`]
    /// for multi-hop paths.
    pub fn dependency_chain(&self, source: &str, target: &str) -> Vec<&str> {
        let (Some(from), Some(to)) = (self.node_id(source), self.node_id(target)) else {
            return Vec::new();
        };

        if self.edges().iter().any(|e| e.source == from && e.target == to) {
            vec![self.fqdn(from), self.fqdn(to)]
        } else {
            Vec::new()
        }
    }

    /// The table itself plus the views and targets it feeds directly
    pub fn analyze_impact(&self, fqdn: &str) -> Vec<&str> {
        let Some(id) = self.node_id(fqdn) else {
            return Vec::new();
        };

        let mut seen = vec![false; self.node_count()];
        seen[id.index()] = true;
        let mut affected = vec![self.fqdn(id)];

        for edge in self.edges().iter().filter(|e| e.source == id) {
            for node in [edge.via, edge.target] {
                if !std::mem::replace(&mut seen[node.index()], true) {
                    affected.push(self.fqdn(node));
                }
            }
        }
        affected
    }

    /// Longest chain of edges leading out of `fqdn`
    ///
    /// A target already on the current path ends that branch and counts as
    /// one more hop. Results are not memoized, so every path is explored.
    pub fn dependency_depth(&self, fqdn: &str) -> usize {
        match self.node_id(fqdn) {
            Some(id) => self.depth_from(id, &self.adjacency()),
            None => 0,
        }
    }

    /// Outgoing targets per node, in edge order
    pub(crate) fn adjacency(&self) -> Vec<Vec<NodeId>> {
        let mut adjacency = vec![Vec::new(); self.node_count()];
        for edge in self.edges() {
            adjacency[edge.source.index()].push(edge.target);
        }
        adjacency
    }

    pub(crate) fn depth_from(&self, start: NodeId, adjacency: &[Vec<NodeId>]) -> usize {
        struct Frame {
            node: NodeId,
            next: usize,
            best: usize,
        }

        let mut on_path = vec![false; self.node_count()];
        on_path[start.index()] = true;
        let mut stack = vec![Frame { node: start, next: 0, best: 0 }];

        while let Some(frame) = stack.last_mut() {
            let neighbors = &adjacency[frame.node.index()];

            if frame.next < neighbors.len() {
                let target = neighbors[frame.next];
                frame.next += 1;

                if on_path[target.index()] {
                    frame.best = frame.best.max(1);
                } else {
                    on_path[target.index()] = true;
                    stack.push(Frame { node: target, next: 0, best: 0 });
                }
                continue;
            }

            let (node, best) = (frame.node, frame.best);
            stack.pop();
            on_path[node.index()] = false;

            match stack.last_mut() {
                Some(parent) => parent.best = parent.best.max(best + 1),
                None => return best,
            }
        }

        0
    }

    /// Every cycle met by a depth-first walk over source -> target edges
    ///
    /// Roots are tried in insertion order and neighbors in edge order. A
    /// cycle is reported each time the walk closes it, so overlapping cycles
    /// may share nodes; nothing is de-duplicated.
    pub fn detect_cycles(&self) -> Vec<Vec<&str>> {
        let adjacency = self.adjacency();
        let mut visited = vec![false; self.node_count()];
        let mut on_stack = vec![false; self.node_count()];
        let mut cycles = Vec::new();

        for root in self.node_ids() {
            if visited[root.index()] {
                continue;
            }

            // (node, next neighbor); the frames double as the current path
            let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
            visited[root.index()] = true;
            on_stack[root.index()] = true;

            while let Some(&(node, next)) = stack.last() {
                let neighbors = &adjacency[node.index()];

                if next >= neighbors.len() {
                    stack.pop();
                    on_stack[node.index()] = false;
                    continue;
                }

                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }

                let neighbor = neighbors[next];
                if on_stack[neighbor.index()] {
                    if let Some(start) = stack.iter().position(|&(n, _)| n == neighbor) {
                        cycles.push(stack[start..].iter().map(|&(n, _)| self.fqdn(n)).collect());
                    }
                } else if !visited[neighbor.index()] {
                    visited[neighbor.index()] = true;
                    on_stack[neighbor.index()] = true;
                    stack.push((neighbor, 0));
                }
            }
        }

        cycles
    }

    /// Nodes touched by no edge, in insertion order
    pub fn orphans(&self) -> Vec<&str> {
        let mut connected = vec![false; self.node_count()];
        for edge in self.edges() {
            connected[edge.source.index()] = true;
            connected[edge.target.index()] = true;
            connected[edge.via.index()] = true;
        }

        self.node_ids()
            .filter(|id| !connected[id.index()])
            .map(|id| self.fqdn(id))
            .collect()
    }

    /// Shortest source -> target hop sequence between two tables
    ///
    /// Returns `[source]` when both ends are the same node, and an empty
    /// vector when either end is unknown or unreachable.
    pub fn critical_path(&self, source: &str, target: &str) -> Vec<&str> {
        let (Some(from), Some(to)) = (self.node_id(source), self.node_id(target)) else {
            return Vec::new();
        };

        let mut parent: Vec<Option<NodeId>> = vec![None; self.node_count()];
        let mut visited = vec![false; self.node_count()];
        let mut queue = VecDeque::new();
        visited[from.index()] = true;
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![self.fqdn(current)];
                let mut cursor = current;
                while let Some(previous) = parent[cursor.index()] {
                    path.push(self.fqdn(previous));
                    cursor = previous;
                }
                path.reverse();
                return path;
            }

            for edge in self.edges().iter().filter(|e| e.source == current) {
                if !visited[edge.target.index()] {
                    visited[edge.target.index()] = true;
                    parent[edge.target.index()] = Some(current);
                    queue.push_back(edge.target);
                }
            }
        }

        Vec::new()
    }

    /// Transitive closure of sources and/or targets
    ///
    /// The starting table appears in its own lineage only when a cycle leads
    /// back to it.
    pub fn lineage(&self, fqdn: &str, direction: Direction) -> Lineage<'_> {
        let start = self.node_id(fqdn);
        let walk = |flow| start.map(|id| self.closure(id, flow)).unwrap_or_default();

        Lineage {
            upstream: direction.includes_upstream().then(|| walk(Flow::Up)),
            downstream: direction.includes_downstream().then(|| walk(Flow::Down)),
        }
    }

    fn closure(&self, start: NodeId, flow: Flow) -> Vec<&str> {
        let mut expanded = vec![false; self.node_count()];
        let mut found = vec![false; self.node_count()];
        let mut result = Vec::new();

        expanded[start.index()] = true;
        // (node, position in the edge list to resume scanning from)
        let mut stack = vec![(start, 0usize)];

        while let Some(frame) = stack.last_mut() {
            let (node, position) = *frame;
            let next = self.edges()[position..]
                .iter()
                .enumerate()
                .find_map(|(offset, edge)| {
                    let (from, to) = flow.step(edge);
                    (from == node).then_some((position + offset, to))
                });

            let Some((index, neighbor)) = next else {
                stack.pop();
                continue;
            };
            frame.1 = index + 1;

            if !std::mem::replace(&mut found[neighbor.index()], true) {
                result.push(self.fqdn(neighbor));
            }
            if !std::mem::replace(&mut expanded[neighbor.index()], true) {
                stack.push((neighbor, 0));
            }
        }

        result
    }
}
