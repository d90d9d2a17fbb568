use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::model::{TypeId, TypedGraph};
use petgraph::prelude::NodeIndex;

/// One quadruple of a DFS code word. `src`/`dst` are node positions in
/// discovery order; a forward (node-adding) edge has `dst > src`, a
/// ring-closing edge has `dst < src`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeEdge {
    pub dst: usize,
    pub src: usize,
    pub edge_type: TypeId,
    pub dst_type: TypeId,
}

impl CodeEdge {
    pub fn is_forward(&self) -> bool {
        self.dst > self.src
    }
}

impl Ord for CodeEdge {
    /// Field precedence of the canonical order: destination index ascending,
    /// source index descending, edge type ascending, destination type
    /// ascending.
    fn cmp(&self, other: &Self) -> Ordering {
        self.dst
            .cmp(&other.dst)
            .then_with(|| other.src.cmp(&self.src))
            .then_with(|| self.edge_type.cmp(&other.edge_type))
            .then_with(|| self.dst_type.cmp(&other.dst_type))
    }
}

impl PartialOrd for CodeEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A complete DFS code word: the root node type followed by the edge
/// quadruples. Total order is lexicographic, so equality decides
/// isomorphism within a search and the minimum over all enumerations is the
/// canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DfsCode {
    pub root_type: TypeId,
    pub edges: Vec<CodeEdge>,
}

impl DfsCode {
    pub fn root(root_type: TypeId) -> Self {
        Self {
            root_type,
            edges: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.edges.iter().filter(|edge| edge.is_forward()).count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Positions on the path from the root to the rightmost leaf, root
    /// first. Identical for every embedding of the same fragment.
    pub fn rightmost_path(&self) -> Vec<usize> {
        let leaf = self.node_count() - 1;
        let mut path = vec![leaf];
        let mut current = leaf;
        while current != 0 {
            let parent = self
                .edges
                .iter()
                .find(|edge| edge.is_forward() && edge.dst == current)
                .map(|edge| edge.src)
                .expect("forward edge for every non-root position");
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Type of the node at `position`.
    pub fn node_type(&self, position: usize) -> TypeId {
        if position == 0 {
            return self.root_type;
        }
        self.edges
            .iter()
            .find(|edge| edge.is_forward() && edge.dst == position)
            .map(|edge| edge.dst_type)
            .expect("forward edge for every non-root position")
    }

    /// True when the pattern already holds an edge between the two
    /// positions.
    pub fn has_edge_between(&self, a: usize, b: usize) -> bool {
        self.edges
            .iter()
            .any(|edge| (edge.src == a && edge.dst == b) || (edge.src == b && edge.dst == a))
    }

    /// The forward code edge leaving `position` along the rightmost path,
    /// i.e. the one whose destination is the next rightmost-path position.
    pub fn forward_edge_from(&self, position: usize, next_position: usize) -> Option<&CodeEdge> {
        self.edges
            .iter()
            .find(|edge| edge.is_forward() && edge.src == position && edge.dst == next_position)
    }

    pub fn extended(&self, extension: CodeEdge) -> Self {
        let mut edges = Vec::with_capacity(self.edges.len() + 1);
        edges.extend_from_slice(&self.edges);
        edges.push(extension);
        Self {
            root_type: self.root_type,
            edges,
        }
    }

    /// Realize the code as a concrete pattern graph. Node insertion order is
    /// position order, so `NodeIndex::new(p)` is the node at position `p`
    /// and edge insertion order is code order.
    pub fn to_graph(&self) -> TypedGraph {
        let mut graph = TypedGraph::with_capacity(self.node_count(), self.edge_count());
        graph.add_node(self.root_type);
        for edge in &self.edges {
            if edge.is_forward() {
                let added = graph.add_node(edge.dst_type);
                debug_assert_eq!(added.index(), edge.dst);
            }
            graph.add_edge(
                NodeIndex::new(edge.src),
                NodeIndex::new(edge.dst),
                edge.edge_type,
            );
        }
        graph
    }
}

impl Ord for DfsCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.root_type
            .cmp(&other.root_type)
            .then_with(|| self.edges.cmp(&other.edges))
    }
}

impl PartialOrd for DfsCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DfsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.root_type)?;
        for edge in &self.edges {
            write!(
                f,
                " ({},{},{},{})",
                edge.dst, edge.src, edge.edge_type, edge.dst_type
            )?;
        }
        Ok(())
    }
}
