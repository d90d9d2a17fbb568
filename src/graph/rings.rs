use log::warn;
use petgraph::prelude::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::graph::model::TypedGraph;

/// Maximum number of rings tracked per graph; membership is a `u64` bitset
/// per edge.
pub const MAX_RINGS: usize = 64;

/// Ring membership for every edge of one graph: `edge_rings[e]` has bit `r`
/// set when edge `e` lies on simple ring `r`.
#[derive(Debug, Clone, Default)]
pub struct RingMarks {
    pub rings: Vec<Vec<EdgeIndex>>,
    pub edge_rings: Vec<u64>,
}

impl RingMarks {
    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    pub fn edge_in_ring(&self, edge: EdgeIndex) -> bool {
        self.edge_rings
            .get(edge.index())
            .map(|bits| *bits != 0)
            .unwrap_or(false)
    }
}

/// Enumerate simple rings of size 3..=`max_size` and mark the edges on them.
///
/// Each ring is discovered exactly once: the walk only starts at the ring's
/// smallest node index, only visits larger indices, and fixes the traversal
/// direction by requiring the second node to be smaller than the last.
pub fn detect_rings(graph: &TypedGraph, max_size: usize) -> RingMarks {
    let mut marks = RingMarks {
        rings: Vec::new(),
        edge_rings: vec![0; graph.edge_count()],
    };
    if max_size < 3 {
        return marks;
    }

    let mut truncated = false;
    for start in graph.node_indices() {
        let mut node_path = vec![start];
        let mut edge_path = Vec::new();
        walk(
            graph,
            start,
            max_size,
            &mut node_path,
            &mut edge_path,
            &mut marks,
            &mut truncated,
        );
    }
    if truncated {
        warn!(
            "ring detection capped at {} rings; remaining rings unmarked",
            MAX_RINGS
        );
    }
    marks
}

fn walk(
    graph: &TypedGraph,
    start: NodeIndex,
    max_size: usize,
    node_path: &mut Vec<NodeIndex>,
    edge_path: &mut Vec<EdgeIndex>,
    marks: &mut RingMarks,
    truncated: &mut bool,
) {
    let current = *node_path.last().expect("path non-empty");
    for edge in graph.edges(current) {
        let next = if edge.source() == current {
            edge.target()
        } else {
            edge.source()
        };
        if edge_path.contains(&edge.id()) {
            continue;
        }
        if next == start && node_path.len() >= 3 {
            // Direction dedup: accept only one of the two traversal orders.
            if node_path[1].index() < node_path[node_path.len() - 1].index() {
                let mut ring = edge_path.clone();
                ring.push(edge.id());
                record_ring(marks, ring, truncated);
            }
            continue;
        }
        if next.index() <= start.index() || node_path.contains(&next) {
            continue;
        }
        if node_path.len() >= max_size {
            continue;
        }
        node_path.push(next);
        edge_path.push(edge.id());
        walk(graph, start, max_size, node_path, edge_path, marks, truncated);
        node_path.pop();
        edge_path.pop();
    }
}

fn record_ring(marks: &mut RingMarks, ring: Vec<EdgeIndex>, truncated: &mut bool) {
    if marks.rings.len() >= MAX_RINGS {
        *truncated = true;
        return;
    }
    let bit = 1u64 << marks.rings.len();
    for edge in &ring {
        marks.edge_rings[edge.index()] |= bit;
    }
    marks.rings.push(ring);
}
