use anyhow::{ensure, Result};
use petgraph::prelude::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::canon::code::{CodeEdge, DfsCode};
use crate::graph::model::TypedGraph;

/// Canonical arrangement of an arbitrary connected typed graph: the minimal
/// DFS code plus the relabeling that produced it (`order[p]` is the graph
/// node placed at position `p`).
#[derive(Debug, Clone)]
pub struct CanonicalForm {
    pub code: DfsCode,
    pub order: Vec<NodeIndex>,
}

impl CanonicalForm {
    /// Realize the canonical arrangement as a concrete graph whose node
    /// indices equal code positions.
    pub fn graph(&self) -> TypedGraph {
        self.code.to_graph()
    }
}

/// Scratch state of one enumeration walk. The context is created per call
/// and discarded on return, so sibling branches can never observe stale
/// marks.
struct TraversalContext<'a> {
    graph: &'a TypedGraph,
    position: Vec<i32>,
    order: Vec<NodeIndex>,
    parent: Vec<i32>,
    placed: Vec<bool>,
    placed_count: usize,
}

struct Candidate {
    tuple: CodeEdge,
    edge: EdgeIndex,
    new_node: Option<NodeIndex>,
}

impl<'a> TraversalContext<'a> {
    fn rooted_at(graph: &'a TypedGraph, root: NodeIndex) -> Self {
        let mut position = vec![-1; graph.node_count()];
        position[root.index()] = 0;
        Self {
            graph,
            position,
            order: vec![root],
            parent: vec![-1],
            placed: vec![false; graph.edge_count()],
            placed_count: 0,
        }
    }

    fn rightmost_path(&self) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = (self.order.len() - 1) as i32;
        while current >= 0 {
            path.push(current as usize);
            current = self.parent[current as usize];
        }
        path
    }

    /// All edges placeable next under the rightmost-path rule: ring-closing
    /// edges from the rightmost leaf to a path node, and node-adding edges
    /// from any path node to an unmapped neighbor.
    fn candidates(&self) -> Vec<Candidate> {
        let rmpath = self.rightmost_path();
        let leaf = self.order.len() - 1;
        let next_position = self.order.len();
        let mut out = Vec::new();

        for &src_position in &rmpath {
            let src_node = self.order[src_position];
            for edge in self.graph.edges(src_node) {
                if self.placed[edge.id().index()] {
                    continue;
                }
                let other = if edge.source() == src_node {
                    edge.target()
                } else {
                    edge.source()
                };
                let mapped = self.position[other.index()];
                if mapped >= 0 {
                    // Ring closure: only from the leaf, only to a path node.
                    let dst_position = mapped as usize;
                    if src_position != leaf || !rmpath.contains(&dst_position) {
                        continue;
                    }
                    if dst_position == leaf {
                        continue;
                    }
                    out.push(Candidate {
                        tuple: CodeEdge {
                            dst: dst_position,
                            src: leaf,
                            edge_type: *edge.weight(),
                            dst_type: *self.graph.node_weight(other).expect("node present"),
                        },
                        edge: edge.id(),
                        new_node: None,
                    });
                } else {
                    out.push(Candidate {
                        tuple: CodeEdge {
                            dst: next_position,
                            src: src_position,
                            edge_type: *edge.weight(),
                            dst_type: *self.graph.node_weight(other).expect("node present"),
                        },
                        edge: edge.id(),
                        new_node: Some(other),
                    });
                }
            }
        }
        out
    }

    fn apply(&mut self, candidate: &Candidate) {
        self.placed[candidate.edge.index()] = true;
        self.placed_count += 1;
        if let Some(node) = candidate.new_node {
            self.position[node.index()] = self.order.len() as i32;
            self.order.push(node);
            self.parent.push(candidate.tuple.src as i32);
        }
    }

    fn unapply(&mut self, candidate: &Candidate) {
        self.placed[candidate.edge.index()] = false;
        self.placed_count -= 1;
        if let Some(node) = candidate.new_node {
            self.position[node.index()] = -1;
            self.order.pop();
            self.parent.pop();
        }
    }
}

/// Verify that `code` is the lexicographically minimal DFS code of `graph`:
/// no alternative choice of root or edge order yields a strictly smaller
/// word. `graph` must be the realized form of `code` (node index ==
/// position).
pub fn is_canonic(graph: &TypedGraph, code: &DfsCode) -> bool {
    check_minimal(graph, code, None)
}

/// Like [`is_canonic`] for a code already known canonical, but records the
/// node orbits: `orbit[v]` is the largest position any tied enumeration
/// (automorphism) assigns to node `v`. Nodes with `orbit[v] > v` have a
/// structurally-equivalent sibling at a higher position and are not
/// extension representatives.
pub fn canonical_orbits(graph: &TypedGraph, code: &DfsCode) -> Vec<usize> {
    let mut orbits: Vec<usize> = (0..graph.node_count()).collect();
    check_minimal(graph, code, Some(&mut orbits));
    orbits
}

fn check_minimal(graph: &TypedGraph, code: &DfsCode, mut orbits: Option<&mut Vec<usize>>) -> bool {
    let Some(min_type) = graph.node_weights().min().copied() else {
        return false;
    };
    if min_type < code.root_type {
        return false;
    }
    for root in graph.node_indices() {
        if *graph.node_weight(root).expect("node present") != code.root_type {
            continue;
        }
        let mut ctx = TraversalContext::rooted_at(graph, root);
        if !verify(&mut ctx, code, 0, &mut orbits) {
            return false;
        }
    }
    true
}

fn verify(
    ctx: &mut TraversalContext<'_>,
    code: &DfsCode,
    depth: usize,
    orbits: &mut Option<&mut Vec<usize>>,
) -> bool {
    if depth == code.edges.len() {
        // A complete enumeration tied with the reference is an automorphism.
        if let Some(orbits) = orbits.as_deref_mut() {
            for (position, node) in ctx.order.iter().enumerate() {
                if orbits[node.index()] < position {
                    orbits[node.index()] = position;
                }
            }
        }
        return true;
    }

    let candidates = ctx.candidates();
    let Some(minimum) = candidates.iter().map(|c| c.tuple).min() else {
        return true;
    };
    let reference = code.edges[depth];
    if minimum < reference {
        return false;
    }
    if minimum > reference {
        return true;
    }
    for candidate in candidates.iter().filter(|c| c.tuple == minimum) {
        ctx.apply(candidate);
        let still_minimal = verify(ctx, code, depth + 1, orbits);
        ctx.unapply(candidate);
        if !still_minimal {
            return false;
        }
    }
    true
}

/// Build the minimal DFS code of an arbitrary connected graph, actively
/// choosing the lexicographically smallest arrangement over every root and
/// edge order. Used when a pattern arrives in non-canonical node order.
pub fn canonical_code(graph: &TypedGraph) -> Result<CanonicalForm> {
    ensure!(graph.node_count() > 0, "cannot canonicalize an empty graph");
    ensure!(
        petgraph::algo::connected_components(graph) == 1,
        "cannot canonicalize a disconnected graph"
    );

    let min_type = graph
        .node_weights()
        .min()
        .copied()
        .expect("non-empty graph");
    let mut best: Option<(Vec<CodeEdge>, Vec<NodeIndex>)> = None;
    let mut acc = Vec::with_capacity(graph.edge_count());
    for root in graph.node_indices() {
        if *graph.node_weight(root).expect("node present") != min_type {
            continue;
        }
        let mut ctx = TraversalContext::rooted_at(graph, root);
        minimize(&mut ctx, &mut acc, &mut best, true);
    }
    let (edges, order) = best.expect("connected graph yields a complete enumeration");
    Ok(CanonicalForm {
        code: DfsCode {
            root_type: min_type,
            edges,
        },
        order,
    })
}

fn minimize(
    ctx: &mut TraversalContext<'_>,
    acc: &mut Vec<CodeEdge>,
    best: &mut Option<(Vec<CodeEdge>, Vec<NodeIndex>)>,
    tied: bool,
) {
    if acc.len() == ctx.graph.edge_count() {
        let better = match best {
            None => true,
            Some((current, _)) => acc.as_slice() < current.as_slice(),
        };
        if better {
            *best = Some((acc.clone(), ctx.order.clone()));
        }
        return;
    }

    let candidates = ctx.candidates();
    let Some(minimum) = candidates.iter().map(|c| c.tuple).min() else {
        return;
    };

    // Prune against the best complete code found so far. The comparison is
    // only meaningful while this branch's prefix still equals the best
    // prefix.
    let mut tied_below = tied;
    if tied {
        if let Some((current, _)) = best {
            match minimum.cmp(&current[acc.len()]) {
                std::cmp::Ordering::Greater => return,
                std::cmp::Ordering::Less => tied_below = false,
                std::cmp::Ordering::Equal => {}
            }
        }
    }

    acc.push(minimum);
    for candidate in candidates.iter().filter(|c| c.tuple == minimum) {
        ctx.apply(candidate);
        minimize(ctx, acc, best, tied_below);
        ctx.unapply(candidate);
    }
    acc.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::TypeId;

    fn tuple(dst: usize, src: usize, edge_type: TypeId, dst_type: TypeId) -> CodeEdge {
        CodeEdge {
            dst,
            src,
            edge_type,
            dst_type,
        }
    }

    fn triangle(types: [TypeId; 3]) -> TypedGraph {
        let mut graph = TypedGraph::default();
        let a = graph.add_node(types[0]);
        let b = graph.add_node(types[1]);
        let c = graph.add_node(types[2]);
        graph.add_edge(a, b, 0);
        graph.add_edge(b, c, 0);
        graph.add_edge(c, a, 0);
        graph
    }

    #[test]
    fn uniform_triangle_code_is_canonical() {
        let graph = triangle([0, 0, 0]);
        let form = canonical_code(&graph).expect("canonical form");
        assert_eq!(
            form.code.edges,
            vec![tuple(1, 0, 0, 0), tuple(2, 1, 0, 0), tuple(0, 2, 0, 0)]
        );
        assert!(is_canonic(&form.graph(), &form.code));
    }

    #[test]
    fn non_minimal_code_is_rejected() {
        // Path 0-1-2 coded with the branch taken from the root last is not
        // minimal when node types make the other order smaller.
        let mut graph = TypedGraph::default();
        let a = graph.add_node(0);
        let b = graph.add_node(2);
        let c = graph.add_node(1);
        graph.add_edge(a, b, 0);
        graph.add_edge(a, c, 0);
        let code = DfsCode {
            root_type: 0,
            edges: vec![tuple(1, 0, 0, 2), tuple(2, 0, 0, 1)],
        };
        assert!(!is_canonic(&graph, &code));

        let form = canonical_code(&graph).expect("canonical form");
        assert_eq!(
            form.code.edges,
            vec![tuple(1, 0, 0, 1), tuple(2, 0, 0, 2)]
        );
    }

    #[test]
    fn canonical_code_invariant_under_relabeling() {
        let reference = canonical_code(&triangle([1, 0, 1])).expect("form");
        let relabeled = canonical_code(&triangle([0, 1, 1])).expect("form");
        let again = canonical_code(&triangle([1, 1, 0])).expect("form");
        assert_eq!(reference.code, relabeled.code);
        assert_eq!(reference.code, again.code);
        assert_eq!(reference.code.root_type, 0);
    }

    #[test]
    fn orbits_mark_symmetric_siblings() {
        // Star: center 0 with two identical leaves. The leaves swap under
        // an automorphism, so the earlier leaf is not a representative.
        let mut graph = TypedGraph::default();
        let center = graph.add_node(0);
        let left = graph.add_node(1);
        let right = graph.add_node(1);
        graph.add_edge(center, left, 0);
        graph.add_edge(center, right, 0);
        let form = canonical_code(&graph).expect("form");
        let realized = form.graph();
        let orbits = canonical_orbits(&realized, &form.code);
        assert_eq!(orbits[0], 0);
        assert_eq!(orbits[1], 2, "leaf at position 1 also appears at position 2");
        assert_eq!(orbits[2], 2);
    }

    #[test]
    fn single_node_graph_has_empty_code() {
        let mut graph = TypedGraph::default();
        graph.add_node(3);
        let form = canonical_code(&graph).expect("form");
        assert_eq!(form.code.root_type, 3);
        assert!(form.code.edges.is_empty());
        assert_eq!(form.order.len(), 1);
    }

    #[test]
    fn disconnected_graph_is_refused() {
        let mut graph = TypedGraph::default();
        graph.add_node(0);
        graph.add_node(0);
        assert!(canonical_code(&graph).is_err());
    }
}
