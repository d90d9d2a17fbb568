use log::trace;
use petgraph::prelude::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::graph::model::{GraphInstance, TypedGraph};
use crate::mine::fragment::Embedding;

/// Does at least one embedding of `pattern` exist in `host`? Non-induced
/// semantics: every pattern edge must map to a distinct host edge of equal
/// type; extra host edges are allowed.
pub fn contains(pattern: &TypedGraph, host: &GraphInstance) -> bool {
    let mut found = false;
    search(pattern, host, &mut |_, _| {
        found = true;
        false
    });
    found
}

/// One witness embedding of `pattern` in `host`, or `None`. `host_id` is
/// the caller's index for the host graph, recorded on the embedding.
pub fn embed(pattern: &TypedGraph, host: &GraphInstance, host_id: usize) -> Option<Embedding> {
    let mut witness = None;
    search(pattern, host, &mut |nodes, edges| {
        witness = Some(Embedding {
            host: host_id,
            nodes: nodes.to_vec(),
            edges: edges.to_vec(),
        });
        false
    });
    witness
}

/// Number of distinct embeddings (mappings) of `pattern` in `host`; feeds
/// term-frequency-style feature weights such as `1 + ln(count)`.
pub fn embedding_count(pattern: &TypedGraph, host: &GraphInstance) -> usize {
    let mut count = 0;
    search(pattern, host, &mut |_, _| {
        count += 1;
        true
    });
    count
}

/// Backtracking subgraph matcher. Pattern nodes are visited in a connected
/// order; `on_match` receives the node and edge maps of each complete
/// embedding and returns whether to keep searching.
fn search(
    pattern: &TypedGraph,
    host: &GraphInstance,
    on_match: &mut dyn FnMut(&[NodeIndex], &[EdgeIndex]) -> bool,
) {
    if pattern.node_count() == 0 || pattern.node_count() > host.node_count() {
        return;
    }
    if pattern.edge_count() > host.edge_count() {
        return;
    }
    let order = connected_order(pattern);
    if order.len() < pattern.node_count() {
        trace!("pattern is disconnected; no embeddings");
        return;
    }

    let mut state = MatchState {
        pattern,
        host,
        order,
        node_map: vec![NodeIndex::end(); pattern.node_count()],
        edge_map: vec![EdgeIndex::end(); pattern.edge_count()],
        host_nodes_used: vec![false; host.node_count()],
        host_edges_used: vec![false; host.edge_count()],
    };
    assign(&mut state, 0, on_match);
}

struct MatchState<'a> {
    pattern: &'a TypedGraph,
    host: &'a GraphInstance,
    order: Vec<NodeIndex>,
    node_map: Vec<NodeIndex>,
    edge_map: Vec<EdgeIndex>,
    host_nodes_used: Vec<bool>,
    host_edges_used: Vec<bool>,
}

/// BFS order from node 0; every node after the first is adjacent to an
/// earlier one.
fn connected_order(pattern: &TypedGraph) -> Vec<NodeIndex> {
    let mut order = Vec::with_capacity(pattern.node_count());
    let mut seen = vec![false; pattern.node_count()];
    let start = NodeIndex::new(0);
    seen[start.index()] = true;
    order.push(start);
    let mut cursor = 0;
    while cursor < order.len() {
        let current = order[cursor];
        cursor += 1;
        for neighbor in pattern.neighbors(current) {
            if !seen[neighbor.index()] {
                seen[neighbor.index()] = true;
                order.push(neighbor);
            }
        }
    }
    order
}

fn assign(
    state: &mut MatchState<'_>,
    depth: usize,
    on_match: &mut dyn FnMut(&[NodeIndex], &[EdgeIndex]) -> bool,
) -> bool {
    if depth == state.order.len() {
        return on_match(&state.node_map, &state.edge_map);
    }
    let pattern_node = state.order[depth];
    let pattern_type = *state
        .pattern
        .node_weight(pattern_node)
        .expect("pattern node present");
    let pattern_degree = state.pattern.edges(pattern_node).count();

    let mut candidates: Vec<NodeIndex> = if depth == 0 {
        state.host.graph.node_indices().collect()
    } else {
        // Anchor on some already-mapped pattern neighbor and only try the
        // host neighbors of its image.
        let anchor = state
            .pattern
            .neighbors(pattern_node)
            .find(|n| state.node_map[n.index()] != NodeIndex::end())
            .expect("connected order guarantees a mapped neighbor");
        state
            .host
            .graph
            .neighbors(state.node_map[anchor.index()])
            .collect()
    };
    // Parallel host edges repeat their endpoint in the neighbor walk.
    candidates.sort_unstable();
    candidates.dedup();

    for host_node in candidates {
        if state.host_nodes_used[host_node.index()] {
            continue;
        }
        if state.host.node_type(host_node) != pattern_type {
            continue;
        }
        if state.host.graph.edges(host_node).count() < pattern_degree {
            continue;
        }

        state.node_map[pattern_node.index()] = host_node;
        state.host_nodes_used[host_node.index()] = true;

        let placed = place_edges(state, pattern_node, host_node);
        let keep_going = match placed {
            Some(edges) => {
                let more = assign(state, depth + 1, on_match);
                for (pattern_edge, host_edge) in &edges {
                    state.edge_map[pattern_edge.index()] = EdgeIndex::end();
                    state.host_edges_used[host_edge.index()] = false;
                }
                more
            }
            None => true,
        };

        state.node_map[pattern_node.index()] = NodeIndex::end();
        state.host_nodes_used[host_node.index()] = false;
        if !keep_going {
            return false;
        }
    }
    true
}

/// Map every pattern edge from `pattern_node` to an already-mapped node
/// onto a distinct unused host edge of equal type. Parallel edges between
/// one node pair are interchangeable, so a per-pair greedy assignment is
/// exhaustive.
fn place_edges(
    state: &mut MatchState<'_>,
    pattern_node: NodeIndex,
    host_node: NodeIndex,
) -> Option<Vec<(EdgeIndex, EdgeIndex)>> {
    let mut placed: Vec<(EdgeIndex, EdgeIndex)> = Vec::new();
    let pending: Vec<(EdgeIndex, NodeIndex, u32)> = state
        .pattern
        .edges(pattern_node)
        .filter_map(|edge| {
            let other = if edge.source() == pattern_node {
                edge.target()
            } else {
                edge.source()
            };
            let image = state.node_map[other.index()];
            if image == NodeIndex::end() {
                return None;
            }
            Some((edge.id(), image, *edge.weight()))
        })
        .collect();

    for (pattern_edge, host_other, edge_type) in pending {
        if state.edge_map[pattern_edge.index()] != EdgeIndex::end() {
            continue;
        }
        let slot = state
            .host
            .graph
            .edges(host_node)
            .find(|host_edge| {
                if state.host_edges_used[host_edge.id().index()] {
                    return false;
                }
                if *host_edge.weight() != edge_type {
                    return false;
                }
                let endpoint = if host_edge.source() == host_node {
                    host_edge.target()
                } else {
                    host_edge.source()
                };
                endpoint == host_other
            })
            .map(|host_edge| host_edge.id());

        match slot {
            Some(host_edge) => {
                state.edge_map[pattern_edge.index()] = host_edge;
                state.host_edges_used[host_edge.index()] = true;
                placed.push((pattern_edge, host_edge));
            }
            None => {
                for (pattern_edge, host_edge) in &placed {
                    state.edge_map[pattern_edge.index()] = EdgeIndex::end();
                    state.host_edges_used[host_edge.index()] = false;
                }
                return None;
            }
        }
    }
    Some(placed)
}
