use std::collections::BTreeMap;

use petgraph::visit::EdgeRef;

use crate::canon::code::CodeEdge;
use crate::graph::model::GraphInstance;
use crate::mine::fragment::{Embedding, Fragment};

/// Enumerate every rightmost-path extension of `fragment` over its
/// embedding list, grouped by extension tuple in canonical ascending order.
///
/// Two embeddings producing the same tuple belong to the same child
/// fragment; the map groups them so the caller materializes each child
/// exactly once and appends embeddings instead of double-counting.
///
/// `orbits` comes from the canonical check of `fragment`: node-adding
/// extensions are only taken from path positions that are their own orbit
/// representative along the path, since a structurally-equivalent sibling
/// higher on the path produces the same child under a smaller code.
/// `max_size` stops node-adding growth; ring closures stay legal at the
/// size boundary because they add no node.
pub fn enumerate_extensions(
    fragment: &Fragment,
    db: &[GraphInstance],
    orbits: &[usize],
    max_size: usize,
) -> BTreeMap<CodeEdge, Vec<Embedding>> {
    // The rightmost path is a property of the code, identical for every
    // embedding; compute it once per fragment.
    let rmpath = fragment.code.rightmost_path();
    let leaf = fragment.node_count() - 1;
    let allow_forward = fragment.node_count() < max_size;
    let next_position = fragment.node_count();

    let mut extensions: BTreeMap<CodeEdge, Vec<Embedding>> = BTreeMap::new();

    for embedding in &fragment.embeddings {
        let host = &db[embedding.host];
        // Outermost first: the rightmost leaf, then back toward the root.
        for &src_position in rmpath.iter().rev() {
            let host_node = embedding.nodes[src_position];
            for host_edge in host.graph.edges(host_node) {
                if embedding.edges.contains(&host_edge.id()) {
                    continue;
                }
                let other = if host_edge.source() == host_node {
                    host_edge.target()
                } else {
                    host_edge.source()
                };
                let mapped = embedding.nodes.iter().position(|node| *node == other);

                if let Some(dst_position) = mapped {
                    // Ring-closing edge: it must run from the rightmost
                    // leaf to a node on the path.
                    if src_position != leaf
                        || dst_position == leaf
                        || !rmpath.contains(&dst_position)
                    {
                        continue;
                    }
                    if fragment.code.has_edge_between(leaf, dst_position) {
                        continue;
                    }
                    if !closing_edge_admissible(
                        fragment,
                        &rmpath,
                        dst_position,
                        *host_edge.weight(),
                        leaf,
                    ) {
                        continue;
                    }
                    let tuple = CodeEdge {
                        dst: dst_position,
                        src: leaf,
                        edge_type: *host_edge.weight(),
                        dst_type: fragment.code.node_type(dst_position),
                    };
                    let mut edges = embedding.edges.clone();
                    edges.push(host_edge.id());
                    extensions.entry(tuple).or_default().push(Embedding {
                        host: embedding.host,
                        nodes: embedding.nodes.clone(),
                        edges,
                    });
                } else {
                    if !allow_forward {
                        continue;
                    }
                    // Orbit pruning: a structurally-equivalent sibling at a
                    // higher path position yields the same child with a
                    // strictly smaller code (deeper sources order first).
                    let twin = orbits[src_position];
                    if twin > src_position && rmpath.contains(&twin) {
                        continue;
                    }
                    let dst_type = host.node_type(other);
                    if !growing_edge_admissible(
                        fragment,
                        &rmpath,
                        src_position,
                        leaf,
                        *host_edge.weight(),
                        dst_type,
                    ) {
                        continue;
                    }
                    let tuple = CodeEdge {
                        dst: next_position,
                        src: src_position,
                        edge_type: *host_edge.weight(),
                        dst_type,
                    };
                    let mut nodes = embedding.nodes.clone();
                    nodes.push(other);
                    let mut edges = embedding.edges.clone();
                    edges.push(host_edge.id());
                    extensions.entry(tuple).or_default().push(Embedding {
                        host: embedding.host,
                        nodes,
                        edges,
                    });
                }
            }
        }
    }

    extensions
}

/// A ring-closing edge to `dst_position` may not order before the forward
/// edge leaving that position along the rightmost path; a closing edge that
/// does would produce a code word smaller than the path already written,
/// so the extended pattern could never be canonical.
fn closing_edge_admissible(
    fragment: &Fragment,
    rmpath: &[usize],
    dst_position: usize,
    edge_type: u32,
    leaf: usize,
) -> bool {
    let path_index = rmpath
        .iter()
        .position(|p| *p == dst_position)
        .expect("destination lies on the path");
    let next_on_path = rmpath[path_index + 1];
    let Some(forward) = fragment.code.forward_edge_from(dst_position, next_on_path) else {
        return true;
    };
    (edge_type, fragment.code.node_type(leaf)) >= (forward.edge_type, forward.dst_type)
}

/// A node-adding edge from a non-leaf path node may not order before that
/// node's own forward edge along the path.
fn growing_edge_admissible(
    fragment: &Fragment,
    rmpath: &[usize],
    src_position: usize,
    leaf: usize,
    edge_type: u32,
    dst_type: u32,
) -> bool {
    if src_position == leaf {
        return true;
    }
    let path_index = rmpath
        .iter()
        .position(|p| *p == src_position)
        .expect("source lies on the path");
    let next_on_path = rmpath[path_index + 1];
    let Some(forward) = fragment.code.forward_edge_from(src_position, next_on_path) else {
        return true;
    };
    (edge_type, dst_type) >= (forward.edge_type, forward.dst_type)
}
