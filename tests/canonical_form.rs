use indexmap::IndexMap;
use petgraph::algo::isomorphism::is_isomorphic_subgraph_matching;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use fragmine::{canonical_code, contains, embed, GraphInstance, TypedGraph};

/// Random connected simple graph: a spanning tree plus a few extra edges,
/// with small type alphabets on nodes and edges.
fn random_graph(rng: &mut Xoshiro256PlusPlus) -> TypedGraph {
    let node_count = rng.gen_range(4..9);
    let mut graph = TypedGraph::default();
    let nodes: Vec<_> = (0..node_count)
        .map(|_| graph.add_node(rng.gen_range(0..3)))
        .collect();
    for idx in 1..node_count {
        let parent = rng.gen_range(0..idx);
        graph.add_edge(nodes[parent], nodes[idx], rng.gen_range(0..2));
    }
    for _ in 0..rng.gen_range(0..3) {
        let a = rng.gen_range(0..node_count);
        let b = rng.gen_range(0..node_count);
        if a != b && graph.find_edge(nodes[a], nodes[b]).is_none() {
            graph.add_edge(nodes[a], nodes[b], rng.gen_range(0..2));
        }
    }
    graph
}

/// Rebuild `graph` under a node permutation, also shuffling edge insertion
/// order.
fn relabel(graph: &TypedGraph, rng: &mut Xoshiro256PlusPlus) -> TypedGraph {
    let node_count = graph.node_count();
    let mut positions: Vec<usize> = (0..node_count).collect();
    positions.shuffle(rng);

    let mut types = vec![0u32; node_count];
    for (old, new) in positions.iter().enumerate() {
        types[*new] = *graph
            .node_weight(petgraph::prelude::NodeIndex::new(old))
            .unwrap();
    }
    let mut relabeled = TypedGraph::default();
    let nodes: Vec<_> = types.iter().map(|ty| relabeled.add_node(*ty)).collect();

    let mut edges: Vec<(usize, usize, u32)> = graph
        .edge_indices()
        .map(|edge| {
            let (a, b) = graph.edge_endpoints(edge).unwrap();
            (
                positions[a.index()],
                positions[b.index()],
                *graph.edge_weight(edge).unwrap(),
            )
        })
        .collect();
    edges.shuffle(rng);
    for (a, b, ty) in edges {
        relabeled.add_edge(nodes[a], nodes[b], ty);
    }
    relabeled
}

#[test]
fn canonical_code_is_invariant_under_relabeling() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5eed);
    for round in 0..40 {
        let graph = random_graph(&mut rng);
        let reference = canonical_code(&graph).expect("canonical form").code;
        for _ in 0..3 {
            let relabeled = relabel(&graph, &mut rng);
            let code = canonical_code(&relabeled).expect("canonical form").code;
            assert_eq!(
                reference, code,
                "round {round}: relabeling changed the canonical code"
            );
        }
    }
}

#[test]
fn canonical_form_realizes_an_isomorphic_graph() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    for _ in 0..20 {
        let graph = random_graph(&mut rng);
        let form = canonical_code(&graph).expect("canonical form");
        let realized = form.graph();
        assert_eq!(realized.node_count(), graph.node_count());
        assert_eq!(realized.edge_count(), graph.edge_count());
        assert!(is_isomorphic_subgraph_matching(
            &realized,
            &graph,
            |a: &u32, b: &u32| a == b,
            |a: &u32, b: &u32| a == b,
        ));
    }
}

fn instance(graph: TypedGraph) -> GraphInstance {
    GraphInstance::new(graph, IndexMap::new(), IndexMap::new(), IndexMap::new())
}

/// A connected chunk of the host, extracted as a node-induced subgraph.
fn induced_chunk(host: &TypedGraph, size: usize, rng: &mut Xoshiro256PlusPlus) -> TypedGraph {
    let start = petgraph::prelude::NodeIndex::new(rng.gen_range(0..host.node_count()));
    let mut picked = vec![start];
    let mut frontier = vec![start];
    while picked.len() < size {
        let Some(&current) = frontier.last() else {
            break;
        };
        let fresh: Vec<_> = host
            .neighbors(current)
            .filter(|n| !picked.contains(n))
            .collect();
        match fresh.first() {
            Some(next) => {
                picked.push(*next);
                frontier.push(*next);
            }
            None => {
                frontier.pop();
            }
        }
    }

    let mut chunk = TypedGraph::default();
    let mapped: Vec<_> = picked
        .iter()
        .map(|node| chunk.add_node(*host.node_weight(*node).unwrap()))
        .collect();
    for (i, a) in picked.iter().enumerate() {
        for (j, b) in picked.iter().enumerate().skip(i + 1) {
            if let Some(edge) = host.find_edge(*a, *b) {
                chunk.add_edge(mapped[i], mapped[j], *host.edge_weight(edge).unwrap());
            }
        }
    }
    chunk
}

#[test]
fn containment_agrees_with_reference_matcher() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    for round in 0..30 {
        let host_graph = random_graph(&mut rng);
        let chunk = induced_chunk(&host_graph, rng.gen_range(2..5), &mut rng);
        assert!(is_isomorphic_subgraph_matching(
            &chunk,
            &host_graph,
            |a: &u32, b: &u32| a == b,
            |a: &u32, b: &u32| a == b,
        ));

        // Whenever the reference matcher finds an embedding of a random
        // pattern, ours must as well.
        let pattern = random_graph(&mut rng);
        let reference = is_isomorphic_subgraph_matching(
            &pattern,
            &host_graph,
            |a: &u32, b: &u32| a == b,
            |a: &u32, b: &u32| a == b,
        );
        let host = instance(host_graph);
        assert!(contains(&chunk, &host), "round {round}: chunk not found");
        if reference {
            assert!(contains(&pattern, &host), "round {round}: pattern missed");
        }
        assert_eq!(contains(&pattern, &host), embed(&pattern, &host, 0).is_some());
    }
}

#[test]
fn foreign_types_never_embed() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
    let host_graph = random_graph(&mut rng);
    let mut pattern = TypedGraph::default();
    let a = pattern.add_node(5);
    let b = pattern.add_node(5);
    pattern.add_edge(a, b, 0);
    assert!(!is_isomorphic_subgraph_matching(
        &pattern,
        &host_graph,
        |a: &u32, b: &u32| a == b,
        |a: &u32, b: &u32| a == b,
    ));
    let host = instance(host_graph);
    assert!(!contains(&pattern, &host));
}

#[test]
fn induced_chunks_always_embed() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(99);
    for _ in 0..20 {
        let host_graph = random_graph(&mut rng);
        let pattern = induced_chunk(&host_graph, rng.gen_range(2..5), &mut rng);
        let host = instance(host_graph);
        assert!(contains(&pattern, &host));
        let witness = embed(&pattern, &host, 3).expect("witness embedding");
        assert_eq!(witness.nodes.len(), pattern.node_count());
        assert_eq!(witness.edges.len(), pattern.edge_count());
        // The witness maps pattern edges onto type-equal host edges.
        for edge in pattern.edge_indices() {
            let host_edge = witness.edges[edge.index()];
            assert_eq!(
                host.graph.edge_weight(host_edge),
                pattern.edge_weight(edge)
            );
        }
    }
}
