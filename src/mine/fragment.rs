use once_cell::sync::OnceCell;
use petgraph::prelude::{EdgeIndex, NodeIndex};

use crate::canon::code::DfsCode;
use crate::graph::model::TypedGraph;

/// One occurrence of a pattern inside one host graph: parallel arrays from
/// pattern node position to host node and from code position to host edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embedding {
    pub host: usize,
    pub nodes: Vec<NodeIndex>,
    pub edges: Vec<EdgeIndex>,
}

/// A candidate pattern of the search: its DFS code (the parent is the code
/// prefix), the lazily realized pattern graph, and every embedding found
/// across the database.
///
/// Embeddings are grouped by ascending host id, so all occurrences inside
/// one host are contiguous and the support falls out of the grouping.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub code: DfsCode,
    graph: OnceCell<TypedGraph>,
    pub embeddings: Vec<Embedding>,
    pub support: usize,
    pub ring_closures: usize,
}

impl Fragment {
    pub fn new(code: DfsCode, embeddings: Vec<Embedding>, ring_closures: usize) -> Self {
        let support = support_of(&embeddings);
        Self {
            code,
            graph: OnceCell::new(),
            embeddings,
            support,
            ring_closures,
        }
    }

    /// The realized pattern graph; node indices equal code positions and
    /// edge indices equal code order. Built on first use.
    pub fn graph(&self) -> &TypedGraph {
        self.graph.get_or_init(|| self.code.to_graph())
    }

    pub fn node_count(&self) -> usize {
        self.code.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.code.edge_count()
    }

    /// All occurrences inside one host graph, without rescanning.
    pub fn embeddings_in(&self, host: usize) -> impl Iterator<Item = &Embedding> {
        self.embeddings.iter().filter(move |e| e.host == host)
    }
}

/// Number of distinct hosts, relying on the host grouping of the list.
pub fn support_of(embeddings: &[Embedding]) -> usize {
    let mut support = 0;
    let mut last = usize::MAX;
    for embedding in embeddings {
        if embedding.host != last {
            support += 1;
            last = embedding.host;
        }
    }
    support
}

/// A mined pattern handed back to the caller: the canonical code, the
/// realized graph, the support count, and the embedding witnesses.
///
/// Type codes are rank codes of the mining session; use the session's
/// `TypeCoder` to translate back to raw codes for display or matching
/// against graphs outside the database.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub code: DfsCode,
    pub graph: TypedGraph,
    pub support: usize,
    pub size: usize,
    pub embeddings: Vec<Embedding>,
    pub ring_closures: usize,
}

impl Pattern {
    pub fn from_fragment(fragment: &Fragment) -> Self {
        Self {
            code: fragment.code.clone(),
            graph: fragment.graph().clone(),
            support: fragment.support,
            size: fragment.node_count(),
            embeddings: fragment.embeddings.clone(),
            ring_closures: fragment.ring_closures,
        }
    }

    /// The pattern graph with raw type codes restored.
    pub fn decoded_graph(&self, coder: &crate::graph::coder::TypeCoder) -> TypedGraph {
        let mut graph = self.graph.clone();
        for weight in graph.node_weights_mut() {
            *weight = coder.decode_node(*weight);
        }
        for weight in graph.edge_weights_mut() {
            *weight = coder.decode_edge(*weight);
        }
        graph
    }
}
