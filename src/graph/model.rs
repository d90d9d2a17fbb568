use indexmap::{IndexMap, IndexSet};
use once_cell::sync::OnceCell;
use petgraph::prelude::{EdgeIndex, NodeIndex};
use petgraph::{Graph, Undirected};
use serde::{Deserialize, Serialize};

use crate::graph::rings::{detect_rings, RingMarks};

pub type GraphId = String;

/// Dense type code drawn from a [`TypeDictionary`].
pub type TypeId = u32;

/// Arena of typed nodes and edges; indices are stable because graphs are
/// append-only once loaded.
pub type TypedGraph = Graph<TypeId, TypeId, Undirected>;

pub const DEFAULT_RING_BOUND: usize = 8;

/// Interns node and edge type names into dense codes shared across a whole
/// database, so that two graphs using the same label always carry the same
/// type code.
#[derive(Debug, Clone, Default)]
pub struct TypeDictionary {
    node_names: IndexSet<String>,
    edge_names: IndexSet<String>,
}

impl TypeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_node(&mut self, name: &str) -> TypeId {
        let (idx, _) = self.node_names.insert_full(name.to_string());
        idx as TypeId
    }

    pub fn intern_edge(&mut self, name: &str) -> TypeId {
        let (idx, _) = self.edge_names.insert_full(name.to_string());
        idx as TypeId
    }

    pub fn node_name(&self, code: TypeId) -> Option<&str> {
        self.node_names.get_index(code as usize).map(String::as_str)
    }

    pub fn edge_name(&self, code: TypeId) -> Option<&str> {
        self.edge_names.get_index(code as usize).map(String::as_str)
    }

    pub fn node_type_count(&self) -> usize {
        self.node_names.len()
    }

    pub fn edge_type_count(&self) -> usize {
        self.edge_names.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGraph {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
    #[serde(default)]
    pub graph_attributes: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub directed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    pub id: GraphId,
    #[serde(default)]
    pub attributes: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEdge {
    pub source: GraphId,
    pub target: GraphId,
    #[serde(default)]
    pub attributes: IndexMap<String, serde_json::Value>,
}

/// One graph of the database: the typed arena plus the id lookups needed to
/// relate it back to its source document. Ring marks are derived state,
/// computed on demand by [`GraphInstance::prepare_embed`].
#[derive(Debug, Clone)]
pub struct GraphInstance {
    pub graph: TypedGraph,
    pub node_lookup: IndexMap<GraphId, NodeIndex>,
    pub reverse_lookup: IndexMap<NodeIndex, GraphId>,
    pub graph_attributes: IndexMap<String, serde_json::Value>,
    rings: OnceCell<RingMarks>,
}

impl GraphInstance {
    pub fn new(
        graph: TypedGraph,
        node_lookup: IndexMap<GraphId, NodeIndex>,
        reverse_lookup: IndexMap<NodeIndex, GraphId>,
        graph_attributes: IndexMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            graph,
            node_lookup,
            reverse_lookup,
            graph_attributes,
            rings: OnceCell::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_type(&self, node: NodeIndex) -> TypeId {
        *self.graph.node_weight(node).expect("node present")
    }

    pub fn edge_type(&self, edge: EdgeIndex) -> TypeId {
        *self.graph.edge_weight(edge).expect("edge present")
    }

    pub fn is_connected(&self) -> bool {
        if self.graph.node_count() == 0 {
            return false;
        }
        petgraph::algo::connected_components(&self.graph) == 1
    }

    /// Class label attached by the dataset, if any.
    pub fn class_label(&self) -> Option<String> {
        self.graph_attributes
            .get("class")
            .and_then(|value| match value {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
    }

    /// Instance weight attached by the dataset, defaulting to 1.0.
    pub fn weight(&self) -> f64 {
        self.graph_attributes
            .get("weight")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(1.0)
    }

    /// Precompute ring membership for every edge. The ring-aware extension
    /// strategy reads these marks; ring membership is purely structural, so
    /// the marks survive type re-coding and masking.
    pub fn prepare_embed(&self, ring_bound: usize) -> &RingMarks {
        self.rings
            .get_or_init(|| detect_rings(&self.graph, ring_bound))
    }

    pub fn ring_marks(&self) -> Option<&RingMarks> {
        self.rings.get()
    }

    /// Apply uniform node/edge type bit-masks, coarsening type detail so
    /// graphs from differently-typed sources compare under one scheme.
    pub fn mask_types(&mut self, mask: &super::coder::TypeMask) {
        for weight in self.graph.node_weights_mut() {
            *weight &= mask.node_mask;
        }
        for weight in self.graph.edge_weights_mut() {
            *weight &= mask.edge_mask;
        }
    }

    /// Containment test: does at least one embedding of `pattern` exist in
    /// this graph? This is the operation feature extraction is built on.
    pub fn contains(&self, pattern: &TypedGraph) -> bool {
        crate::matching::contains(pattern, self)
    }
}
