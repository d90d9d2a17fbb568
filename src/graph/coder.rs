use indexmap::IndexMap;
use log::debug;

use crate::graph::model::{GraphInstance, TypeId};

/// Re-maps raw type codes into frequency rank order (rank 0 = most frequent
/// across the database) so that canonical code words compare uniformly no
/// matter how the source documents numbered their types. `decode` restores
/// the raw codes applied during a previous search.
#[derive(Debug, Clone, Default)]
pub struct TypeCoder {
    node_rank: IndexMap<TypeId, TypeId>,
    node_raw: Vec<TypeId>,
    edge_rank: IndexMap<TypeId, TypeId>,
    edge_raw: Vec<TypeId>,
}

impl TypeCoder {
    /// Count node/edge type frequencies over the whole database and assign
    /// ranks in descending frequency, raw code ascending on ties.
    pub fn from_database(graphs: &[GraphInstance]) -> Self {
        let mut node_counts: IndexMap<TypeId, usize> = IndexMap::new();
        let mut edge_counts: IndexMap<TypeId, usize> = IndexMap::new();
        for instance in graphs {
            for weight in instance.graph.node_weights() {
                *node_counts.entry(*weight).or_insert(0) += 1;
            }
            for weight in instance.graph.edge_weights() {
                *edge_counts.entry(*weight).or_insert(0) += 1;
            }
        }

        let (node_rank, node_raw) = rank_by_frequency(node_counts);
        let (edge_rank, edge_raw) = rank_by_frequency(edge_counts);
        debug!(
            "type coder ranked {} node types, {} edge types",
            node_raw.len(),
            edge_raw.len()
        );
        Self {
            node_rank,
            node_raw,
            edge_rank,
            edge_raw,
        }
    }

    pub fn encode_node(&self, raw: TypeId) -> TypeId {
        self.node_rank.get(&raw).copied().unwrap_or(raw)
    }

    pub fn encode_edge(&self, raw: TypeId) -> TypeId {
        self.edge_rank.get(&raw).copied().unwrap_or(raw)
    }

    pub fn decode_node(&self, rank: TypeId) -> TypeId {
        self.node_raw.get(rank as usize).copied().unwrap_or(rank)
    }

    pub fn decode_edge(&self, rank: TypeId) -> TypeId {
        self.edge_raw.get(rank as usize).copied().unwrap_or(rank)
    }

    /// Copy of `instance` with all type codes replaced by their ranks. The
    /// structure (node/edge indices) is unchanged, so embeddings computed on
    /// the encoded copy index directly into the original.
    pub fn encode_graph(&self, instance: &GraphInstance) -> GraphInstance {
        let mut encoded = instance.clone();
        for weight in encoded.graph.node_weights_mut() {
            *weight = self.encode_node(*weight);
        }
        for weight in encoded.graph.edge_weights_mut() {
            *weight = self.encode_edge(*weight);
        }
        encoded
    }

    /// Restore raw type codes on a rank-encoded graph, in place.
    pub fn decode_graph(&self, instance: &mut GraphInstance) {
        for weight in instance.graph.node_weights_mut() {
            *weight = self.decode_node(*weight);
        }
        for weight in instance.graph.edge_weights_mut() {
            *weight = self.decode_edge(*weight);
        }
    }
}

fn rank_by_frequency(counts: IndexMap<TypeId, usize>) -> (IndexMap<TypeId, TypeId>, Vec<TypeId>) {
    let mut ordered: Vec<(TypeId, usize)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let raw: Vec<TypeId> = ordered.iter().map(|(ty, _)| *ty).collect();
    let rank = raw
        .iter()
        .enumerate()
        .map(|(idx, ty)| (*ty, idx as TypeId))
        .collect();
    (rank, raw)
}

/// Uniform bit-masks over node and edge type codes. The chemical preset
/// keeps the element bits of a node code and the bond bits of an edge code,
/// discarding charge and aromaticity flags carried in the high bits, so
/// chemically-typed graphs compare against generically-typed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMask {
    pub node_mask: TypeId,
    pub edge_mask: TypeId,
}

impl TypeMask {
    pub fn generic() -> Self {
        Self {
            node_mask: !0,
            edge_mask: !0,
        }
    }

    pub fn chemical() -> Self {
        Self {
            node_mask: 0x7f,
            edge_mask: 0x0f,
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::graph::model::TypedGraph;

    fn instance_with_types(node_types: &[TypeId], edge_types: &[(usize, usize, TypeId)]) -> GraphInstance {
        let mut graph = TypedGraph::default();
        let nodes: Vec<_> = node_types.iter().map(|ty| graph.add_node(*ty)).collect();
        for (a, b, ty) in edge_types {
            graph.add_edge(nodes[*a], nodes[*b], *ty);
        }
        GraphInstance::new(graph, IndexMap::new(), IndexMap::new(), IndexMap::new())
    }

    #[test]
    fn most_frequent_type_gets_rank_zero() {
        let db = vec![instance_with_types(
            &[7, 7, 7, 3, 3, 9],
            &[(0, 1, 5), (1, 2, 5), (2, 3, 1)],
        )];
        let coder = TypeCoder::from_database(&db);
        assert_eq!(coder.encode_node(7), 0);
        assert_eq!(coder.encode_node(3), 1);
        assert_eq!(coder.encode_node(9), 2);
        assert_eq!(coder.encode_edge(5), 0);
        assert_eq!(coder.encode_edge(1), 1);
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let db = vec![instance_with_types(&[4, 4, 2], &[(0, 1, 8), (1, 2, 8)])];
        let coder = TypeCoder::from_database(&db);
        let mut encoded = coder.encode_graph(&db[0]);
        assert_ne!(
            encoded.graph.node_weights().copied().collect::<Vec<_>>(),
            db[0].graph.node_weights().copied().collect::<Vec<_>>()
        );
        coder.decode_graph(&mut encoded);
        assert_eq!(
            encoded.graph.node_weights().copied().collect::<Vec<_>>(),
            db[0].graph.node_weights().copied().collect::<Vec<_>>()
        );
    }

    #[test]
    fn chemical_mask_strips_high_bits() {
        let mut instance = instance_with_types(&[0x183], &[]);
        instance.mask_types(&TypeMask::chemical());
        assert_eq!(*instance.graph.node_weight(petgraph::prelude::NodeIndex::new(0)).unwrap(), 0x03);
    }
}
