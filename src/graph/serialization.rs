use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use indexmap::IndexMap;
use petgraph::visit::EdgeRef;
use serde_json::Value;

use crate::graph::model::{GraphInstance, RawEdge, RawGraph, RawNode, TypeDictionary};

/// Exports graphs back to JSON files compatible with the loader format.
pub struct GraphWriter;

impl GraphWriter {
    pub fn to_raw_graph(graph: &GraphInstance, dictionary: &TypeDictionary) -> RawGraph {
        let mut nodes = Vec::new();
        for (id, idx) in &graph.node_lookup {
            let mut attributes = IndexMap::new();
            let code = graph.node_type(*idx);
            if let Some(name) = dictionary.node_name(code) {
                attributes.insert("label".to_string(), Value::String(name.to_string()));
            } else {
                attributes.insert("label".to_string(), Value::from(code));
            }
            nodes.push(RawNode {
                id: id.clone(),
                attributes,
            });
        }

        let mut edges = Vec::new();
        for edge_ref in graph.graph.edge_references() {
            let source = graph
                .reverse_lookup
                .get(&edge_ref.source())
                .cloned()
                .expect("source id");
            let target = graph
                .reverse_lookup
                .get(&edge_ref.target())
                .cloned()
                .expect("target id");
            let mut attributes = IndexMap::new();
            if let Some(name) = dictionary.edge_name(*edge_ref.weight()) {
                attributes.insert("label".to_string(), Value::String(name.to_string()));
            } else {
                attributes.insert("label".to_string(), Value::from(*edge_ref.weight()));
            }
            edges.push(RawEdge {
                source,
                target,
                attributes,
            });
        }

        RawGraph {
            nodes,
            edges,
            graph_attributes: graph.graph_attributes.clone(),
            directed: false,
        }
    }

    pub fn to_json_string(graph: &GraphInstance, dictionary: &TypeDictionary) -> Result<String> {
        let raw = Self::to_raw_graph(graph, dictionary);
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    pub fn write_to_path(
        graph: &GraphInstance,
        dictionary: &TypeDictionary,
        path: &Path,
    ) -> Result<()> {
        let json = Self::to_json_string(graph, dictionary)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Compact one-line rendering of a typed graph for logs: node types in index
/// order, then edges as `src-ty-dst`.
pub fn describe(graph: &crate::graph::model::TypedGraph) -> String {
    let mut out = String::new();
    let _ = write!(out, "|V|={} |E|={} [", graph.node_count(), graph.edge_count());
    for (idx, weight) in graph.node_weights().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}:{}", idx, weight);
    }
    out.push_str("] [");
    for (idx, edge_ref) in graph.edge_references().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        let _ = write!(
            out,
            "{}-{}-{}",
            edge_ref.source().index(),
            edge_ref.weight(),
            edge_ref.target().index()
        );
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::construction::GraphLoader;

    #[test]
    fn writer_round_trips_through_loader() {
        let json = r#"{
            "nodes": [
                {"id": "a", "attributes": {"label": "C"}},
                {"id": "b", "attributes": {"label": "O"}}
            ],
            "edges": [{"source": "a", "target": "b", "attributes": {"label": "="}}],
            "graph_attributes": {"class": "active"}
        }"#;
        let mut loader = GraphLoader::new();
        let graph = loader.from_json_str(json).expect("load");
        let rendered =
            GraphWriter::to_json_string(&graph, loader.dictionary()).expect("render");

        let mut second = GraphLoader::new();
        let reloaded = second.from_json_str(&rendered).expect("reload");
        assert_eq!(reloaded.node_count(), 2);
        assert_eq!(reloaded.edge_count(), 1);
        assert_eq!(reloaded.class_label().as_deref(), Some("active"));
    }

    #[test]
    fn describe_renders_nodes_and_edges() {
        let mut graph = crate::graph::model::TypedGraph::default();
        let a = graph.add_node(0);
        let b = graph.add_node(1);
        graph.add_edge(a, b, 2);
        let text = describe(&graph);
        assert!(text.contains("|V|=2"));
        assert!(text.contains("0-2-1"));
    }
}
