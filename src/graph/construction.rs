use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexMap;
use log::info;
use rayon::prelude::*;

use crate::graph::model::{GraphInstance, RawGraph, TypeDictionary, TypedGraph};

const NODE_TYPE_KEY: &str = "label";
const EDGE_TYPE_KEY: &str = "label";
const UNTYPED_NODE: &str = "*";
const UNTYPED_EDGE: &str = "-";

/// Turns JSON graph documents into typed in-memory graphs, interning type
/// names into a dictionary shared by every graph it loads.
#[derive(Debug, Default)]
pub struct GraphLoader {
    dictionary: TypeDictionary,
}

impl GraphLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dictionary(&self) -> &TypeDictionary {
        &self.dictionary
    }

    pub fn into_dictionary(self) -> TypeDictionary {
        self.dictionary
    }

    /// Parse a JSON string into a graph instance.
    pub fn from_json_str(&mut self, json: &str) -> Result<GraphInstance> {
        let raw: RawGraph = serde_json::from_str(json)?;
        self.from_raw_graph(raw)
    }

    /// Read JSON graph data from a reader.
    pub fn from_reader<R: Read>(&mut self, mut reader: R) -> Result<GraphInstance> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        self.from_json_str(&buf)
    }

    pub fn from_path(&mut self, path: &Path) -> Result<GraphInstance> {
        let json =
            fs::read_to_string(path).with_context(|| format!("open graph file {:?}", path))?;
        self.from_json_str(&json)
            .with_context(|| format!("parse graph file {:?}", path))
    }

    pub fn from_raw_graph(&mut self, raw: RawGraph) -> Result<GraphInstance> {
        if raw.directed {
            bail!("directed graphs are not supported by the miner");
        }
        let mut graph = TypedGraph::with_capacity(raw.nodes.len(), raw.edges.len());
        let mut node_lookup = IndexMap::new();
        let mut reverse_lookup = IndexMap::new();

        for raw_node in raw.nodes {
            let name = attribute_string(&raw_node.attributes, NODE_TYPE_KEY)
                .unwrap_or_else(|| UNTYPED_NODE.to_string());
            let type_code = self.dictionary.intern_node(&name);
            let idx = graph.add_node(type_code);
            if node_lookup.insert(raw_node.id.clone(), idx).is_some() {
                bail!("duplicate node id: {}", raw_node.id);
            }
            reverse_lookup.insert(idx, raw_node.id);
        }

        for raw_edge in raw.edges {
            let source = *node_lookup
                .get(&raw_edge.source)
                .ok_or_else(|| anyhow!("unknown source node id: {}", raw_edge.source))?;
            let target = *node_lookup
                .get(&raw_edge.target)
                .ok_or_else(|| anyhow!("unknown target node id: {}", raw_edge.target))?;
            let name = attribute_string(&raw_edge.attributes, EDGE_TYPE_KEY)
                .unwrap_or_else(|| UNTYPED_EDGE.to_string());
            let type_code = self.dictionary.intern_edge(&name);
            graph.add_edge(source, target, type_code);
        }

        Ok(GraphInstance::new(
            graph,
            node_lookup,
            reverse_lookup,
            raw.graph_attributes,
        ))
    }
}

fn attribute_string(
    attrs: &IndexMap<String, serde_json::Value>,
    key: &str,
) -> Option<String> {
    attrs.get(key).and_then(|value| match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(num) => Some(num.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Every graph entering the miner must be connected and carry at least one
/// edge; anything else is a caller-side filtering defect.
pub fn validate_for_mining(graphs: &[GraphInstance]) -> Result<()> {
    for (idx, instance) in graphs.iter().enumerate() {
        if instance.edge_count() == 0 {
            bail!("graph #{idx} has no edges; filter it before mining");
        }
        if !instance.is_connected() {
            bail!("graph #{idx} is disconnected; filter it before mining");
        }
    }
    Ok(())
}

/// Resolves and loads every graph document under a dataset root.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    root: PathBuf,
}

impl DatasetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn load(&self, relative: impl AsRef<Path>) -> Result<(GraphInstance, TypeDictionary)> {
        let path = self.root.join(relative);
        let mut loader = GraphLoader::new();
        let instance = loader
            .from_path(&path)
            .with_context(|| format!("load dataset graph from {:?}", path))?;
        Ok((instance, loader.into_dictionary()))
    }

    /// Load every `.json` graph under the root, in filename order, sharing
    /// one dictionary. Files are read and parsed in parallel; interning is
    /// sequential so codes stay deterministic.
    pub fn load_all(&self) -> Result<(Vec<GraphInstance>, TypeDictionary)> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("list dataset directory {:?}", self.root))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| ext.eq_ignore_ascii_case("json"))
                        .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let raw_graphs: Vec<Result<RawGraph>> = paths
            .par_iter()
            .map(|path| -> Result<RawGraph> {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("open graph file {:?}", path))?;
                serde_json::from_str(&json)
                    .with_context(|| format!("parse graph file {:?}", path))
            })
            .collect();

        let mut loader = GraphLoader::new();
        let mut graphs = Vec::with_capacity(paths.len());
        for (path, raw) in paths.iter().zip(raw_graphs) {
            let instance = loader
                .from_raw_graph(raw?)
                .with_context(|| format!("build graph from {:?}", path))?;
            graphs.push(instance);
        }
        info!(
            "loaded {} graphs from {:?} ({} node types, {} edge types)",
            graphs.len(),
            self.root,
            loader.dictionary().node_type_count(),
            loader.dictionary().edge_type_count()
        );
        Ok((graphs, loader.into_dictionary()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph_json() -> String {
        r#"{
            "directed": false,
            "nodes": [
                {"id": "u", "attributes": {"label": "C"}},
                {"id": "v", "attributes": {"label": "N"}},
                {"id": "w", "attributes": {"label": "C"}}
            ],
            "edges": [
                {"source": "u", "target": "v", "attributes": {"label": "-"}},
                {"source": "v", "target": "w", "attributes": {"label": "="}}
            ],
            "graph_attributes": {"class": "active", "weight": 2.0}
        }"#
        .to_string()
    }

    #[test]
    fn load_json_graph_interns_types() {
        let mut loader = GraphLoader::new();
        let graph = loader.from_json_str(&sample_graph_json()).expect("load graph");
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(loader.dictionary().node_type_count(), 2);
        assert_eq!(loader.dictionary().edge_type_count(), 2);
        assert_eq!(graph.class_label().as_deref(), Some("active"));
        assert_eq!(graph.weight(), 2.0);
        assert!(graph.node_lookup.contains_key("u"));
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let mut loader = GraphLoader::new();
        let result = loader.from_json_str(
            r#"{"nodes": [{"id": "a"}], "edges": [{"source": "a", "target": "zzz"}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn validation_rejects_disconnected_and_edgeless() {
        let mut loader = GraphLoader::new();
        let edgeless = loader
            .from_json_str(r#"{"nodes": [{"id": "a"}], "edges": []}"#)
            .unwrap();
        assert!(validate_for_mining(&[edgeless]).is_err());

        let disconnected = loader
            .from_json_str(
                r#"{
                    "nodes": [{"id": "a"}, {"id": "b"}, {"id": "c"}],
                    "edges": [{"source": "a", "target": "b"}]
                }"#,
            )
            .unwrap();
        assert!(validate_for_mining(&[disconnected]).is_err());
    }
}
