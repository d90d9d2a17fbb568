use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{ensure, Result};
use indexmap::IndexSet;
use log::{debug, info, trace};
use petgraph::prelude::EdgeIndex;
use rayon::prelude::*;

use crate::canon::search::{canonical_orbits, is_canonic};
use crate::canon::DfsCode;
use crate::graph::coder::TypeCoder;
use crate::graph::construction::validate_for_mining;
use crate::graph::model::{GraphInstance, TypeId, DEFAULT_RING_BOUND};
use crate::graph::rings::detect_rings;
use crate::matching;
use crate::mine::extend::enumerate_extensions;
use crate::mine::fragment::{support_of, Embedding, Fragment, Pattern};

/// How candidate edges grow a fragment. Chosen once per mining session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionStrategy {
    /// Plain edge-by-edge rightmost-path extension.
    EdgeOnly,
    /// Additionally withhold patterns whose ring edges are incomplete:
    /// an edge that lies on a ring in every host occurrence must lie on a
    /// ring of the pattern before the pattern is reported. Such fragments
    /// are still extended, since growth may complete the ring.
    RingAware,
}

#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Minimum number of distinct host graphs containing a pattern.
    pub min_support: usize,
    /// Minimum pattern size in nodes for a pattern to be reported.
    pub min_size: usize,
    /// Maximum pattern size in nodes; growth stops here.
    pub max_size: usize,
    pub extension: ExtensionStrategy,
    /// Largest simple ring tracked by ring detection.
    pub ring_bound: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            min_support: 2,
            min_size: 2,
            max_size: 10,
            extension: ExtensionStrategy::EdgeOnly,
            ring_bound: DEFAULT_RING_BOUND,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MiningStats {
    pub candidates: usize,
    pub support_pruned: usize,
    pub duplicate_pruned: usize,
    pub ring_withheld: usize,
    pub emitted: usize,
}

pub struct MiningResult {
    pub patterns: Vec<Pattern>,
    pub coder: TypeCoder,
    pub stats: MiningStats,
}

/// Depth-first frequent-pattern search over the fragment lattice.
pub struct Miner {
    config: MinerConfig,
}

impl Miner {
    pub fn new(config: MinerConfig) -> Self {
        Self { config }
    }

    /// Mine every canonical pattern within the size window whose support
    /// meets the threshold. An empty database or an unsatisfiable threshold
    /// yields an empty pattern list, not an error.
    pub fn mine(&self, graphs: &[GraphInstance]) -> Result<MiningResult> {
        ensure!(self.config.min_support >= 1, "minimum support must be positive");
        ensure!(
            self.config.min_size <= self.config.max_size,
            "minimum size {} exceeds maximum size {}",
            self.config.min_size,
            self.config.max_size
        );
        if graphs.is_empty() {
            return Ok(MiningResult {
                patterns: Vec::new(),
                coder: TypeCoder::default(),
                stats: MiningStats::default(),
            });
        }
        validate_for_mining(graphs)?;

        let start = Instant::now();
        let coder = TypeCoder::from_database(graphs);
        let db: Vec<GraphInstance> = graphs
            .iter()
            .map(|instance| coder.encode_graph(instance))
            .collect();
        if self.config.extension == ExtensionStrategy::RingAware {
            for instance in &db {
                instance.prepare_embed(self.config.ring_bound);
            }
        }

        let mut seeds: BTreeMap<TypeId, Vec<Embedding>> = BTreeMap::new();
        for (host, instance) in db.iter().enumerate() {
            for node in instance.graph.node_indices() {
                seeds
                    .entry(instance.node_type(node))
                    .or_default()
                    .push(Embedding {
                        host,
                        nodes: vec![node],
                        edges: Vec::new(),
                    });
            }
        }

        let mut patterns = Vec::new();
        let mut stats = MiningStats::default();
        for (root_type, embeddings) in seeds {
            let seed = Fragment::new(DfsCode::root(root_type), embeddings, 0);
            if seed.support < self.config.min_support {
                trace!("seed type {} below support ({})", root_type, seed.support);
                continue;
            }
            self.grow(&seed, &db, &mut patterns, &mut stats)?;
        }
        stats.emitted = patterns.len();

        self.verify_emission(&patterns, &db)?;
        info!(
            "mined {} patterns from {} graphs in {:?} (candidates {}, support-pruned {}, duplicate-pruned {}, ring-withheld {})",
            patterns.len(),
            db.len(),
            start.elapsed(),
            stats.candidates,
            stats.support_pruned,
            stats.duplicate_pruned,
            stats.ring_withheld
        );
        Ok(MiningResult {
            patterns,
            coder,
            stats,
        })
    }

    fn grow(
        &self,
        fragment: &Fragment,
        db: &[GraphInstance],
        out: &mut Vec<Pattern>,
        stats: &mut MiningStats,
    ) -> Result<()> {
        let orbits = if fragment.edge_count() == 0 {
            vec![0]
        } else {
            canonical_orbits(fragment.graph(), &fragment.code)
        };
        let extensions = enumerate_extensions(fragment, db, &orbits, self.config.max_size);

        for (tuple, embeddings) in extensions {
            stats.candidates += 1;
            let support = support_of(&embeddings);
            if support < self.config.min_support {
                stats.support_pruned += 1;
                trace!(
                    "pruned extension {:?} of {}: support {} < {}",
                    tuple,
                    fragment.code,
                    support,
                    self.config.min_support
                );
                continue;
            }

            let child = Fragment::new(
                fragment.code.extended(tuple),
                embeddings,
                fragment.ring_closures + usize::from(!tuple.is_forward()),
            );
            if !is_canonic(child.graph(), &child.code) {
                stats.duplicate_pruned += 1;
                debug!("pruned non-canonical duplicate {}", child.code);
                continue;
            }

            if child.node_count() >= self.config.min_size {
                if self.emission_allowed(&child, db) {
                    out.push(Pattern::from_fragment(&child));
                } else {
                    stats.ring_withheld += 1;
                }
            }
            self.grow(&child, db, out, stats)?;
        }
        Ok(())
    }

    fn emission_allowed(&self, fragment: &Fragment, db: &[GraphInstance]) -> bool {
        match self.config.extension {
            ExtensionStrategy::EdgeOnly => true,
            ExtensionStrategy::RingAware => {
                rings_complete(fragment, db, self.config.ring_bound)
            }
        }
    }

    /// Consistency gate on everything emitted: no two patterns may share a
    /// code word, and for each pattern the support derived from its
    /// embedding list must agree with an independent containment sweep over
    /// the database. A disagreement is a canonicality or orbit-pruning
    /// defect and aborts the run; a silent miscount would corrupt every
    /// feature vector derived downstream.
    fn verify_emission(&self, patterns: &[Pattern], db: &[GraphInstance]) -> Result<()> {
        let mut codes = IndexSet::new();
        for pattern in patterns {
            ensure!(
                codes.insert(pattern.code.clone()),
                "duplicate canonical code emitted: {}",
                pattern.code
            );
        }
        for pattern in patterns {
            let embedded = support_of(&pattern.embeddings);
            let contained = db
                .par_iter()
                .filter(|host| matching::contains(&pattern.graph, host))
                .count();
            ensure!(
                embedded == pattern.support && contained == pattern.support,
                "support mismatch for {}: reported {}, embeddings {}, containment {}",
                pattern.code,
                pattern.support,
                embedded,
                contained
            );
        }
        Ok(())
    }
}

/// Every pattern edge whose host images are ring edges in all embeddings
/// must itself lie on a ring of the pattern.
fn rings_complete(fragment: &Fragment, db: &[GraphInstance], ring_bound: usize) -> bool {
    let pattern_rings = detect_rings(fragment.graph(), ring_bound);
    for position in 0..fragment.edge_count() {
        let flagged = fragment.embeddings.iter().all(|embedding| {
            db[embedding.host]
                .ring_marks()
                .map(|marks| marks.edge_in_ring(embedding.edges[position]))
                .unwrap_or(false)
        });
        if flagged && !pattern_rings.edge_in_ring(EdgeIndex::new(position)) {
            return false;
        }
    }
    true
}

/// Turn one mined pattern into a per-graph feature column: 0/1 containment
/// or a log-damped embedding count, against any host graphs, including ones
/// outside the mining database. Pattern and hosts must share one type
/// coding.
pub fn feature_column(pattern: &Pattern, hosts: &[GraphInstance], counts: bool) -> Vec<f64> {
    hosts
        .par_iter()
        .map(|host| {
            if counts {
                let count = matching::embedding_count(&pattern.graph, host);
                if count == 0 {
                    0.0
                } else {
                    1.0 + (count as f64).ln()
                }
            } else if matching::contains(&pattern.graph, host) {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}
