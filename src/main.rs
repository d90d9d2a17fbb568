use std::env;
use std::time::Instant;

use anyhow::{Context, Result};
use log::info;

use fragmine::{
    describe, validate_for_mining, DatasetLoader, Miner, MinerConfig, TypeDictionary,
};

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

struct CliArgs {
    dataset: String,
    min_support: usize,
}

fn parse_args() -> Result<CliArgs> {
    let mut args = env::args().skip(1);
    let dataset = args.next().unwrap_or_else(|| "datasets".to_string());
    let min_support = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("minimum support must be a number, got '{raw}'"))?,
        None => 2,
    };
    if let Some(extra) = args.next() {
        anyhow::bail!("Unexpected extra argument: {extra}");
    }
    Ok(CliArgs {
        dataset,
        min_support,
    })
}

fn main() -> Result<()> {
    init_logging();
    let args = parse_args()?;

    info!("Loading dataset from {}", args.dataset);
    let load_start = Instant::now();
    let (graphs, dictionary) = DatasetLoader::new(&args.dataset).load_all()?;
    anyhow::ensure!(!graphs.is_empty(), "no graphs found under {}", args.dataset);
    validate_for_mining(&graphs).context("dataset contains graphs unfit for mining")?;
    info!(
        "Loaded {} graphs in {:?}",
        graphs.len(),
        load_start.elapsed()
    );

    let config = MinerConfig {
        min_support: args.min_support,
        ..MinerConfig::default()
    };
    info!(
        "Mining with support >= {}, sizes {}..={}",
        config.min_support, config.min_size, config.max_size
    );

    let mine_start = Instant::now();
    let result = Miner::new(config).mine(&graphs)?;
    info!(
        "Mining finished in {:?}: {} patterns",
        mine_start.elapsed(),
        result.patterns.len()
    );

    report_patterns(&result, &dictionary);
    Ok(())
}

fn report_patterns(result: &fragmine::MiningResult, dictionary: &TypeDictionary) {
    for (idx, pattern) in result.patterns.iter().enumerate() {
        let decoded = pattern.decoded_graph(&result.coder);
        let root_name = decoded
            .node_weight(petgraph::prelude::NodeIndex::new(0))
            .and_then(|code| dictionary.node_name(*code))
            .unwrap_or("?");
        info!(
            "Pattern #{idx}: support {}, size {}, root {}, {}",
            pattern.support,
            pattern.size,
            root_name,
            describe(&decoded)
        );
    }
    info!(
        "Search stats: candidates {}, support-pruned {}, duplicate-pruned {}, ring-withheld {}",
        result.stats.candidates,
        result.stats.support_pruned,
        result.stats.duplicate_pruned,
        result.stats.ring_withheld
    );
}
