pub mod extend;
pub mod fragment;
pub mod search;
pub mod select;

pub use extend::enumerate_extensions;
pub use fragment::{support_of, Embedding, Fragment, Pattern};
pub use search::{feature_column, ExtensionStrategy, Miner, MinerConfig, MiningResult, MiningStats};
pub use select::select_top_k;
