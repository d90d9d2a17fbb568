pub mod canon;
pub mod graph;
pub mod matching;
pub mod mine;

pub use canon::{canonical_code, canonical_orbits, is_canonic, CanonicalForm, CodeEdge, DfsCode};
pub use graph::{
    describe, validate_for_mining, DatasetLoader, GraphInstance, GraphLoader, GraphWriter,
    TypeCoder, TypeDictionary, TypeMask, TypedGraph,
};
pub use matching::{contains, embed, embedding_count};
pub use mine::{
    feature_column, select_top_k, Embedding, ExtensionStrategy, Fragment, Miner, MinerConfig,
    MiningResult, Pattern,
};
