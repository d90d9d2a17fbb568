pub mod coder;
pub mod construction;
pub mod model;
pub mod rings;
pub mod serialization;

pub use coder::{TypeCoder, TypeMask};
pub use construction::{validate_for_mining, DatasetLoader, GraphLoader};
pub use model::{
    GraphId, GraphInstance, RawGraph, TypeDictionary, TypeId, TypedGraph, DEFAULT_RING_BOUND,
};
pub use rings::{detect_rings, RingMarks};
pub use serialization::{describe, GraphWriter};
