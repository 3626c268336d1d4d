//! Hybrid retrieval: vector search merged with graph expansion

pub mod hybrid;
pub mod vector;

pub use hybrid::{Evidence, HybridRetriever};
pub use vector::VectorSearcher;
