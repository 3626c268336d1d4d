//! Fragment corpus loaded from chunk files

pub mod loader;
pub mod models;

pub use loader::CorpusStore;
pub use models::{ChunkFile, Fragment, FragmentRecord};
