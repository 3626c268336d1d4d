//! Embedding collaborator

pub mod client;

pub use client::{cosine_similarity, Embedder, EmbeddingError, HttpEmbedder};
