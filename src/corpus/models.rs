//! Data models for the fragment corpus

use serde::{Deserialize, Serialize};

/// A retrievable unit of source document text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: String,
    pub text: String,
}

impl Fragment {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// One fragment record as stored on disk
///
/// Records without a `chunk_id` are skipped by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentRecord {
    #[serde(default)]
    pub chunk_id: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// On-disk chunk file layout
///
/// Files contain either a bare list of records or an object wrapping the
/// list under a `chunks` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChunkFile {
    Wrapped { chunks: Vec<FragmentRecord> },
    Bare(Vec<FragmentRecord>),
}

impl ChunkFile {
    /// Unwrap into the record list
    pub fn into_records(self) -> Vec<FragmentRecord> {
        match self {
            ChunkFile::Wrapped { chunks } => chunks,
            ChunkFile::Bare(records) => records,
        }
    }
}
