//! Corpus loading from the chunk directory

use super::models::{ChunkFile, Fragment};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// In-memory fragment corpus
///
/// Built once at startup; fragments added to the directory afterwards are
/// invisible until a restart. Lookup by identifier never fails: a missing
/// id resolves to an empty string.
#[derive(Debug, Default)]
pub struct CorpusStore {
    id_to_text: HashMap<String, String>,
    ordered_ids: Vec<String>,
}

impl CorpusStore {
    /// Load every `*_chunks.json` file under the chunk directory
    pub fn load(chunk_dir: &str) -> Result<Self> {
        let pattern = format!("{}/*_chunks.json", chunk_dir);
        let mut paths: Vec<_> = glob::glob(&pattern)
            .map_err(|e| Error::Config(format!("invalid chunk pattern: {}", e)))?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Skipping unreadable chunk path: {}", e);
                    None
                }
            })
            .collect();
        paths.sort();

        let mut store = Self::default();
        for path in &paths {
            if let Err(e) = store.load_file(path) {
                warn!("Skipping chunk file {}: {}", path.display(), e);
            }
        }

        info!(
            "Loaded {} fragments from {} chunk files in {}",
            store.len(),
            paths.len(),
            chunk_dir
        );

        Ok(store)
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Internal(format!("read failed: {}", e)))?;
        let file: ChunkFile = serde_json::from_str(&raw)
            .map_err(|e| Error::Internal(format!("parse failed: {}", e)))?;

        for record in file.into_records() {
            let Some(id) = record.chunk_id else {
                continue;
            };
            if self.id_to_text.insert(id.clone(), record.text).is_none() {
                self.ordered_ids.push(id);
            }
        }

        Ok(())
    }

    /// Build a corpus from fragments directly (used in tests and tools)
    pub fn from_fragments(fragments: Vec<Fragment>) -> Self {
        let mut store = Self::default();
        for fragment in fragments {
            if store
                .id_to_text
                .insert(fragment.id.clone(), fragment.text)
                .is_none()
            {
                store.ordered_ids.push(fragment.id);
            }
        }
        store
    }

    /// Resolve an identifier to its text; missing ids yield an empty string
    pub fn text_for(&self, id: &str) -> String {
        self.id_to_text.get(id).cloned().unwrap_or_default()
    }

    /// Fragment ids in stable corpus order
    pub fn ordered_ids(&self) -> &[String] {
        &self.ordered_ids
    }

    /// All fragments in stable corpus order
    pub fn fragments(&self) -> impl Iterator<Item = Fragment> + '_ {
        self.ordered_ids
            .iter()
            .map(|id| Fragment::new(id.clone(), self.text_for(id)))
    }

    pub fn len(&self) -> usize {
        self.ordered_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_ids.is_empty()
    }
}
