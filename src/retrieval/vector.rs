//! In-memory vector search over the fragment corpus

use crate::corpus::CorpusStore;
use crate::embedding::{cosine_similarity, Embedder, EmbeddingError};
use std::sync::Arc;
use tracing::info;

struct IndexedFragment {
    id: String,
    text: String,
    embedding: Vec<f32>,
}

/// Similarity searcher over precomputed fragment embeddings
///
/// Embeddings are computed once at startup and held for the process
/// lifetime; fragments added afterwards are invisible until a reload.
pub struct VectorSearcher {
    entries: Vec<IndexedFragment>,
    embedder: Arc<dyn Embedder>,
}

impl VectorSearcher {
    /// Embed the whole corpus and build the index
    pub async fn build(
        corpus: &CorpusStore,
        embedder: Arc<dyn Embedder>,
        batch_size: usize,
    ) -> Result<Self, EmbeddingError> {
        let fragments: Vec<_> = corpus.fragments().collect();
        let batch_size = batch_size.max(1);

        let mut entries = Vec::with_capacity(fragments.len());
        for batch in fragments.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|f| f.text.clone()).collect();
            let vectors = embedder.embed(&texts).await?;

            for (fragment, embedding) in batch.iter().zip(vectors) {
                entries.push(IndexedFragment {
                    id: fragment.id.clone(),
                    text: fragment.text.clone(),
                    embedding,
                });
            }
        }

        info!("Vector index built over {} fragments", entries.len());

        Ok(Self { entries, embedder })
    }

    /// Top-k fragments by descending cosine similarity to the query
    ///
    /// Equal scores keep corpus order.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<(String, String)>, EmbeddingError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_one(query).await?;

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (idx, cosine_similarity(&query_embedding, &entry.embedding)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(idx, _)| {
                let entry = &self.entries[idx];
                (entry.id.clone(), entry.text.clone())
            })
            .collect())
    }

    /// Number of indexed fragments
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Fragment;
    use async_trait::async_trait;

    /// Embedder mapping known texts to fixed vectors
    struct FakeEmbedder;

    fn vector_for(text: &str) -> Vec<f32> {
        match text {
            "gold loans" => vec![1.0, 0.0],
            "gold jewellery" => vec![0.9, 0.1],
            "credit risk" => vec![0.0, 1.0],
            "ltv query" => vec![1.0, 0.0],
            _ => vec![0.5, 0.5],
        }
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|t| vector_for(t)).collect())
        }
    }

    fn corpus() -> CorpusStore {
        CorpusStore::from_fragments(vec![
            Fragment::new("c1", "gold loans"),
            Fragment::new("c2", "credit risk"),
            Fragment::new("c3", "gold jewellery"),
        ])
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let searcher = VectorSearcher::build(&corpus(), Arc::new(FakeEmbedder), 2)
            .await
            .unwrap();

        let results = searcher.search("ltv query", 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "c1");
        assert_eq!(results[1].0, "c3");
    }

    #[tokio::test]
    async fn test_search_ties_keep_corpus_order() {
        let store = CorpusStore::from_fragments(vec![
            Fragment::new("a", "same"),
            Fragment::new("b", "same"),
            Fragment::new("c", "same"),
        ]);
        let searcher = VectorSearcher::build(&store, Arc::new(FakeEmbedder), 10)
            .await
            .unwrap();

        let results = searcher.search("anything", 3).await.unwrap();

        let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_search_caps_at_k() {
        let searcher = VectorSearcher::build(&corpus(), Arc::new(FakeEmbedder), 10)
            .await
            .unwrap();

        let results = searcher.search("ltv query", 1).await.unwrap();
        assert_eq!(results.len(), 1);

        let results = searcher.search("ltv query", 100).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_corpus() {
        let store = CorpusStore::from_fragments(vec![]);
        let searcher = VectorSearcher::build(&store, Arc::new(FakeEmbedder), 10)
            .await
            .unwrap();

        assert!(searcher.is_empty());
        let results = searcher.search("anything", 5).await.unwrap();
        assert!(results.is_empty());
    }
}
