//! Hybrid merger combining graph expansion with vector search

use crate::corpus::{CorpusStore, Fragment};
use crate::graph::{Fact, GraphExpander};
use crate::metrics::METRICS;
use crate::retrieval::VectorSearcher;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Merged retrieval result for one request
///
/// Both lists empty is a valid outcome meaning "no evidence found", not an
/// error. Fragment order carries no relevance ranking.
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    pub fragments: Vec<Fragment>,
    pub facts: Vec<Fact>,
}

impl Evidence {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.facts.is_empty()
    }
}

/// Merges graph-derived and similarity-derived fragments into one set
pub struct HybridRetriever {
    expander: GraphExpander,
    searcher: Arc<VectorSearcher>,
    corpus: Arc<CorpusStore>,
    top_k: usize,
}

impl HybridRetriever {
    pub fn new(
        expander: GraphExpander,
        searcher: Arc<VectorSearcher>,
        corpus: Arc<CorpusStore>,
        top_k: usize,
    ) -> Self {
        Self {
            expander,
            searcher,
            corpus,
            top_k,
        }
    }

    /// Retrieve evidence for a query scoped to a topic
    ///
    /// The two sources run concurrently and degrade independently: an
    /// unreachable collaborator contributes zero evidence instead of
    /// failing the request.
    pub async fn merge(&self, query: &str, topic: &str) -> Evidence {
        let start = Instant::now();

        let (graph_ids, vector_hits) = tokio::join!(
            self.expander.related_fragments(topic),
            self.searcher.search(query, self.top_k),
        );

        let graph_ids = match graph_ids {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Graph expansion degraded to empty: {}", e);
                METRICS
                    .graph_degradations
                    .with_label_values(&["related"])
                    .inc();
                Vec::new()
            }
        };

        let vector_hits = match vector_hits {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Vector search degraded to empty: {}", e);
                METRICS.vector_degradations.inc();
                Vec::new()
            }
        };

        // Set union; sorted order keeps downstream output deterministic.
        let merged: BTreeSet<String> = graph_ids
            .into_iter()
            .chain(vector_hits.into_iter().map(|(id, _)| id))
            .collect();
        let merged: Vec<String> = merged.into_iter().collect();

        let facts = match self.expander.facts_for(&merged).await {
            Ok(facts) => facts,
            Err(e) => {
                warn!("Fact expansion degraded to empty: {}", e);
                METRICS
                    .graph_degradations
                    .with_label_values(&["facts"])
                    .inc();
                Vec::new()
            }
        };

        let fragments = merged
            .into_iter()
            .map(|id| {
                let text = self.corpus.text_for(&id);
                Fragment::new(id, text)
            })
            .collect();

        METRICS
            .retrieval_duration
            .with_label_values(&["merge"])
            .observe(start.elapsed().as_secs_f64());

        Evidence { fragments, facts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{Embedder, EmbeddingError};
    use crate::graph::{GraphError, GraphStore, TopicLookup};
    use async_trait::async_trait;

    struct FakeGraph {
        nodes: Vec<String>,
        facts: Vec<Fact>,
        fail: bool,
    }

    #[async_trait]
    impl GraphStore for FakeGraph {
        async fn topic_nodes(&self, _lookup: TopicLookup) -> Result<Vec<String>, GraphError> {
            if self.fail {
                return Err(GraphError::Unreachable("down".to_string()));
            }
            Ok(self.nodes.clone())
        }

        async fn outgoing_relations(&self, _ids: &[String]) -> Result<Vec<Fact>, GraphError> {
            if self.fail {
                return Err(GraphError::Unreachable("down".to_string()));
            }
            Ok(self.facts.clone())
        }
    }

    struct FakeEmbedder;

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|t| if t.contains("gold") { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
                .collect())
        }
    }

    fn corpus() -> Arc<CorpusStore> {
        Arc::new(CorpusStore::from_fragments(vec![
            Fragment::new("c1", "gold loan ltv is 75 percent"),
            Fragment::new("c2", "unrelated text"),
        ]))
    }

    async fn retriever(graph: FakeGraph, top_k: usize) -> HybridRetriever {
        let corpus = corpus();
        let searcher = Arc::new(
            VectorSearcher::build(&corpus, Arc::new(FakeEmbedder), 16)
                .await
                .unwrap(),
        );
        HybridRetriever::new(
            GraphExpander::new(Arc::new(graph)),
            searcher,
            corpus,
            top_k,
        )
    }

    #[tokio::test]
    async fn test_merge_unions_and_dedupes() {
        let graph = FakeGraph {
            // c1 also surfaces from vector search: the union must dedupe it.
            nodes: vec!["Chunk::c1".to_string(), "Clause::c7".to_string()],
            facts: vec![Fact::new("c1", "pertainsTo", "Topic::Gold_Loan_LTV", "Gold LTV")],
            fail: false,
        };
        let retriever = retriever(graph, 1).await;

        let evidence = retriever.merge("gold question", "Gold_Loan_LTV").await;

        let ids: Vec<&str> = evidence.fragments.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c7"]);
        // Unknown id resolves to empty text, never an error.
        assert_eq!(evidence.fragments[1].text, "");
        assert_eq!(evidence.facts.len(), 1);
    }

    #[tokio::test]
    async fn test_graph_failure_degrades_to_vector_only() {
        let graph = FakeGraph {
            nodes: vec![],
            facts: vec![],
            fail: true,
        };
        let retriever = retriever(graph, 1).await;

        let evidence = retriever.merge("gold question", "Gold_Loan_LTV").await;

        let ids: Vec<&str> = evidence.fragments.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["c1"]);
        assert!(evidence.facts.is_empty());
    }

    #[tokio::test]
    async fn test_empty_both_sources_is_valid() {
        let graph = FakeGraph {
            nodes: vec![],
            facts: vec![],
            fail: false,
        };
        let corpus = Arc::new(CorpusStore::from_fragments(vec![]));
        let searcher = Arc::new(
            VectorSearcher::build(&corpus, Arc::new(FakeEmbedder), 16)
                .await
                .unwrap(),
        );
        let retriever = HybridRetriever::new(
            GraphExpander::new(Arc::new(graph)),
            searcher,
            corpus,
            5,
        );

        let evidence = retriever.merge("anything", "DLG_Cap").await;

        assert!(evidence.is_empty());
    }
}
