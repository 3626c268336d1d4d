//! Follow-up detection and rewriting
//!
//! A question is a follow-up when it either contains a marker phrase or is
//! short enough that embedding similarity against the previous answer is
//! trustworthy. Long questions are assumed self-contained regardless of
//! similarity.

use crate::config::FollowupConfig;
use crate::embedding::{cosine_similarity, Embedder};
use crate::llm::{ChatModel, ChatRequest};
use crate::metrics::METRICS;
use std::sync::Arc;
use tracing::{debug, warn};

const REWRITE_MAX_TOKENS: u32 = 80;

/// Decides continuation and rewrites follow-ups into standalone questions
pub struct FollowupResolver {
    config: FollowupConfig,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
}

impl FollowupResolver {
    pub fn new(config: FollowupConfig, embedder: Arc<dyn Embedder>, chat: Arc<dyn ChatModel>) -> Self {
        Self {
            config,
            embedder,
            chat,
        }
    }

    /// True when the question continues the previous answer
    pub async fn is_followup(&self, previous_answer: &str, question: &str) -> bool {
        if previous_answer.is_empty() {
            return false;
        }

        let normalized = question.to_lowercase();
        let normalized = normalized.trim();

        if self
            .config
            .phrases
            .iter()
            .any(|phrase| normalized.contains(phrase.as_str()))
        {
            return true;
        }

        // The length gate comes before similarity: long questions are
        // never follow-ups.
        if question.split_whitespace().count() > self.config.max_question_tokens {
            return false;
        }

        let texts = vec![previous_answer.to_string(), question.to_string()];
        let vectors = match self.embedder.embed(&texts).await {
            Ok(vectors) if vectors.len() == 2 => vectors,
            Ok(_) => {
                warn!("Follow-up similarity skipped: short embedding batch");
                return false;
            }
            Err(e) => {
                warn!("Follow-up similarity skipped: {}", e);
                return false;
            }
        };

        let similarity = cosine_similarity(&vectors[0], &vectors[1]);
        debug!("Follow-up similarity: {:.3}", similarity);

        similarity > self.config.similarity_threshold
    }

    /// Rewrite a follow-up into a self-contained question
    ///
    /// The trimmed model reply is returned verbatim; when the model is
    /// unavailable the original question is kept.
    pub async fn rewrite(&self, previous_answer: &str, question: &str) -> String {
        let prompt = format!(
            "Rewrite this follow-up into a complete RBI regulatory question.\n\n\
             PREVIOUS ANSWER:\n{}\n\n\
             FOLLOW-UP:\n{}\n\n\
             Return ONLY the rewritten question.",
            previous_answer, question
        );

        let request = ChatRequest {
            system: None,
            user: prompt,
            temperature: 0.0,
            max_tokens: Some(REWRITE_MAX_TOKENS),
            operation: "rewrite",
        };

        match self.chat.complete(request).await {
            Ok(rewritten) if !rewritten.is_empty() => {
                METRICS.followup_rewrites.inc();
                debug!("Follow-up rewritten: {}", rewritten);
                rewritten
            }
            Ok(_) => {
                warn!("Follow-up rewrite returned empty text, keeping original");
                question.to_string()
            }
            Err(e) => {
                warn!("Follow-up rewrite failed, keeping original: {}", e);
                question.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingError;
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder scoring every pair at a fixed similarity
    struct FixedSimilarityEmbedder {
        similar: bool,
        calls: AtomicUsize,
    }

    impl FixedSimilarityEmbedder {
        fn new(similar: bool) -> Self {
            Self {
                similar,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for FixedSimilarityEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Similar: identical vectors (cosine 1.0); else orthogonal.
            Ok(texts
                .iter()
                .enumerate()
                .map(|(i, _)| {
                    if self.similar || i == 0 {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    struct FakeChat {
        reply: Option<String>,
    }

    #[async_trait]
    impl ChatModel for FakeChat {
        async fn complete(&self, _request: ChatRequest) -> Result<String, LlmError> {
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(LlmError::RequestFailed("down".to_string())),
            }
        }
    }

    fn resolver(similar: bool, reply: Option<&str>) -> (FollowupResolver, Arc<FixedSimilarityEmbedder>) {
        let embedder = Arc::new(FixedSimilarityEmbedder::new(similar));
        let resolver = FollowupResolver::new(
            FollowupConfig::default(),
            embedder.clone(),
            Arc::new(FakeChat {
                reply: reply.map(String::from),
            }),
        );
        (resolver, embedder)
    }

    #[tokio::test]
    async fn test_no_previous_answer_is_never_followup() {
        let (resolver, embedder) = resolver(true, None);
        assert!(!resolver.is_followup("", "explain again").await);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_phrase_match_skips_embedding() {
        let (resolver, embedder) = resolver(false, None);
        assert!(
            resolver
                .is_followup("The cap is 5%.", "please Explain Again in detail")
                .await
        );
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_similar_question_is_followup() {
        let (resolver, _) = resolver(true, None);
        assert!(resolver.is_followup("The cap is 5%.", "and for banks?").await);
    }

    #[tokio::test]
    async fn test_length_gate_beats_similarity() {
        let (resolver, embedder) = resolver(true, None);
        let long_question = "what is the exact regulatory cap for default loss guarantees today";
        assert!(!resolver.is_followup("The cap is 5%.", long_question).await);
        // The embedding collaborator must not even be consulted.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_dissimilar_question_is_not_followup() {
        let (resolver, _) = resolver(false, None);
        assert!(!resolver.is_followup("The cap is 5%.", "kyc rules?").await);
    }

    #[tokio::test]
    async fn test_embedding_failure_means_not_followup() {
        struct DownEmbedder;

        #[async_trait]
        impl Embedder for DownEmbedder {
            async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
                Err(EmbeddingError::RequestFailed("down".to_string()))
            }
        }

        let resolver = FollowupResolver::new(
            FollowupConfig::default(),
            Arc::new(DownEmbedder),
            Arc::new(FakeChat { reply: None }),
        );

        assert!(!resolver.is_followup("The cap is 5%.", "and banks?").await);
    }

    #[tokio::test]
    async fn test_rewrite_returns_model_text_verbatim() {
        let (resolver, _) = resolver(true, Some("What is the DLG cap for NBFCs?"));
        let rewritten = resolver.rewrite("The cap is 5%.", "and for nbfcs?").await;
        assert_eq!(rewritten, "What is the DLG cap for NBFCs?");
    }

    #[tokio::test]
    async fn test_rewrite_failure_keeps_original() {
        let (resolver, _) = resolver(true, None);
        let rewritten = resolver.rewrite("The cap is 5%.", "and for nbfcs?").await;
        assert_eq!(rewritten, "and for nbfcs?");
    }
}
