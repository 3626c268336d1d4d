//! Embedding client for the vector collaborator
//!
//! Talks to an OpenAI-compatible embeddings endpoint. Fragment embeddings
//! are computed once at startup; at request time only the query and short
//! follow-up comparisons are embedded.

use crate::config::EmbeddingConfig;
use crate::metrics::METRICS;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Embedding error types
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("upstream error: {0}")]
    UpstreamError(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Seam for the embedding collaborator
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, preserving input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding batch".to_string()))
    }
}

/// HTTP embedding client
pub struct HttpEmbedder {
    http: Client,
    config: EmbeddingConfig,
}

impl HttpEmbedder {
    /// Create a new embedding client
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EmbeddingError::RequestFailed(e.to_string()))?;

        Ok(Self { http, config })
    }

    async fn call_api(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = EmbeddingsRequest {
            model: self.config.model.clone(),
            input: texts.to_vec(),
        };

        let mut req = self.http.post(&self.config.endpoint).json(&body);
        if let Some(api_key) = &self.config.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout(e.to_string())
            } else {
                EmbeddingError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EmbeddingError::UpstreamError(format!(
                "Status {}: {}",
                status, error_text
            )));
        }

        let payload: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if payload.data.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                payload.data.len()
            )));
        }

        let mut rows = payload.data;
        rows.sort_by_key(|r| r.index);
        Ok(rows.into_iter().map(|r| r.embedding).collect())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding batch of {} texts", texts.len());

        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.call_api(texts).await {
                Ok(vectors) => {
                    METRICS
                        .embedding_requests
                        .with_label_values(&["success"])
                        .inc();
                    return Ok(vectors);
                }
                Err(e) => {
                    METRICS
                        .embedding_requests
                        .with_label_values(&["error"])
                        .inc();

                    if attempt > self.config.max_retries {
                        warn!("Embedding failed after {} attempts: {}", attempt, e);
                        return Err(e);
                    }

                    let backoff = self
                        .config
                        .retry_backoff()
                        .saturating_mul(2_u32.pow((attempt - 1) as u32));
                    warn!(
                        "Embedding attempt {} failed: {}, retrying in {:?}",
                        attempt, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

/// Cosine similarity between two vectors
///
/// Zero-length or zero-norm inputs score 0.0 rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    dot / denom
}

// Wire types for the embeddings API
#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}
