//! Chat-completions client with retry and backoff
//!
//! The language model is treated as unreliable: empty responses, malformed
//! output and transient network failures are expected. Callers decide
//! whether a failure is degradable or terminal.

use crate::config::LlmConfig;
use crate::metrics::METRICS;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Language-model error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("upstream error: {0}")]
    UpstreamError(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A single role-tagged completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Operation label for logs and metrics
    pub operation: &'static str,
}

impl ChatRequest {
    /// Plain user-only request at temperature zero
    pub fn user_only(user: impl Into<String>, operation: &'static str) -> Self {
        Self {
            system: None,
            user: user.into(),
            temperature: 0.0,
            max_tokens: None,
            operation,
        }
    }
}

/// Seam for the language-model collaborator
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion and return the trimmed response text
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}

/// OpenAI-compatible chat-completions client
pub struct ChatCompletionsClient {
    http: Client,
    config: LlmConfig,
}

impl ChatCompletionsClient {
    /// Create a new client
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Active model identifier
    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn call_api(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.user.clone(),
        });

        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: Some(request.temperature),
            max_tokens: request.max_tokens,
        };

        let mut req = self.http.post(&self.config.endpoint).json(&body);
        if let Some(api_key) = &self.config.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(e.to_string())
            } else {
                LlmError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::UpstreamError(format!(
                "Status {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;

        Ok(choice.message.content.trim().to_string())
    }

    fn calculate_backoff(&self, attempt: usize) -> Duration {
        let base = self.config.retry_backoff();
        let multiplier = 2_u32.pow((attempt - 1) as u32);
        base.saturating_mul(multiplier)
    }
}

#[async_trait]
impl ChatModel for ChatCompletionsClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        debug!(
            "LLM call: operation={} temperature={}",
            request.operation, request.temperature
        );

        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.call_api(&request).await {
                Ok(text) => {
                    METRICS
                        .llm_requests
                        .with_label_values(&[request.operation, "success"])
                        .inc();
                    return Ok(text);
                }
                Err(e) => {
                    METRICS
                        .llm_requests
                        .with_label_values(&[request.operation, "error"])
                        .inc();

                    if attempt > self.config.max_retries {
                        warn!(
                            "LLM call failed after {} attempts: operation={} error={}",
                            attempt, request.operation, e
                        );
                        return Err(e);
                    }

                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        "LLM attempt {} failed: operation={} error={}, retrying in {:?}",
                        attempt, request.operation, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

// Wire types for the OpenAI-compatible API
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
