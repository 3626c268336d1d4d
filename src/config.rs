//! Service configuration
//!
//! Every section deserializes with per-field defaults so a bare process
//! starts against local collaborators. Values come from an optional TOML
//! file (path in `RBI_CONFIG`) overridden by `RBI__`-prefixed environment
//! variables.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub corpus: CorpusConfig,
    pub graph: GraphConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub followup: FollowupConfig,
    pub conversation: ConversationConfig,
    pub topics: TopicsConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("RBI_CONFIG").unwrap_or_else(|_| "config/default".to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(config::Environment::with_prefix("RBI").separator("__"))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_body_bytes: 256 * 1024,
        }
    }
}

/// Fragment corpus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Directory holding `*_chunks.json` fragment files
    pub chunk_dir: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            chunk_dir: "data/semantic_chunks".to_string(),
        }
    }
}

/// Graph collaborator configuration (Cypher transaction endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub base_url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_ms: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7474".to_string(),
            database: "neo4j".to_string(),
            username: None,
            password: None,
            timeout_ms: 5000,
        }
    }
}

impl GraphConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Embedding collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
    /// Fragments per embedding request during startup indexing
    pub batch_size: usize,
    pub max_retries: usize,
    pub retry_backoff_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8081/v1/embeddings".to_string(),
            api_key: None,
            model: "all-mpnet-base-v2".to_string(),
            timeout_ms: 30_000,
            batch_size: 128,
            max_retries: 2,
            retry_backoff_ms: 200,
        }
    }
}

impl EmbeddingConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get retry backoff as Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Language-model collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    /// API key (read from env RBI__LLM__API_KEY if not set in file)
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
    pub max_retries: usize,
    pub retry_backoff_ms: u64,
    /// Token cap for final answer generation
    pub answer_max_tokens: u32,
    /// Sampling temperature for chit-chat replies
    pub chitchat_temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key: None,
            model: "llama-3.3-70b-versatile".to_string(),
            timeout_ms: 30_000,
            max_retries: 2,
            retry_backoff_ms: 200,
            answer_max_tokens: 600,
            chitchat_temperature: 0.7,
        }
    }
}

impl LlmConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get retry backoff as Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Hybrid retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Top-K for vector search
    pub top_k: usize,
    /// Per-fragment character budget in the evidence prompt
    pub fragment_char_budget: usize,
    /// Fragment preview length in API responses
    pub preview_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            fragment_char_budget: 1200,
            preview_chars: 400,
        }
    }
}

/// Follow-up detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowupConfig {
    /// Phrases that mark a question as a follow-up outright
    pub phrases: Vec<String>,
    /// Cosine similarity threshold for short questions
    pub similarity_threshold: f32,
    /// Questions longer than this many tokens are never follow-ups
    pub max_question_tokens: usize,
}

impl Default for FollowupConfig {
    fn default() -> Self {
        Self {
            phrases: vec![
                "explain again".to_string(),
                "repeat".to_string(),
                "again".to_string(),
                "clarify".to_string(),
                "more clearly".to_string(),
                "elaborate".to_string(),
                "explain that".to_string(),
            ],
            similarity_threshold: 0.55,
            max_question_tokens: 4,
        }
    }
}

/// Conversation store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Time-to-live for a conversation record in seconds
    pub ttl_secs: u64,
    /// Maximum number of concurrent conversation records
    pub max_entries: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 1800,
            max_entries: 10_000,
        }
    }
}

impl ConversationConfig {
    /// Get TTL as Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// A topic with the keywords that select it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRule {
    pub key: String,
    pub keywords: Vec<String>,
}

/// Topic and intent reference data
///
/// Rules are scanned in declaration order; the first rule whose keyword set
/// intersects the question wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    pub greetings: Vec<String>,
    pub domain_keywords: Vec<String>,
    pub rules: Vec<TopicRule>,
    pub default_topic: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        fn rule(key: &str, keywords: &[&str]) -> TopicRule {
            TopicRule {
                key: key.to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
            }
        }

        Self {
            greetings: vec![
                "hi".to_string(),
                "hello".to_string(),
                "hey".to_string(),
                "hii".to_string(),
            ],
            domain_keywords: vec![
                "rbi".to_string(),
                "loan".to_string(),
                "dlg".to_string(),
                "fldg".to_string(),
                "cap".to_string(),
                "ltv".to_string(),
                "kyc".to_string(),
                "ecl".to_string(),
            ],
            rules: vec![
                rule("DLG_Cap", &["dlg", "fldg", "first loss"]),
                rule("Gold_Loan_LTV", &["gold", "ltv"]),
                rule("ECL_Overview", &["ecl", "expected credit"]),
                rule("KYC_Process", &["kyc"]),
                rule("AML_Compliance", &["aml"]),
                rule("Model_Governance_Framework", &["model governance"]),
            ],
            default_topic: "DLG_Cap".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.fragment_char_budget, 1200);
        assert_eq!(config.followup.similarity_threshold, 0.55);
        assert_eq!(config.followup.max_question_tokens, 4);
        assert_eq!(config.topics.default_topic, "DLG_Cap");
    }

    #[test]
    fn test_topic_rules_order() {
        let topics = TopicsConfig::default();
        // Rule order is significant: first match wins during resolution.
        assert_eq!(topics.rules[0].key, "DLG_Cap");
        assert_eq!(topics.rules[1].key, "Gold_Loan_LTV");
        assert!(topics.rules[1].keywords.contains(&"gold".to_string()));
    }

    #[test]
    fn test_duration_conversions() {
        let config = Config::default();
        assert_eq!(config.graph.timeout(), Duration::from_millis(5000));
        assert_eq!(config.llm.retry_backoff(), Duration::from_millis(200));
        assert_eq!(config.conversation.ttl(), Duration::from_secs(1800));
    }
}
