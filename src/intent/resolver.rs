//! Topic resolver: greetings, keyword rules, classifier fallback
//!
//! Resolution runs in strict priority order and never raises. The
//! language-model classifier is consulted only when the deterministic
//! rules do not fire, and any classifier failure lands on the keyword
//! fallback as a visible branch.

use crate::config::TopicsConfig;
use crate::llm::{ChatModel, ChatRequest};
use crate::metrics::METRICS;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const CLASSIFY_MAX_TOKENS: u32 = 30;

/// Question intent
///
/// The topic is structurally non-null for regulatory queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    ChitChat,
    RbiQuery { topic: String },
}

impl Intent {
    /// Wire name of the intent
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::ChitChat => "chit_chat",
            Intent::RbiQuery { .. } => "rbi_query",
        }
    }
}

/// Outcome of one classifier consultation
///
/// Fallback is an expected result, not an exception: malformed output,
/// missing fields and transport failures all land here with a reason.
#[derive(Debug)]
enum ClassifierOutcome {
    Parsed(Intent),
    Fallback { reason: String },
}

/// Two-field reply the classifier is instructed to produce
#[derive(Debug, Deserialize)]
struct ClassifierReply {
    intent: Option<String>,
    topic: Option<String>,
}

/// Maps free text to an intent and canonical topic
pub struct TopicResolver {
    topics: TopicsConfig,
    chat: Arc<dyn ChatModel>,
}

impl TopicResolver {
    pub fn new(topics: TopicsConfig, chat: Arc<dyn ChatModel>) -> Self {
        Self { topics, chat }
    }

    /// Resolve the question's intent; infallible
    pub async fn resolve(&self, question: &str) -> Intent {
        let normalized = question.to_lowercase();
        let normalized = normalized.trim();

        if self.is_greeting(normalized) {
            return Intent::ChitChat;
        }

        if self.has_domain_keyword(normalized) {
            return Intent::RbiQuery {
                topic: self.keyword_topic(normalized),
            };
        }

        match self.classify(question).await {
            ClassifierOutcome::Parsed(intent) => intent,
            ClassifierOutcome::Fallback { reason } => {
                warn!("Intent classifier fallback: {}", reason);
                METRICS
                    .intent_fallbacks
                    .with_label_values(&[fallback_label(&reason)])
                    .inc();
                Intent::RbiQuery {
                    topic: self.keyword_topic(normalized),
                }
            }
        }
    }

    /// Keyword-table topic for a lowercased question
    ///
    /// Rules are scanned in configuration order; the first intersecting
    /// rule wins, else the default topic.
    pub fn keyword_topic(&self, normalized_question: &str) -> String {
        for rule in &self.topics.rules {
            if rule
                .keywords
                .iter()
                .any(|keyword| normalized_question.contains(keyword.as_str()))
            {
                return rule.key.clone();
            }
        }
        self.topics.default_topic.clone()
    }

    fn is_greeting(&self, normalized_question: &str) -> bool {
        self.topics.greetings.iter().any(|greeting| {
            normalized_question == greeting
                || normalized_question.starts_with(&format!("{} ", greeting))
        })
    }

    fn has_domain_keyword(&self, normalized_question: &str) -> bool {
        self.topics
            .domain_keywords
            .iter()
            .any(|keyword| normalized_question.contains(keyword.as_str()))
    }

    async fn classify(&self, question: &str) -> ClassifierOutcome {
        let prompt = format!(
            "Return ONLY valid JSON:\n\
             {{\"intent\":\"chit_chat\",\"topic\":null}} OR {{\"intent\":\"rbi_query\",\"topic\":\"DLG_Cap\"}}\n\n\
             User message:\n{}",
            question
        );

        let request = ChatRequest {
            system: None,
            user: prompt,
            temperature: 0.0,
            max_tokens: Some(CLASSIFY_MAX_TOKENS),
            operation: "classify",
        };

        let raw = match self.chat.complete(request).await {
            Ok(raw) => raw,
            Err(e) => {
                return ClassifierOutcome::Fallback {
                    reason: format!("llm_error: {}", e),
                }
            }
        };

        debug!("Classifier raw reply: {}", raw);
        self.parse_reply(&raw)
    }

    /// Lenient parse: the first `{` through the last `}` is treated as the
    /// JSON object, anything around it is ignored.
    fn parse_reply(&self, raw: &str) -> ClassifierOutcome {
        let Some(start) = raw.find('{') else {
            return ClassifierOutcome::Fallback {
                reason: "malformed: no JSON object in reply".to_string(),
            };
        };
        let Some(end) = raw.rfind('}') else {
            return ClassifierOutcome::Fallback {
                reason: "malformed: unterminated JSON object".to_string(),
            };
        };

        let reply: ClassifierReply = match serde_json::from_str(&raw[start..=end]) {
            Ok(reply) => reply,
            Err(e) => {
                return ClassifierOutcome::Fallback {
                    reason: format!("malformed: {}", e),
                }
            }
        };

        match (reply.intent.as_deref(), reply.topic) {
            (Some("chit_chat"), _) => ClassifierOutcome::Parsed(Intent::ChitChat),
            (Some("rbi_query"), Some(topic)) if !topic.is_empty() => {
                ClassifierOutcome::Parsed(Intent::RbiQuery { topic })
            }
            (Some("rbi_query"), _) => ClassifierOutcome::Fallback {
                reason: "missing_fields: rbi_query without topic".to_string(),
            },
            (Some(other), _) => ClassifierOutcome::Fallback {
                reason: format!("missing_fields: unknown intent {:?}", other),
            },
            (None, _) => ClassifierOutcome::Fallback {
                reason: "missing_fields: no intent".to_string(),
            },
        }
    }
}

fn fallback_label(reason: &str) -> &'static str {
    if reason.starts_with("llm_error") {
        "llm_error"
    } else if reason.starts_with("malformed") {
        "malformed"
    } else {
        "missing_fields"
    }
}
