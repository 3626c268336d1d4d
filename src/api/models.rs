//! Request and response models for the inbound API

use crate::graph::Fact;
use crate::pipeline::FragmentPreview;
use serde::{Deserialize, Serialize};

/// Question submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub clear: bool,
}

/// Answer with the evidence that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub conversation_id: String,
    pub answer: String,
    pub chunks_used: Vec<FragmentPreview>,
    pub kg_facts: Vec<Fact>,
}

/// Readiness report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// API error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_request_optional_fields() {
        let request: AskRequest =
            serde_json::from_str(r#"{"question":"What is the DLG cap?"}"#).unwrap();
        assert_eq!(request.question, "What is the DLG cap?");
        assert!(request.conversation_id.is_none());
        assert!(!request.clear);
    }

    #[test]
    fn test_ask_response_shape() {
        let response = AskResponse {
            conversation_id: "conv-1".to_string(),
            answer: "The cap is 5%.".to_string(),
            chunks_used: vec![FragmentPreview {
                id: "c1".to_string(),
                preview: "text".to_string(),
            }],
            kg_facts: vec![Fact::new("c1", "pertainsTo", "Topic::DLG_Cap", "DLG Cap")],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["chunks_used"][0]["id"], "c1");
        assert_eq!(json["kg_facts"][0]["relation"], "pertainsTo");
    }
}
