//! Data models for the graph boundary

use serde::{Deserialize, Serialize};

/// A directed, typed relation triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub source: String,
    pub relation: String,
    pub target: String,
    pub label: String,
}

impl Fact {
    pub fn new(
        source: impl Into<String>,
        relation: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relation: relation.into(),
            target: target.into(),
            label: label.into(),
        }
    }
}

// Wire types for the Cypher transaction-commit endpoint

#[derive(Debug, Serialize)]
pub(crate) struct CypherRequest {
    pub statements: Vec<CypherStatement>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CypherStatement {
    pub statement: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CypherResponse {
    #[serde(default)]
    pub results: Vec<CypherResult>,
    #[serde(default)]
    pub errors: Vec<CypherServerError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CypherResult {
    #[serde(default)]
    pub data: Vec<CypherRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CypherRow {
    #[serde(default)]
    pub row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CypherServerError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fact_serialization() {
        let fact = Fact::new("c1", "pertainsTo", "Topic::DLG_Cap", "DLG Cap");
        let json = serde_json::to_string(&fact).unwrap();
        assert!(json.contains("\"relation\":\"pertainsTo\""));

        let back: Fact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fact);
    }

    #[test]
    fn test_cypher_response_parsing() {
        let json = r#"{
            "results": [{"columns":["a","b"],"data":[{"row":["x",1]}]}],
            "errors": []
        }"#;
        let response: CypherResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results.len(), 1);
        assert!(response.errors.is_empty());
        assert_eq!(response.results[0].data[0].row[0], "x");
    }

    #[test]
    fn test_cypher_error_parsing() {
        let json = r#"{"results":[],"errors":[{"code":"Neo.ClientError","message":"bad query"}]}"#;
        let response: CypherResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.errors[0].code, "Neo.ClientError");
    }
}
