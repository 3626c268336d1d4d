//! Graph collaborator client over the Cypher transaction endpoint

use super::models::*;
use crate::config::GraphConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

/// Graph collaborator error types
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("graph unreachable: {0}")]
    Unreachable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Topic lookup strategy
///
/// Older topic records keep the canonical key only inside a `meta` JSON
/// string; newer ones carry it as the node identifier. Both are supported
/// behind this one enum, tried in order by the expander.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicLookup {
    /// Match the topic node by its identifier, e.g. `Topic::DLG_Cap`
    DirectId { node_id: String },
    /// Scan the embedded meta JSON for the canonical key
    MetaCanonical { canonical: String },
}

/// Seam for the graph collaborator
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Identifiers of chunk and clause nodes attached to the topic
    async fn topic_nodes(&self, lookup: TopicLookup) -> Result<Vec<String>, GraphError>;

    /// Every outgoing relation triple from the given nodes
    async fn outgoing_relations(&self, node_ids: &[String]) -> Result<Vec<Fact>, GraphError>;
}

/// Cypher-over-HTTP graph client
pub struct CypherGraphClient {
    http: Client,
    config: GraphConfig,
}

impl CypherGraphClient {
    /// Create a new graph client
    pub fn new(config: GraphConfig) -> Result<Self, GraphError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GraphError::Unreachable(e.to_string()))?;

        Ok(Self { http, config })
    }

    fn commit_url(&self) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.config.base_url, self.config.database
        )
    }

    async fn run_statement(
        &self,
        statement: String,
        parameters: serde_json::Value,
    ) -> Result<Vec<CypherRow>, GraphError> {
        let request = CypherRequest {
            statements: vec![CypherStatement {
                statement,
                parameters,
            }],
        };

        let mut req = self.http.post(self.commit_url()).json(&request);
        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            req = req.basic_auth(user, Some(pass));
        }

        let response = req
            .send()
            .await
            .map_err(|e| GraphError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GraphError::Query(format!(
                "Status {}: {}",
                status, error_text
            )));
        }

        let payload: CypherResponse = response
            .json()
            .await
            .map_err(|e| GraphError::InvalidResponse(e.to_string()))?;

        if let Some(error) = payload.errors.first() {
            return Err(GraphError::Query(format!(
                "{}: {}",
                error.code, error.message
            )));
        }

        let result = payload
            .results
            .into_iter()
            .next()
            .ok_or_else(|| GraphError::InvalidResponse("no result set".to_string()))?;

        Ok(result.data)
    }
}

#[async_trait]
impl GraphStore for CypherGraphClient {
    async fn topic_nodes(&self, lookup: TopicLookup) -> Result<Vec<String>, GraphError> {
        let (statement, parameters) = match &lookup {
            TopicLookup::DirectId { node_id } => (
                "MATCH (t:Topic {id: $tid}) \
                 OPTIONAL MATCH (c:Chunk)-[:pertainsTo]->(t) \
                 OPTIONAL MATCH (cl:Clause)-[:pertainsTo]->(t) \
                 RETURN collect(DISTINCT c.id) + collect(DISTINCT cl.id) AS nodes"
                    .to_string(),
                json!({ "tid": node_id }),
            ),
            TopicLookup::MetaCanonical { canonical } => (
                "MATCH (t:Topic) WHERE t.meta CONTAINS $needle \
                 OPTIONAL MATCH (c:Chunk)-[:pertainsTo]->(t) \
                 OPTIONAL MATCH (cl:Clause)-[:pertainsTo]->(t) \
                 RETURN collect(DISTINCT c.id) + collect(DISTINCT cl.id) AS nodes"
                    .to_string(),
                json!({ "needle": format!("\"canonical\": \"{}\"", canonical) }),
            ),
        };

        debug!("Graph topic lookup: {:?}", lookup);

        let rows = self.run_statement(statement, parameters).await?;

        let mut nodes = Vec::new();
        for row in rows {
            let cell = row
                .row
                .into_iter()
                .next()
                .ok_or_else(|| GraphError::InvalidResponse("empty row".to_string()))?;
            let ids = cell
                .as_array()
                .ok_or_else(|| GraphError::InvalidResponse("nodes column is not a list".to_string()))?;
            for id in ids {
                // Nulls come from the OPTIONAL MATCH arms with no match.
                if let Some(id) = id.as_str() {
                    nodes.push(id.to_string());
                }
            }
        }

        Ok(nodes)
    }

    async fn outgoing_relations(&self, node_ids: &[String]) -> Result<Vec<Fact>, GraphError> {
        let statement = "UNWIND $ids AS nid \
                         MATCH (n {id: nid})-[r]->(x) \
                         RETURN nid AS source, type(r) AS relation, x.id AS target, x.label AS label"
            .to_string();

        debug!("Graph relation expansion for {} nodes", node_ids.len());

        let rows = self
            .run_statement(statement, json!({ "ids": node_ids }))
            .await?;

        let mut facts = Vec::with_capacity(rows.len());
        for row in rows {
            if row.row.len() != 4 {
                return Err(GraphError::InvalidResponse(format!(
                    "expected 4 columns, got {}",
                    row.row.len()
                )));
            }

            let source = row.row[0].as_str().unwrap_or_default().to_string();
            let relation = row.row[1].as_str().unwrap_or_default().to_string();
            let target = row.row[2].as_str().unwrap_or_default().to_string();
            // Nodes without a display label fall back to their identifier.
            let label = row.row[3]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| target.clone());

            facts.push(Fact {
                source,
                relation,
                target,
                label,
            });
        }

        Ok(facts)
    }
}
