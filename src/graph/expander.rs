//! Topic expansion over the knowledge graph

use super::client::{GraphError, GraphStore, TopicLookup};
use super::models::Fact;
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::debug;

const TOPIC_PREFIX: &str = "Topic::";
const CHUNK_PREFIX: &str = "Chunk::";
const CLAUSE_PREFIX: &str = "Clause::";

/// Expands a topic into related fragments and fragments into facts
///
/// Fragment identifiers cross this boundary without their kind prefix;
/// downstream consumers see a single namespace.
pub struct GraphExpander {
    store: Arc<dyn GraphStore>,
}

impl GraphExpander {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Fragment identifiers attached to the topic
    ///
    /// The direct-identifier lookup is tried first; topics created before
    /// node ids carried the canonical key are found by the meta scan.
    pub async fn related_fragments(&self, topic: &str) -> Result<Vec<String>> {
        let direct = TopicLookup::DirectId {
            node_id: format!("{}{}", TOPIC_PREFIX, topic),
        };
        let mut nodes = self.lookup(direct).await?;

        if nodes.is_empty() {
            debug!("Direct topic lookup empty for {}, scanning meta", topic);
            let scan = TopicLookup::MetaCanonical {
                canonical: topic.to_string(),
            };
            nodes = self.lookup(scan).await?;
        }

        Ok(nodes
            .into_iter()
            .filter_map(|id| strip_kind_prefix(&id))
            .collect())
    }

    /// Every outgoing relation triple from the given fragments
    ///
    /// Empty input returns an empty list without a collaborator round-trip.
    pub async fn facts_for(&self, fragment_ids: &[String]) -> Result<Vec<Fact>> {
        if fragment_ids.is_empty() {
            return Ok(Vec::new());
        }

        let node_ids: Vec<String> = fragment_ids
            .iter()
            .map(|id| format!("{}{}", CHUNK_PREFIX, id))
            .collect();

        let facts = self
            .store
            .outgoing_relations(&node_ids)
            .await
            .map_err(into_unavailable)?;

        Ok(facts
            .into_iter()
            .map(|mut fact| {
                if let Some(stripped) = strip_kind_prefix(&fact.source) {
                    fact.source = stripped;
                }
                fact
            })
            .collect())
    }

    async fn lookup(&self, lookup: TopicLookup) -> Result<Vec<String>> {
        self.store
            .topic_nodes(lookup)
            .await
            .map_err(into_unavailable)
    }
}

fn into_unavailable(e: GraphError) -> Error {
    Error::RetrievalUnavailable(e.to_string())
}

/// Strip the `Chunk::`/`Clause::` kind prefix from a node identifier
///
/// Identifiers of any other kind are dropped: only fragment nodes belong
/// in the candidate namespace.
fn strip_kind_prefix(id: &str) -> Option<String> {
    id.strip_prefix(CHUNK_PREFIX)
        .or_else(|| id.strip_prefix(CLAUSE_PREFIX))
        .map(str::to_string)
}
