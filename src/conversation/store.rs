//! Bounded conversation store
//!
//! Keeps the single most recent answer per conversation identifier.
//! Records expire after a TTL and the map is capped, so the store cannot
//! grow without bound. Concurrent writes to the same identifier are
//! last-write-wins; identifiers are expected to belong to one client
//! session at a time.

use crate::config::ConversationConfig;
use moka::sync::Cache;

/// Map from conversation identifier to the last produced answer
pub struct ConversationStore {
    cache: Cache<String, String>,
}

impl ConversationStore {
    /// Create a store bounded by the configured TTL and capacity
    pub fn new(config: &ConversationConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl())
            .build();

        Self { cache }
    }

    /// Last answer for the conversation, empty when unknown
    pub fn get(&self, conversation_id: &str) -> String {
        self.cache.get(conversation_id).unwrap_or_default()
    }

    /// Record the latest answer, overwriting any previous one
    pub fn set(&self, conversation_id: &str, answer: &str) {
        self.cache
            .insert(conversation_id.to_string(), answer.to_string());
    }

    /// Forget the conversation entirely
    pub fn clear(&self, conversation_id: &str) {
        self.cache.invalidate(conversation_id);
    }
}
