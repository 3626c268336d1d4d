//! Knowledge-graph collaborator and expansion

pub mod client;
pub mod expander;
pub mod models;

pub use client::{CypherGraphClient, GraphError, GraphStore, TopicLookup};
pub use expander::GraphExpander;
pub use models::Fact;
