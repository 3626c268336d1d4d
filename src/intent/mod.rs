//! Intent classification and topic resolution

pub mod resolver;

pub use resolver::{Intent, TopicResolver};
