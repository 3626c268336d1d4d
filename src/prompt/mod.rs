//! Evidence prompt assembly

pub mod builder;

pub use builder::{PromptAssembler, ANSWER_SYSTEM_PROMPT};
