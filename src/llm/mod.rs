//! Language-model collaborator

pub mod client;

pub use client::{ChatCompletionsClient, ChatModel, ChatRequest, LlmError};
