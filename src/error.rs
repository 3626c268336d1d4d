//! Crate-level error types

use thiserror::Error;

/// Result alias used throughout the pipeline
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error taxonomy
///
/// Collaborator failures that can be degraded locally (graph store,
/// embedding store, classifier calls) never reach this type from the
/// request path; they are handled where they occur. What remains is
/// either a client input error or a failure with no substitute.
#[derive(Debug, Error)]
pub enum Error {
    #[error("question cannot be empty")]
    EmptyQuestion,

    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("language model failure: {0}")]
    LanguageModel(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the error is caused by bad client input
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::EmptyQuestion)
    }
}
