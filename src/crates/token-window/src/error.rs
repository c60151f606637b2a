//! Error types for token-window operations
//!
//! Every failure a caller can see while loading or trimming the window is a
//! [`MemoryError`]. Collaborators report their own narrower errors
//! ([`CountError`] from a token counter, [`HistoryError`] from a chat history
//! store) and the window wraps them without retrying.
//!
//! ```text
//! MemoryError
//! ├── TokenCount          - the token counter failed or answered inconsistently
//! ├── HistoryUnavailable  - the chat history store could not be read or written
//! ├── Configuration       - invalid budget, missing pending input, bad keys
//! └── Serialization       - messages could not be published as JSON
//! ```

use thiserror::Error;

/// Result type for window operations
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Errors surfaced by the message window
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Token counting failed; no eviction was applied
    #[error("Token count error: {0}")]
    TokenCount(#[source] CountError),

    /// The chat history store failed
    #[error("Chat history unavailable: {0}")]
    HistoryUnavailable(#[source] HistoryError),

    /// Invalid configuration or invocation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Window contents could not be converted to memory variables
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MemoryError {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<CountError> for MemoryError {
    fn from(err: CountError) -> Self {
        Self::TokenCount(err)
    }
}

impl From<HistoryError> for MemoryError {
    fn from(err: HistoryError) -> Self {
        Self::HistoryUnavailable(err)
    }
}

/// Errors reported by a [`TokenCounter`](crate::TokenCounter)
#[derive(Error, Debug)]
pub enum CountError {
    /// Tokenizer could not be loaded for the requested model
    #[error("Tokenizer unavailable for model {model}: {reason}")]
    Tokenizer { model: String, reason: String },

    /// Counter answered with a per-message vector of the wrong length
    #[error("Counter returned {got} per-message counts for {expected} messages")]
    LengthMismatch { expected: usize, got: usize },

    /// Remote counting backend failed
    #[error("Counting backend error: {0}")]
    Backend(String),
}

/// Errors reported by a [`ChatHistoryStore`](crate::ChatHistoryStore)
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Backend storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored messages could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
