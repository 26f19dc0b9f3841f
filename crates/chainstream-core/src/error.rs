//! Error types for deferred chains

use thiserror::Error;

/// Chain error types
#[derive(Error, Debug)]
pub enum ChainError {
    /// The consumer dropped the outstanding handle.
    #[error("consumer detached from the chain")]
    Detached,

    /// The producer went away without marking the end of the chain.
    #[error("producer abandoned the chain before it ended")]
    Abandoned,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream responded with status {0}")]
    UpstreamStatus(u16),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for chain operations
pub type Result<T> = std::result::Result<T, ChainError>;
