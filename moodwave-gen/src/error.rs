//! Error types for moodwave-gen
//!
//! Generation failures are terminal for one queue slot only; the orchestrator
//! catches all of them at its boundary and reports them as events.

use thiserror::Error;

use crate::jobs::Provider;

/// Failure of one song generation job
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Submit request failed or was rejected
    #[error("{provider} submission failed: {message}")]
    Submission { provider: Provider, message: String },

    /// One status query failed (network or parse); costs one poll attempt
    #[error("{provider} status query failed: {message}")]
    StatusQuery { provider: Provider, message: String },

    /// Status never reached a terminal state within the attempt budget
    #[error("{provider} job {job_id} timed out after {attempts} status polls")]
    Timeout {
        provider: Provider,
        job_id: String,
        attempts: u32,
    },

    /// Backend reported the job as failed
    #[error("{provider} job {job_id} failed: {reason}")]
    ProviderReported {
        provider: Provider,
        job_id: String,
        reason: String,
    },

    /// Final artifact could not be stored locally
    #[error("Artifact persist failed: {0}")]
    ArtifactPersist(#[from] StoreError),
}

/// Lyrics text generation failure (non-fatal to generation)
#[derive(Debug, Error)]
pub enum LyricsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty lyrics response")]
    Empty,
}

/// Local artifact store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for moodwave-gen setup and CLI paths
#[derive(Debug, Error)]
pub enum Error {
    /// moodwave-common error
    #[error("Common error: {0}")]
    Common(#[from] moodwave_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Lyrics(#[from] LyricsError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for moodwave-gen
pub type Result<T> = std::result::Result<T, Error>;
