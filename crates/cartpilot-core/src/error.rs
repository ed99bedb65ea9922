//! Error types for the core crate

use cartpilot_storage::CipherError;
use thiserror::Error;

/// Config service failures. The client logs these and degrades to empty
/// or absent results.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("Failed to decrypt body: {0}")]
    Decrypt(#[from] CipherError),

    #[error("Failed to decode body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Failures of operations that cross the bridge.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Script environment error: {0}")]
    Environment(#[source] anyhow::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("No acknowledgement for {correlation_id} within {timeout_ms} ms")]
    AckTimeout {
        correlation_id: String,
        timeout_ms: u64,
    },

    #[error("Acknowledgement channel for {0} was dropped")]
    AckDropped(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
