//! Client error types

use thiserror::Error;

use crate::engine::EngineError;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Validation and registry failures from shroud-core
    #[error(transparent)]
    Core(#[from] shroud_core::Error),

    #[error("No gateway endpoint configured for {network}")]
    MissingGatewayEndpoint { network: String },

    #[error("Invalid gateway URL {url}: {reason}")]
    InvalidGatewayUrl { url: String, reason: String },

    #[error("Failed to fetch public key from {url}: {reason}")]
    PublicKeyFetchFailed { url: String, reason: String },

    #[error("Engine rejected configuration: {0}")]
    EngineInitFailed(EngineError),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(EngineError),

    #[error("Input builder already finalized")]
    BuilderAlreadyFinalized,

    #[error("Engine rejected empty input batch")]
    EmptyBatchRejected,

    #[error("Decryption {request_id} timed out after {elapsed_ms}ms")]
    DecryptionTimeout { request_id: String, elapsed_ms: u64 },

    #[error("Decryption {request_id} rejected: {reason}")]
    DecryptionRejected { request_id: String, reason: String },

    #[error("Decryption {request_id} returned an unusable plaintext: {reason}")]
    InvalidPlaintext { request_id: String, reason: String },

    #[error("Chain id mismatch: profile expects {expected}, connection reports {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("Chain connection error: {0}")]
    Chain(String),

    #[error("Gateway returned status {status} for {url}")]
    GatewayStatus { status: u16, url: String },

    #[error("Engine task failed: {0}")]
    EngineTask(#[from] tokio::task::JoinError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether retrying the same call can succeed
    ///
    /// Only builder reuse is caller misuse; everything else may clear up on a
    /// later attempt or with corrected input.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ClientError::BuilderAlreadyFinalized)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
