//! Transport-level error types.

use thiserror::Error;

use janus_core::IndexerError;

use crate::request::JsonRpcError;

/// Errors that can occur while talking to a Lotus node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, 5xx, …).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC error object returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Request timed out after the configured duration.
    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Response was well-formed JSON but not the shape Lotus documents.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Returns `true` if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout { .. })
    }
}

impl From<TransportError> for IndexerError {
    fn from(e: TransportError) -> Self {
        IndexerError::Gateway(e.to_string())
    }
}
