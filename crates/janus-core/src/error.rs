//! Error types for the janus sync pipeline.

use thiserror::Error;

use crate::types::Epoch;

/// Errors that can occur while syncing or indexing.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("invalid epoch range: start {start}, end {end}")]
    InvalidRange { start: Epoch, end: Epoch },

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("handler error in '{handler}': {reason}")]
    Handler { handler: String, reason: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("epoch {epoch}: {source}")]
    AtEpoch {
        epoch: Epoch,
        #[source]
        source: Box<IndexerError>,
    },

    #[error("block {cid}: {source}")]
    AtBlock {
        cid: String,
        #[source]
        source: Box<IndexerError>,
    },

    #[error("chain head fell below planned end {planned}; synced only to {synced}")]
    HeadRegressed { planned: Epoch, synced: Epoch },

    #[error("sync cancelled by shutdown")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    /// Wrap this error with the epoch it occurred at.
    pub fn at_epoch(self, epoch: Epoch) -> Self {
        Self::AtEpoch {
            epoch,
            source: Box::new(self),
        }
    }

    /// Wrap this error with the block it occurred in.
    pub fn at_block(self, cid: impl Into<String>) -> Self {
        Self::AtBlock {
            cid: cid.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with epoch/block context stripped.
    pub fn root(&self) -> &IndexerError {
        match self {
            Self::AtEpoch { source, .. } | Self::AtBlock { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns `true` if re-running the same range may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self.root(),
            Self::InvalidRange { .. } | Self::Config(_)
        )
    }

    /// The epoch this error was attributed to, if any.
    pub fn epoch(&self) -> Option<Epoch> {
        match self {
            Self::AtEpoch { epoch, .. } => Some(*epoch),
            Self::AtBlock { source, .. } => source.epoch(),
            _ => None,
        }
    }
}
