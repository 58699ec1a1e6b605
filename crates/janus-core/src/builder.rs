//! Fluent builder API for creating indexers.
//!
//! # Example
//!
//! ```rust,no_run
//! use janus_core::IndexerBuilder;
//!
//! let config = IndexerBuilder::new()
//!     .floor_height(5_200_000)
//!     .confirmation_depth(20)
//!     .batch_size(500)
//!     .interval_secs(30)
//!     .build_config();
//! ```

use std::sync::Arc;

use crate::checkpoint::CheckpointStore;
use crate::error::IndexerError;
use crate::gateway::NodeGateway;
use crate::handler::MessageHandler;
use crate::indexer::{Indexer, IndexerConfig};
use crate::types::Epoch;

/// Fluent builder for [`IndexerConfig`] and [`Indexer`].
#[derive(Default)]
pub struct IndexerBuilder {
    config: IndexerConfig,
}

impl IndexerBuilder {
    pub fn new() -> Self {
        Self {
            config: IndexerConfig::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: IndexerConfig) -> Self {
        Self { config }
    }

    /// Set the height a missing checkpoint is initialized to.
    pub fn floor_height(mut self, height: Epoch) -> Self {
        self.config.floor_height = height;
        self
    }

    /// Set confirmation depth (epochs behind head before indexing).
    pub fn confirmation_depth(mut self, depth: Epoch) -> Self {
        self.config.confirmation_depth = depth;
        self
    }

    /// Set the number of epochs per sync window.
    pub fn batch_size(mut self, size: Epoch) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the cycle interval in seconds.
    pub fn interval_secs(mut self, secs: u64) -> Self {
        self.config.interval_secs = secs;
        self
    }

    /// Build the `IndexerConfig`.
    pub fn build_config(self) -> IndexerConfig {
        self.config
    }

    /// Validate the configuration and build an [`Indexer`].
    pub fn build(
        self,
        gateway: Arc<dyn NodeGateway>,
        checkpoints: Arc<dyn CheckpointStore>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Indexer, IndexerError> {
        Indexer::new(self.config, gateway, checkpoints, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use crate::gateway::MemoryGateway;
    use crate::handler::HandlerSet;

    #[test]
    fn builder_defaults() {
        let cfg = IndexerBuilder::new().build_config();
        assert_eq!(cfg.confirmation_depth, 20);
        assert_eq!(cfg.batch_size, 1000);
        assert_eq!(cfg.interval_secs, 10);
    }

    #[test]
    fn builder_custom() {
        let cfg = IndexerBuilder::new()
            .floor_height(100)
            .confirmation_depth(5)
            .batch_size(50)
            .interval_secs(2)
            .build_config();

        assert_eq!(cfg.floor_height, 100);
        assert_eq!(cfg.confirmation_depth, 5);
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.interval_secs, 2);
    }

    #[test]
    fn build_rejects_invalid_config() {
        let result = IndexerBuilder::new().batch_size(0).build(
            Arc::new(MemoryGateway::new(0)),
            Arc::new(MemoryCheckpointStore::new()),
            Arc::new(HandlerSet::new()),
        );
        assert!(matches!(result, Err(IndexerError::Config(_))));
    }
}
