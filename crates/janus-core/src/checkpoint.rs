//! Checkpoint manager: persists the last indexed height for crash recovery.
//!
//! The checkpoint is a single row holding the highest epoch whose sync delta
//! completed in full. On restart, the indexer resumes from it rather than
//! re-indexing from the floor height.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::IndexerError;
use crate::types::Epoch;

/// The persisted checkpoint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Last fully indexed epoch.
    pub height: Epoch,
    /// Unix timestamp of when this checkpoint was saved.
    pub updated_at: i64,
}

/// Trait for storing and loading the checkpoint row.
///
/// Implementations include `MemoryCheckpointStore`, and the `InMemoryStorage`,
/// `SqliteStorage` and `PostgresStorage` backends of `janus-storage`.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the checkpoint, or `None` if it was never written.
    async fn load_checkpoint(&self) -> Result<Option<Checkpoint>, IndexerError>;

    /// Save (upsert) the checkpoint.
    async fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<(), IndexerError>;
}

/// Manages checkpoint reads/writes for the indexer.
///
/// The manager is the only writer of the checkpoint and refuses any write
/// that would move it backwards.
pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
    floor_height: Epoch,
}

impl CheckpointManager {
    pub fn new(store: Arc<dyn CheckpointStore>, floor_height: Epoch) -> Self {
        Self {
            store,
            floor_height,
        }
    }

    /// The height a missing checkpoint is initialized to.
    pub fn floor_height(&self) -> Epoch {
        self.floor_height
    }

    /// Load the checkpoint height, creating the row at the floor height if absent.
    pub async fn load_or_init(&self) -> Result<Epoch, IndexerError> {
        if let Some(cp) = self.store.load_checkpoint().await? {
            return Ok(cp.height);
        }
        info!(height = self.floor_height, "no checkpoint found, initializing at floor height");
        self.store
            .save_checkpoint(Checkpoint {
                height: self.floor_height,
                updated_at: chrono::Utc::now().timestamp(),
            })
            .await?;
        Ok(self.floor_height)
    }

    /// Move the checkpoint to `height`.
    ///
    /// Fails without writing if `height` is below the stored checkpoint.
    pub async fn advance(&self, height: Epoch) -> Result<(), IndexerError> {
        let current = self.load_or_init().await?;
        if height < current {
            return Err(IndexerError::Other(format!(
                "refusing to move checkpoint backwards from {current} to {height}"
            )));
        }
        self.store
            .save_checkpoint(Checkpoint {
                height,
                updated_at: chrono::Utc::now().timestamp(),
            })
            .await?;
        debug!(from = current, to = height, "checkpoint advanced");
        Ok(())
    }
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

use std::sync::Mutex;

/// In-memory checkpoint store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    data: Mutex<Option<Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a checkpoint at `height`.
    pub fn at(height: Epoch) -> Self {
        Self {
            data: Mutex::new(Some(Checkpoint {
                height,
                updated_at: 0,
            })),
        }
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load_checkpoint(&self) -> Result<Option<Checkpoint>, IndexerError> {
        Ok(*self.data.lock().unwrap())
    }

    async fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<(), IndexerError> {
        *self.data.lock().unwrap() = Some(checkpoint);
        Ok(())
    }
}
