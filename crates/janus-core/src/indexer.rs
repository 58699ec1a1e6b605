//! The checkpointed indexer: a timer loop that syncs every newly final
//! epoch range and advances the checkpoint once the whole range succeeded.
//!
//! # Cycle
//! ```text
//! checkpoint h ─┐
//! head ─────────┼─► safe_head = head - confirmation_depth
//!               │   h >= safe_head ? idle
//!               └─► BatchSync [h+1, safe_head] ─ ok ─► checkpoint = safe_head
//!                                              └ err ─► log, retry next tick
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::checkpoint::{CheckpointManager, CheckpointStore};
use crate::cursor::Cursor;
use crate::error::IndexerError;
use crate::gateway::NodeGateway;
use crate::handler::MessageHandler;
use crate::sync::{BatchSync, SyncStats, DEFAULT_BATCH_SIZE};
use crate::types::Epoch;

/// Epoch below which no miner-creation activity is expected.
pub const DEFAULT_FLOOR_HEIGHT: Epoch = 5_200_000;

/// Epochs to stay behind the head.
pub const DEFAULT_CONFIRMATION_DEPTH: Epoch = 20;

/// Configuration for an indexer instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Checkpoint height used when no checkpoint has been stored yet.
    pub floor_height: Epoch,
    /// Number of epochs behind the head before an epoch is considered final.
    pub confirmation_depth: Epoch,
    /// Maximum epochs per sync window.
    pub batch_size: Epoch,
    /// Seconds between cycles.
    pub interval_secs: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            floor_height: DEFAULT_FLOOR_HEIGHT,
            confirmation_depth: DEFAULT_CONFIRMATION_DEPTH,
            batch_size: DEFAULT_BATCH_SIZE,
            interval_secs: 10,
        }
    }
}

impl IndexerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Reject values the indexer cannot run with.
    pub fn validate(&self) -> Result<(), IndexerError> {
        if self.floor_height < 0 {
            return Err(IndexerError::Config("floor_height must be >= 0".into()));
        }
        if self.confirmation_depth < 0 {
            return Err(IndexerError::Config("confirmation_depth must be >= 0".into()));
        }
        if self.batch_size < 1 {
            return Err(IndexerError::Config("batch_size must be >= 1".into()));
        }
        if self.interval_secs == 0 {
            return Err(IndexerError::Config("interval_secs must be >= 1".into()));
        }
        Ok(())
    }
}

/// Runtime state of the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexerState {
    /// Waiting for the next tick.
    Idle,
    /// One cycle in flight.
    Syncing,
    /// Terminated after shutdown.
    Stopped,
}

impl std::fmt::Display for IndexerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Syncing => write!(f, "syncing"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing final left to index.
    UpToDate { checkpoint: Epoch, safe_head: Epoch },
    /// `[from, to]` was synced and the checkpoint moved to `to`.
    Advanced { from: Epoch, to: Epoch, stats: SyncStats },
}

/// The checkpointed indexer.
pub struct Indexer {
    config: IndexerConfig,
    gateway: Arc<dyn NodeGateway>,
    engine: BatchSync,
    checkpoint: CheckpointManager,
    handler: Arc<dyn MessageHandler>,
    state: IndexerState,
}

impl Indexer {
    pub fn new(
        config: IndexerConfig,
        gateway: Arc<dyn NodeGateway>,
        checkpoints: Arc<dyn CheckpointStore>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self, IndexerError> {
        config.validate()?;
        Ok(Self {
            engine: BatchSync::new(Arc::clone(&gateway)).with_batch_size(config.batch_size),
            checkpoint: CheckpointManager::new(checkpoints, config.floor_height),
            gateway,
            handler,
            state: IndexerState::Idle,
            config,
        })
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn state(&self) -> IndexerState {
        self.state
    }

    /// Run cycles on a fixed interval until `shutdown` becomes `true`.
    ///
    /// Cycle errors are logged and retried on the next tick. Only failing to
    /// read or create the checkpoint at startup is returned. Shutdown never
    /// interrupts an in-flight window; a cycle observing it between windows
    /// ends without touching the checkpoint.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), IndexerError> {
        let start = self.checkpoint.load_or_init().await?;
        info!(
            checkpoint = start,
            confirmation_depth = self.config.confirmation_depth,
            interval_secs = self.config.interval_secs,
            "indexer started"
        );

        self.engine = self.engine.clone().with_shutdown(shutdown.clone());

        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            self.state = IndexerState::Syncing;
            match self.run_cycle().await {
                Ok(CycleOutcome::UpToDate { checkpoint, safe_head }) => {
                    debug!(checkpoint, safe_head, "no new final epochs");
                }
                Ok(CycleOutcome::Advanced { from, to, stats }) => {
                    info!(
                        from,
                        to,
                        blocks = stats.blocks,
                        messages = stats.messages,
                        "checkpoint advanced"
                    );
                }
                Err(IndexerError::Cancelled) => {
                    info!("cycle interrupted by shutdown, checkpoint unchanged");
                }
                Err(e) => {
                    error!(error = %e, "indexer sync error");
                }
            }
            self.state = IndexerState::Idle;
        }

        self.state = IndexerState::Stopped;
        info!("indexer stopped");
        Ok(())
    }

    /// Run a single cycle: sync everything between the checkpoint and the
    /// safe head, then move the checkpoint to the safe head.
    ///
    /// If the head drops below the safe head while the range is synced, the
    /// cycle fails with [`IndexerError::HeadRegressed`] and the checkpoint
    /// stays where it was.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, IndexerError> {
        let height = self.checkpoint.load_or_init().await?;
        let head = self.gateway.head_height().await?;
        let cursor = Cursor::new(height, self.config.confirmation_depth);

        let Some(range) = cursor.next_range(head) else {
            return Ok(CycleOutcome::UpToDate {
                checkpoint: height,
                safe_head: cursor.safe_head(head),
            });
        };
        let (from, to) = (*range.start(), *range.end());
        info!(from, to, head, lag = cursor.lag(head), "syncing delta");

        let stats = self
            .engine
            .sync_range(from, to, Arc::clone(&self.handler))
            .await?;
        // The engine clamps to its own head query, which may be lower than ours.
        if stats.synced_to < to {
            return Err(IndexerError::HeadRegressed {
                planned: to,
                synced: stats.synced_to,
            });
        }
        self.checkpoint.advance(to).await?;

        Ok(CycleOutcome::Advanced { from, to, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let cfg = IndexerConfig::default();
        assert_eq!(cfg.floor_height, 5_200_000);
        assert_eq!(cfg.confirmation_depth, 20);
        assert_eq!(cfg.batch_size, 1000);
        assert_eq!(cfg.interval(), Duration::from_secs(10));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_validation() {
        let bad = [
            IndexerConfig { batch_size: 0, ..Default::default() },
            IndexerConfig { interval_secs: 0, ..Default::default() },
            IndexerConfig { floor_height: -1, ..Default::default() },
            IndexerConfig { confirmation_depth: -5, ..Default::default() },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(IndexerError::Config(_))), "{cfg:?}");
        }
    }

    #[test]
    fn config_partial_deserialize() {
        let cfg: IndexerConfig = serde_json::from_str(r#"{"interval_secs": 30}"#).unwrap();
        assert_eq!(cfg.interval_secs, 30);
        assert_eq!(cfg.confirmation_depth, 20);
    }
}
