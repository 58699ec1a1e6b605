//! Batch sync engine: walks an epoch range and feeds every unique message
//! to a handler.
//!
//! # Windows
//! The inclusive range `[start, end]` is cut into consecutive windows of at
//! most `batch_size` epochs. Windows run one after another; inside a window
//! every epoch gets its own task:
//!
//! ```text
//! window [s, s+n-1]
//!   ├── epoch s     tipset → block messages → dedup → handler
//!   ├── epoch s+1   tipset → block messages → dedup → handler
//!   └── …
//! ```
//!
//! The first failing task aborts its siblings and the call returns the error
//! (wrapped with the epoch and block it came from). Later windows never start.
//! No ordering is guaranteed between epochs of a window or between messages
//! of an epoch.

use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::ops::{AddAssign, RangeInclusive};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::IndexerError;
use crate::gateway::NodeGateway;
use crate::handler::MessageHandler;
use crate::types::Epoch;

/// Default number of epochs per window.
pub const DEFAULT_BATCH_SIZE: Epoch = 1000;

/// Counters for one sync call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Epochs walked.
    pub epochs: u64,
    /// Blocks whose messages were fetched.
    pub blocks: u64,
    /// Messages handed to the handler.
    pub messages: u64,
    /// Messages skipped because an earlier block of the same tipset carried them.
    pub duplicates: u64,
    /// Highest epoch covered. Equals the clamped range end once a call succeeds.
    pub synced_to: Epoch,
}

impl AddAssign for SyncStats {
    fn add_assign(&mut self, rhs: Self) {
        self.epochs += rhs.epochs;
        self.blocks += rhs.blocks;
        self.messages += rhs.messages;
        self.duplicates += rhs.duplicates;
        self.synced_to = self.synced_to.max(rhs.synced_to);
    }
}

// ─── Windows ──────────────────────────────────────────────────────────────────

/// Iterator over consecutive inclusive windows covering `[start, end]`.
#[derive(Debug, Clone)]
pub struct Windows {
    next: Epoch,
    end: Epoch,
    size: Epoch,
}

/// Split `[start, end]` into windows of at most `size` epochs.
///
/// Yields nothing when `start > end`. A `size` below 1 is treated as 1.
pub fn windows(start: Epoch, end: Epoch, size: Epoch) -> Windows {
    Windows {
        next: start,
        end,
        size: size.max(1),
    }
}

impl Iterator for Windows {
    type Item = RangeInclusive<Epoch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.end {
            return None;
        }
        let start = self.next;
        let stop = start.saturating_add(self.size - 1).min(self.end);
        self.next = stop + 1;
        Some(start..=stop)
    }
}

// ─── BatchSync ────────────────────────────────────────────────────────────────

/// The batch sync engine. Holds no persistent state.
#[derive(Clone)]
pub struct BatchSync {
    gateway: Arc<dyn NodeGateway>,
    batch_size: Epoch,
    shutdown: Option<watch::Receiver<bool>>,
}

impl BatchSync {
    pub fn new(gateway: Arc<dyn NodeGateway>) -> Self {
        Self {
            gateway,
            batch_size: DEFAULT_BATCH_SIZE,
            shutdown: None,
        }
    }

    /// Set the maximum number of epochs per window.
    pub fn with_batch_size(mut self, batch_size: Epoch) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Stop before the next window once `shutdown` flips to `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn batch_size(&self) -> Epoch {
        self.batch_size
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Sync the inclusive range `[start, end]`, calling `handler` once per
    /// unique message per epoch.
    ///
    /// `end == 0` or an `end` beyond the current head is clamped to the head,
    /// which is queried once per call. The end actually used is reported in
    /// [`SyncStats::synced_to`].
    pub async fn sync_range(
        &self,
        start: Epoch,
        end: Epoch,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<SyncStats, IndexerError> {
        if start < 0 {
            return Err(IndexerError::InvalidRange { start, end });
        }

        let head = self.gateway.head_height().await?;
        info!(height = head, "chain head height");

        let end = if end == 0 || end > head { head } else { end };
        if start > end {
            return Err(IndexerError::InvalidRange { start, end });
        }

        info!(start, end, batch_size = self.batch_size, "start syncing");

        let mut stats = SyncStats::default();
        for window in windows(start, end, self.batch_size) {
            if self.shutdown_requested() {
                info!(next = *window.start(), "shutdown requested, stopping before window");
                return Err(IndexerError::Cancelled);
            }
            let (from, to) = (*window.start(), *window.end());
            let window_stats = self.sync_window(window, &handler).await?;
            info!(
                from,
                to,
                blocks = window_stats.blocks,
                messages = window_stats.messages,
                "window synced"
            );
            stats += window_stats;
        }

        stats.synced_to = end;
        Ok(stats)
    }

    async fn sync_window(
        &self,
        window: RangeInclusive<Epoch>,
        handler: &Arc<dyn MessageHandler>,
    ) -> Result<SyncStats, IndexerError> {
        let mut tasks = JoinSet::new();
        let mut epochs = HashMap::new();
        for epoch in window {
            let gateway = Arc::clone(&self.gateway);
            let handler = Arc::clone(handler);
            let task = tasks.spawn(async move {
                sync_epoch(gateway.as_ref(), epoch, handler.as_ref())
                    .await
                    .map_err(|e| e.at_epoch(epoch))
            });
            epochs.insert(task.id(), epoch);
        }

        let mut stats = SyncStats::default();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Ok(epoch_stats))) => stats += epoch_stats,
                Ok((_, Err(e))) => {
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    tasks.abort_all();
                    let err = IndexerError::Other(format!("epoch task failed: {e}"));
                    return Err(match epochs.get(&e.id()) {
                        Some(&epoch) => err.at_epoch(epoch),
                        None => err,
                    });
                }
            }
        }
        Ok(stats)
    }
}

/// Fetch one tipset and dispatch its unique messages.
///
/// Blocks are walked in tipset order so a duplicated message is attributed to
/// the first block carrying it.
async fn sync_epoch(
    gateway: &dyn NodeGateway,
    epoch: Epoch,
    handler: &dyn MessageHandler,
) -> Result<SyncStats, IndexerError> {
    let blocks = gateway.tipset(epoch).await?;

    let fetched = try_join_all(blocks.iter().map(|block| async move {
        gateway
            .block_messages(&block.cid)
            .await
            .map_err(|e| e.at_block(block.cid.as_str()))
    }))
    .await?;

    let mut stats = SyncStats {
        epochs: 1,
        blocks: blocks.len() as u64,
        synced_to: epoch,
        ..Default::default()
    };
    let mut seen: HashSet<String> = HashSet::new();

    for (block, messages) in blocks.iter().zip(fetched) {
        for msg in messages {
            if !seen.insert(msg.cid.clone()) {
                stats.duplicates += 1;
                continue;
            }
            handler
                .handle(block, &msg)
                .await
                .map_err(|e| e.at_block(block.cid.as_str()))?;
            stats.messages += 1;
        }
    }

    debug!(epoch, blocks = stats.blocks, messages = stats.messages, "epoch synced");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(start: Epoch, end: Epoch, size: Epoch) -> Vec<(Epoch, Epoch)> {
        windows(start, end, size)
            .map(|w| (*w.start(), *w.end()))
            .collect()
    }

    #[test]
    fn windows_cover_range_without_gaps() {
        assert_eq!(collect(1, 2500, 1000), vec![(1, 1000), (1001, 2000), (2001, 2500)]);
        assert_eq!(collect(5, 5, 1000), vec![(5, 5)]);
        assert_eq!(collect(0, 9, 5), vec![(0, 4), (5, 9)]);
    }

    #[test]
    fn windows_empty_when_start_after_end() {
        assert!(collect(10, 9, 1000).is_empty());
    }

    #[test]
    fn windows_size_floor_is_one() {
        assert_eq!(collect(3, 5, 0), vec![(3, 3), (4, 4), (5, 5)]);
    }

    #[test]
    fn stats_accumulate() {
        let mut total = SyncStats::default();
        total += SyncStats { epochs: 1, blocks: 2, messages: 3, duplicates: 1, synced_to: 9 };
        total += SyncStats { epochs: 1, blocks: 1, messages: 0, duplicates: 0, synced_to: 4 };
        assert_eq!(
            total,
            SyncStats { epochs: 2, blocks: 3, messages: 3, duplicates: 1, synced_to: 9 }
        );
    }
}
