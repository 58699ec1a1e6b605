//! The node gateway seam: everything the sync engine needs from a chain node.

use async_trait::async_trait;

use crate::error::IndexerError;
use crate::types::{BlockMeta, Epoch, Message};

/// Read-only access to a chain node.
///
/// Implementations must be `Send + Sync`; the sync engine shares one gateway
/// across all epoch tasks of a window. Every call may fail with
/// [`IndexerError::Gateway`], which the engine propagates without retrying.
#[async_trait]
pub trait NodeGateway: Send + Sync + 'static {
    /// Current chain head height.
    async fn head_height(&self) -> Result<Epoch, IndexerError>;

    /// Blocks of the tipset at `epoch`, in tipset order.
    ///
    /// A null round returns an empty list.
    async fn tipset(&self, epoch: Epoch) -> Result<Vec<BlockMeta>, IndexerError>;

    /// All messages included in the block identified by `cid`.
    async fn block_messages(&self, cid: &str) -> Result<Vec<Message>, IndexerError>;
}

// ─── In-memory gateway (for testing) ─────────────────────────────────────────

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// A scripted chain held in memory.
///
/// Epochs without blocks behave as null rounds. Failures can be injected per
/// epoch (tipset lookup) or per block (message lookup).
#[derive(Default)]
pub struct MemoryGateway {
    head: Mutex<Epoch>,
    tipsets: Mutex<HashMap<Epoch, Vec<BlockMeta>>>,
    messages: Mutex<HashMap<String, Vec<Message>>>,
    failing_epochs: Mutex<HashSet<Epoch>>,
    failing_blocks: Mutex<HashSet<String>>,
    tipset_calls: AtomicU64,
}

impl MemoryGateway {
    pub fn new(head: Epoch) -> Self {
        Self {
            head: Mutex::new(head),
            ..Default::default()
        }
    }

    /// Move the chain head.
    pub fn set_head(&self, head: Epoch) {
        *self.head.lock().unwrap() = head;
    }

    /// Append a block carrying `messages` to the tipset at `epoch`.
    pub fn push_block(&self, epoch: Epoch, cid: impl Into<String>, messages: Vec<Message>) {
        let cid = cid.into();
        let block = BlockMeta {
            height: epoch,
            cid: cid.clone(),
            timestamp: 1_598_306_400 + epoch * 30,
        };
        self.tipsets.lock().unwrap().entry(epoch).or_default().push(block);
        self.messages.lock().unwrap().insert(cid, messages);
    }

    /// Make tipset lookups at `epoch` fail.
    pub fn fail_epoch(&self, epoch: Epoch) {
        self.failing_epochs.lock().unwrap().insert(epoch);
    }

    /// Make message lookups for block `cid` fail.
    pub fn fail_block(&self, cid: impl Into<String>) {
        self.failing_blocks.lock().unwrap().insert(cid.into());
    }

    /// Remove every injected failure.
    pub fn heal(&self) {
        self.failing_epochs.lock().unwrap().clear();
        self.failing_blocks.lock().unwrap().clear();
    }

    /// Number of tipset lookups served so far.
    pub fn tipset_calls(&self) -> u64 {
        self.tipset_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl NodeGateway for MemoryGateway {
    async fn head_height(&self) -> Result<Epoch, IndexerError> {
        Ok(*self.head.lock().unwrap())
    }

    async fn tipset(&self, epoch: Epoch) -> Result<Vec<BlockMeta>, IndexerError> {
        self.tipset_calls.fetch_add(1, Ordering::Relaxed);
        if self.failing_epochs.lock().unwrap().contains(&epoch) {
            return Err(IndexerError::Gateway(format!("tipset at {epoch} unavailable")));
        }
        Ok(self.tipsets.lock().unwrap().get(&epoch).cloned().unwrap_or_default())
    }

    async fn block_messages(&self, cid: &str) -> Result<Vec<Message>, IndexerError> {
        if self.failing_blocks.lock().unwrap().contains(cid) {
            return Err(IndexerError::Gateway(format!("messages of {cid} unavailable")));
        }
        Ok(self.messages.lock().unwrap().get(cid).cloned().unwrap_or_default())
    }
}
