//! Shared types for the sync pipeline.

use serde::{Deserialize, Serialize};

/// A chain height. Signed to match the node's epoch type.
pub type Epoch = i64;

// ─── BlockMeta ────────────────────────────────────────────────────────────────

/// The block context a message was observed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockMeta {
    /// Epoch the block was produced at.
    pub height: Epoch,
    /// Content-addressed block identifier.
    pub cid: String,
    /// Unix timestamp of the block (seconds since epoch).
    pub timestamp: i64,
}

// ─── Message ─────────────────────────────────────────────────────────────────

/// A chain message as returned by the node.
///
/// Identity is the content-addressed `cid`; the same message can be carried
/// by several blocks of one tipset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Content-addressed message identifier.
    pub cid: String,
    /// Sender address (e.g. `f1…`).
    pub from: String,
    /// Recipient address (e.g. `f04`).
    pub to: String,
    /// Sender nonce.
    pub nonce: u64,
    /// Transferred value in attoFIL, as a decimal string.
    pub value: String,
    /// Actor method number.
    pub method: u64,
}

// ─── MinerFact ────────────────────────────────────────────────────────────────

/// One persisted row per unique miner-creation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerFact {
    /// Epoch of the block the message first appeared in.
    pub height: Epoch,
    /// Block cid.
    pub block_cid: String,
    /// Block timestamp (Unix seconds).
    pub timestamp: i64,
    /// Message cid (unique).
    pub msg_cid: String,
    /// Address that created the miner.
    pub from: String,
    /// Value sent with the creation message, in attoFIL.
    pub cost: String,
}

impl MinerFact {
    /// Build a fact from a matched message and its block context.
    pub fn new(block: &BlockMeta, msg: &Message) -> Self {
        Self {
            height: block.height,
            block_cid: block.cid.clone(),
            timestamp: block.timestamp,
            msg_cid: msg.cid.clone(),
            from: msg.from.clone(),
            cost: msg.value.clone(),
        }
    }
}
