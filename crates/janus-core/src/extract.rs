//! Miner-creation extraction: the handler that turns `CreateMiner` calls to
//! the storage power actor into persisted facts.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::IndexerError;
use crate::facts::FactStore;
use crate::handler::MessageHandler;
use crate::types::{BlockMeta, Message, MinerFact};

/// ID-address payload of the storage power actor (`f04` on mainnet, `t04` on testnets).
pub const STORAGE_POWER_ACTOR_ID: &str = "04";

/// Method number of `CreateMiner` on the storage power actor.
pub const METHOD_CREATE_MINER: u64 = 2;

/// Returns `true` if `addr` is the storage power actor on any network.
pub fn is_storage_power_actor(addr: &str) -> bool {
    match addr.strip_prefix('f').or_else(|| addr.strip_prefix('t')) {
        Some(rest) => rest == STORAGE_POWER_ACTOR_ID,
        None => false,
    }
}

/// Returns `true` if `msg` creates a storage miner.
pub fn is_create_miner(msg: &Message) -> bool {
    msg.method == METHOD_CREATE_MINER && is_storage_power_actor(&msg.to)
}

/// Persists one [`MinerFact`] per `CreateMiner` message.
pub struct MinerFactHandler {
    store: Arc<dyn FactStore>,
}

impl MinerFactHandler {
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MessageHandler for MinerFactHandler {
    async fn handle(&self, block: &BlockMeta, msg: &Message) -> Result<(), IndexerError> {
        if !is_create_miner(msg) {
            return Ok(());
        }
        let inserted = self.store.insert_fact(&MinerFact::new(block, msg)).await?;
        debug!(
            height = block.height,
            msg_cid = %msg.cid,
            from = %msg.from,
            inserted,
            "create-miner message"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "create-miner"
    }
}
