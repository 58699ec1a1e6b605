//! End-to-end: in-memory chain → indexer → miner-fact handler → storage.

use std::sync::Arc;

use janus_core::gateway::MemoryGateway;
use janus_core::{
    BatchSync, CheckpointStore, Epoch, FactStore, IndexerBuilder, Message, MinerFactHandler,
};
use janus_storage::Storage;

fn message(cid: String, to: &str, method: u64, value: &str) -> Message {
    Message {
        cid,
        from: "f3owner".into(),
        to: to.into(),
        nonce: 0,
        value: value.into(),
        method,
    }
}

/// Every epoch carries a transfer; every tenth epoch also carries a
/// `CreateMiner` call, included by two blocks of the tipset.
fn chain(head: Epoch) -> Arc<MemoryGateway> {
    let gw = Arc::new(MemoryGateway::new(head));
    for epoch in 1..=head {
        let transfer = message(format!("bafy-send-{epoch}"), "f1payee", 0, "1000");
        if epoch % 10 == 0 {
            let create = message(format!("bafy-create-{epoch}"), "f04", 2, "1000000000000000000");
            gw.push_block(epoch, format!("bafy-blk-{epoch}-a"), vec![transfer, create.clone()]);
            gw.push_block(epoch, format!("bafy-blk-{epoch}-b"), vec![create]);
        } else {
            gw.push_block(epoch, format!("bafy-blk-{epoch}-a"), vec![transfer]);
        }
    }
    gw
}

async fn backends() -> Vec<Storage> {
    #[allow(unused_mut)]
    let mut all = vec![Storage::in_memory()];
    #[cfg(feature = "sqlite")]
    all.push(janus_storage::open("sqlite::memory:").await.unwrap());
    all
}

#[tokio::test]
async fn failure_mid_range_keeps_earlier_facts_and_checkpoint() {
    for storage in backends().await {
        let gw = chain(600);
        gw.fail_epoch(500);

        let handler = Arc::new(MinerFactHandler::new(storage.facts.clone()));
        let indexer = IndexerBuilder::new()
            .floor_height(0)
            .confirmation_depth(0)
            .batch_size(100)
            .build(gw.clone(), storage.checkpoints.clone(), handler)
            .unwrap();

        let err = indexer.run_cycle().await.unwrap_err();
        assert_eq!(err.epoch(), Some(500), "{}", storage.kind);

        let cp = storage.checkpoints.load_checkpoint().await.unwrap().unwrap();
        assert_eq!(cp.height, 0, "{}", storage.kind);
        assert_eq!(storage.facts.facts_between(1, 400).await.unwrap().len(), 40);
        assert!(storage.facts.facts_between(501, 600).await.unwrap().is_empty());

        gw.heal();
        indexer.run_cycle().await.unwrap();

        let cp = storage.checkpoints.load_checkpoint().await.unwrap().unwrap();
        assert_eq!(cp.height, 600, "{}", storage.kind);
        assert_eq!(storage.facts.fact_count().await.unwrap(), 60, "{}", storage.kind);
    }
}

#[tokio::test]
async fn resync_is_idempotent() {
    for storage in backends().await {
        let gw = chain(120);
        let handler = Arc::new(MinerFactHandler::new(storage.facts.clone()));
        let engine = BatchSync::new(gw).with_batch_size(25);

        engine.sync_range(1, 120, handler.clone()).await.unwrap();
        let first = storage.facts.facts_between(0, 120).await.unwrap();

        engine.sync_range(1, 120, handler.clone()).await.unwrap();
        engine.sync_range(40, 80, handler).await.unwrap();
        let second = storage.facts.facts_between(0, 120).await.unwrap();

        assert_eq!(first.len(), 12, "{}", storage.kind);
        assert_eq!(first, second, "{}", storage.kind);
    }
}

#[tokio::test]
async fn facts_carry_block_context() {
    let storage = Storage::in_memory();
    let handler = Arc::new(MinerFactHandler::new(storage.facts.clone()));
    BatchSync::new(chain(10))
        .sync_range(10, 10, handler)
        .await
        .unwrap();

    let facts = storage.facts.facts_between(10, 10).await.unwrap();
    assert_eq!(facts.len(), 1);
    let fact = &facts[0];
    assert_eq!(fact.msg_cid, "bafy-create-10");
    assert_eq!(fact.from, "f3owner");
    assert_eq!(fact.cost, "1000000000000000000");
    // Both blocks carry it; the first block in tipset order owns it.
    assert_eq!(fact.block_cid, "bafy-blk-10-a");
    assert_eq!(fact.timestamp, 1_598_306_400 + 10 * 30);
}
