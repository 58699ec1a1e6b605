//! Checkpointed indexer cycles and run loop.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use janus_core::checkpoint::MemoryCheckpointStore;
use janus_core::gateway::MemoryGateway;
use janus_core::{
    BlockMeta, CheckpointStore, CycleOutcome, Epoch, IndexerBuilder, IndexerError, IndexerState,
    Message, MessageHandler, NodeGateway,
};

#[derive(Default)]
struct Counter(AtomicU64);

#[async_trait]
impl MessageHandler for Counter {
    async fn handle(&self, _block: &BlockMeta, _msg: &Message) -> Result<(), IndexerError> {
        self.0.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn msg(cid: String) -> Message {
    Message {
        cid,
        from: "f1owner".into(),
        to: "f04".into(),
        nonce: 0,
        value: "0".into(),
        method: 2,
    }
}

fn chain(head: Epoch) -> Arc<MemoryGateway> {
    let gw = Arc::new(MemoryGateway::new(head));
    for epoch in 1..=head {
        gw.push_block(epoch, format!("blk-{epoch}"), vec![msg(format!("msg-{epoch}"))]);
    }
    gw
}

async fn stored(store: &MemoryCheckpointStore) -> Epoch {
    store.load_checkpoint().await.unwrap().unwrap().height
}

#[tokio::test]
async fn cycle_syncs_up_to_safe_head() {
    let gw = chain(25);
    let store = Arc::new(MemoryCheckpointStore::new());
    let counter = Arc::new(Counter::default());
    let indexer = IndexerBuilder::new()
        .floor_height(0)
        .confirmation_depth(20)
        .build(gw, store.clone(), counter.clone())
        .unwrap();

    let outcome = indexer.run_cycle().await.unwrap();
    match outcome {
        CycleOutcome::Advanced { from, to, stats } => {
            assert_eq!((from, to), (1, 5));
            assert_eq!(stats.epochs, 5);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(stored(&store).await, 5);
    assert_eq!(counter.0.load(Ordering::Relaxed), 5);
}

#[tokio::test]
async fn caught_up_cycle_does_nothing() {
    let gw = chain(25);
    let store = Arc::new(MemoryCheckpointStore::at(5));
    let indexer = IndexerBuilder::new()
        .floor_height(0)
        .build(gw.clone(), store.clone(), Arc::new(Counter::default()))
        .unwrap();

    let outcome = indexer.run_cycle().await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::UpToDate {
            checkpoint: 5,
            safe_head: 5
        }
    );
    assert_eq!(gw.tipset_calls(), 0);
    assert_eq!(stored(&store).await, 5);
}

#[tokio::test]
async fn failed_cycle_keeps_checkpoint_and_retries_full_delta() {
    let gw = chain(60);
    gw.fail_epoch(30);
    let store = Arc::new(MemoryCheckpointStore::at(10));
    let counter = Arc::new(Counter::default());
    let indexer = IndexerBuilder::new()
        .batch_size(8)
        .build(gw.clone(), store.clone(), counter.clone())
        .unwrap();

    let err = indexer.run_cycle().await.unwrap_err();
    assert_eq!(err.epoch(), Some(30));
    assert_eq!(stored(&store).await, 10);

    gw.heal();
    let outcome = indexer.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Advanced { from: 11, to: 40, .. }));
    assert_eq!(stored(&store).await, 40);
}

#[tokio::test]
async fn checkpoint_is_monotonic_and_behind_safe_head() {
    let gw = chain(200);
    let store = Arc::new(MemoryCheckpointStore::new());
    let indexer = IndexerBuilder::new()
        .floor_height(0)
        .confirmation_depth(20)
        .batch_size(16)
        .build(gw.clone(), store.clone(), Arc::new(Counter::default()))
        .unwrap();

    // Heads move forward, stall, even step back; some cycles fail.
    let heads = [25, 25, 60, 40, 90, 90, 150, 120, 200];
    let mut last = 0;
    for (i, head) in heads.into_iter().enumerate() {
        gw.set_head(head);
        if i == 4 {
            gw.fail_epoch(60);
        }
        if i == 5 {
            gw.heal();
        }
        let _ = indexer.run_cycle().await;

        let cp = stored(&store).await;
        assert!(cp >= last, "checkpoint went back from {last} to {cp}");
        assert!(cp <= head - 20 || cp == last, "checkpoint {cp} ahead of safe head");
        last = cp;
    }
    assert_eq!(last, 180);
}

#[tokio::test]
async fn missing_checkpoint_starts_at_floor() {
    let gw = chain(120);
    let store = Arc::new(MemoryCheckpointStore::new());
    let counter = Arc::new(Counter::default());
    let indexer = IndexerBuilder::new()
        .floor_height(90)
        .confirmation_depth(20)
        .build(gw, store.clone(), counter.clone())
        .unwrap();

    let outcome = indexer.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Advanced { from: 91, to: 100, .. }));
    assert_eq!(counter.0.load(Ordering::Relaxed), 10);
}

#[tokio::test]
async fn run_loop_indexes_then_stops_on_shutdown() {
    let gw = chain(45);
    let store = Arc::new(MemoryCheckpointStore::new());
    let mut indexer = IndexerBuilder::new()
        .floor_height(0)
        .confirmation_depth(20)
        .interval_secs(1)
        .build(gw, store.clone(), Arc::new(Counter::default()))
        .unwrap();

    let (tx, rx) = tokio::sync::watch::channel(false);
    let task = tokio::spawn(async move {
        indexer.run(rx).await.unwrap();
        indexer
    });

    // The first tick fires immediately.
    let mut reached = false;
    for _ in 0..50 {
        if store.load_checkpoint().await.unwrap().map(|c| c.height) == Some(25) {
            reached = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(reached, "indexer never advanced the checkpoint");

    tx.send(true).unwrap();
    let indexer = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("indexer did not stop")
        .unwrap();
    assert_eq!(indexer.state(), IndexerState::Stopped);
}

#[tokio::test]
async fn run_returns_immediately_when_already_shut_down() {
    let gw = chain(45);
    let store = Arc::new(MemoryCheckpointStore::new());
    let mut indexer = IndexerBuilder::new()
        .floor_height(0)
        .build(gw.clone(), store.clone(), Arc::new(Counter::default()))
        .unwrap();

    let (tx, rx) = tokio::sync::watch::channel(false);
    tx.send(true).unwrap();
    indexer.run(rx).await.unwrap();

    assert_eq!(indexer.state(), IndexerState::Stopped);
    assert_eq!(gw.tipset_calls(), 0);
    // Startup still lazily created the checkpoint.
    assert_eq!(stored(&store).await, 0);
}

/// Answers `first` to the first head query, then the inner chain's head.
struct SinkingHead {
    inner: Arc<MemoryGateway>,
    first: Epoch,
    asked: AtomicBool,
}

#[async_trait]
impl NodeGateway for SinkingHead {
    async fn head_height(&self) -> Result<Epoch, IndexerError> {
        if !self.asked.swap(true, Ordering::SeqCst) {
            return Ok(self.first);
        }
        self.inner.head_height().await
    }

    async fn tipset(&self, epoch: Epoch) -> Result<Vec<BlockMeta>, IndexerError> {
        self.inner.tipset(epoch).await
    }

    async fn block_messages(&self, cid: &str) -> Result<Vec<Message>, IndexerError> {
        self.inner.block_messages(cid).await
    }
}

#[tokio::test]
async fn head_dropping_mid_cycle_keeps_checkpoint() {
    let inner = chain(50);
    let gw = Arc::new(SinkingHead {
        inner,
        first: 100,
        asked: AtomicBool::new(false),
    });
    let store = Arc::new(MemoryCheckpointStore::new());
    let counter = Arc::new(Counter::default());
    let indexer = IndexerBuilder::new()
        .floor_height(0)
        .confirmation_depth(20)
        .build(gw, store.clone(), counter.clone())
        .unwrap();

    // Planned [1, 80] against head 100, but the engine only saw head 50.
    let err = indexer.run_cycle().await.unwrap_err();
    assert!(
        matches!(err, IndexerError::HeadRegressed { planned: 80, synced: 50 }),
        "{err}"
    );
    assert!(err.is_retryable());
    assert_eq!(stored(&store).await, 0);
    assert_eq!(counter.0.load(Ordering::Relaxed), 50);

    // Both queries now agree on head 50.
    let outcome = indexer.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Advanced { from: 1, to: 30, .. }));
    assert_eq!(stored(&store).await, 30);
}
