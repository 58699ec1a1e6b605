//! janus-core: batch sync engine and checkpointed indexer for miner-creation
//! facts on a Filecoin-style chain.
//!
//! # Architecture
//!
//! ```text
//! IndexerBuilder → Indexer (timer loop, one cycle at a time)
//!                     ├── CheckpointManager  (lazy-created, monotonic checkpoint)
//!                     ├── Cursor             (head - confirmation depth)
//!                     └── BatchSync          (windows → one task per epoch)
//!                             ├── NodeGateway     (head / tipset / block messages)
//!                             └── MessageHandler  (e.g. MinerFactHandler → FactStore)
//! ```

pub mod builder;
pub mod checkpoint;
pub mod cursor;
pub mod error;
pub mod extract;
pub mod facts;
pub mod gateway;
pub mod handler;
pub mod indexer;
pub mod stats;
pub mod sync;
pub mod types;

pub use builder::IndexerBuilder;
pub use checkpoint::{Checkpoint, CheckpointManager, CheckpointStore};
pub use cursor::Cursor;
pub use error::IndexerError;
pub use extract::MinerFactHandler;
pub use facts::{DailyMinerStat, FactStore};
pub use gateway::NodeGateway;
pub use handler::{HandlerSet, MessageHandler};
pub use indexer::{CycleOutcome, Indexer, IndexerConfig, IndexerState};
pub use sync::{BatchSync, SyncStats};
pub use types::{BlockMeta, Epoch, Message, MinerFact};
