//! Fact persistence seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexerError;
use crate::types::MinerFact;

/// Miner creations aggregated over one UTC day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMinerStat {
    /// Day in `YYYY-MM-DD` form.
    pub date: String,
    /// Number of miners created that day.
    pub count: i64,
    /// Average creation cost in FIL.
    pub cost: f64,
}

/// Storage for extracted miner facts.
///
/// `insert_fact` must be insert-or-ignore keyed by `msg_cid`, backed by a
/// uniqueness constraint so concurrent handlers can race safely.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Insert a fact. Returns `false` if a fact with the same `msg_cid` exists.
    async fn insert_fact(&self, fact: &MinerFact) -> Result<bool, IndexerError>;

    /// Total number of stored facts.
    async fn fact_count(&self) -> Result<u64, IndexerError>;

    /// Facts with `from_height <= height <= to_height`, ordered by height then `msg_cid`.
    async fn facts_between(
        &self,
        from_height: i64,
        to_height: i64,
    ) -> Result<Vec<MinerFact>, IndexerError>;

    /// Per-day aggregates for facts with `start_ts <= timestamp <= end_ts`,
    /// ordered by date. Days without facts are omitted.
    async fn daily_stats(
        &self,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<DailyMinerStat>, IndexerError>;
}
