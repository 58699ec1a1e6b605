//! In-memory storage backend.
//!
//! Holds the checkpoint and miner facts in RAM. Useful for tests, dry runs
//! and short-lived indexers that don't need persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use janus_core::checkpoint::{Checkpoint, CheckpointStore};
use janus_core::error::IndexerError;
use janus_core::facts::{DailyMinerStat, FactStore};
use janus_core::stats::atto_to_fil;
use janus_core::types::MinerFact;

/// In-memory indexer storage.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryStorage {
    checkpoint: Mutex<Option<Checkpoint>>,
    facts: Mutex<HashMap<String, MinerFact>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryStorage {
    async fn load_checkpoint(&self) -> Result<Option<Checkpoint>, IndexerError> {
        Ok(*self.checkpoint.lock().unwrap())
    }

    async fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<(), IndexerError> {
        *self.checkpoint.lock().unwrap() = Some(checkpoint);
        Ok(())
    }
}

#[async_trait]
impl FactStore for InMemoryStorage {
    async fn insert_fact(&self, fact: &MinerFact) -> Result<bool, IndexerError> {
        let mut facts = self.facts.lock().unwrap();
        if facts.contains_key(&fact.msg_cid) {
            return Ok(false);
        }
        facts.insert(fact.msg_cid.clone(), fact.clone());
        Ok(true)
    }

    async fn fact_count(&self) -> Result<u64, IndexerError> {
        Ok(self.facts.lock().unwrap().len() as u64)
    }

    async fn facts_between(
        &self,
        from_height: i64,
        to_height: i64,
    ) -> Result<Vec<MinerFact>, IndexerError> {
        let mut out: Vec<MinerFact> = self
            .facts
            .lock()
            .unwrap()
            .values()
            .filter(|f| f.height >= from_height && f.height <= to_height)
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.height, &a.msg_cid).cmp(&(b.height, &b.msg_cid)));
        Ok(out)
    }

    async fn daily_stats(
        &self,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<DailyMinerStat>, IndexerError> {
        // date -> (count, summed cost in FIL)
        let mut days: BTreeMap<String, (i64, f64)> = BTreeMap::new();
        for fact in self.facts.lock().unwrap().values() {
            if fact.timestamp < start_ts || fact.timestamp > end_ts {
                continue;
            }
            let Some(at) = DateTime::<Utc>::from_timestamp(fact.timestamp, 0) else {
                continue;
            };
            let day = days.entry(at.format("%Y-%m-%d").to_string()).or_default();
            day.0 += 1;
            day.1 += atto_to_fil(&fact.cost);
        }

        Ok(days
            .into_iter()
            .map(|(date, (count, total))| DailyMinerStat {
                date,
                count,
                cost: total / count as f64,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(msg_cid: &str, height: i64, timestamp: i64, cost: &str) -> MinerFact {
        MinerFact {
            height,
            block_cid: format!("blk-{height}"),
            timestamp,
            msg_cid: msg_cid.into(),
            from: "f1owner".into(),
            cost: cost.into(),
        }
    }

    #[tokio::test]
    async fn insert_is_unique_by_msg_cid() {
        let store = InMemoryStorage::new();
        assert!(store.insert_fact(&fact("m1", 10, 0, "0")).await.unwrap());
        assert!(!store.insert_fact(&fact("m1", 11, 0, "0")).await.unwrap());
        assert!(store.insert_fact(&fact("m2", 10, 0, "0")).await.unwrap());
        assert_eq!(store.fact_count().await.unwrap(), 2);

        // The first write wins.
        let facts = store.facts_between(0, 100).await.unwrap();
        assert_eq!(facts[0].height, 10);
    }

    #[tokio::test]
    async fn facts_between_is_inclusive_and_ordered() {
        let store = InMemoryStorage::new();
        for (cid, h) in [("c", 30), ("b", 20), ("a", 20), ("d", 40)] {
            store.insert_fact(&fact(cid, h, 0, "0")).await.unwrap();
        }
        let got: Vec<_> = store
            .facts_between(20, 30)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.msg_cid)
            .collect();
        assert_eq!(got, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn daily_stats_group_by_utc_day() {
        let store = InMemoryStorage::new();
        // 2024-01-01T00:00:00Z = 1704067200
        let day = 86_400;
        store.insert_fact(&fact("m1", 1, 1_704_067_200, "1000000000000000000")).await.unwrap();
        store.insert_fact(&fact("m2", 2, 1_704_067_200 + 3_600, "3000000000000000000")).await.unwrap();
        store.insert_fact(&fact("m3", 3, 1_704_067_200 + day, "500000000000000000")).await.unwrap();
        store.insert_fact(&fact("m4", 4, 1_704_067_200 + 5 * day, "0")).await.unwrap();

        let stats = store
            .daily_stats(1_704_067_200, 1_704_067_200 + 2 * day)
            .await
            .unwrap();
        assert_eq!(
            stats,
            vec![
                DailyMinerStat { date: "2024-01-01".into(), count: 2, cost: 2.0 },
                DailyMinerStat { date: "2024-01-02".into(), count: 1, cost: 0.5 },
            ]
        );
    }

    #[tokio::test]
    async fn checkpoint_roundtrip() {
        let store = InMemoryStorage::new();
        assert!(store.load_checkpoint().await.unwrap().is_none());
        store
            .save_checkpoint(Checkpoint { height: 5_200_000, updated_at: 1 })
            .await
            .unwrap();
        let loaded = store.load_checkpoint().await.unwrap().unwrap();
        assert_eq!(loaded.height, 5_200_000);
    }
}
