//! SQLite storage backend.
//!
//! Persists the checkpoint row and miner facts to a single SQLite file via
//! `sqlx`, in WAL mode.
//!
//! # Usage
//! ```rust,no_run
//! use janus_storage::sqlite::SqliteStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStorage::open("./janus.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStorage::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::debug;

use janus_core::checkpoint::{Checkpoint, CheckpointStore};
use janus_core::error::IndexerError;
use janus_core::facts::{DailyMinerStat, FactStore};
use janus_core::types::MinerFact;

fn db_err(e: sqlx::Error) -> IndexerError {
    IndexerError::Storage(e.to_string())
}

/// SQLite-backed storage for the checkpoint and miner facts.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./janus.db"`) or a SQLite URL
    /// (`"sqlite:./janus.db"`). A missing database file is created either way.
    pub async fn open(path: &str) -> Result<Self, IndexerError> {
        if path.contains(":memory:") {
            return Self::in_memory().await;
        }
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}")
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(db_err)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(db_err)?;
        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Every connection to `sqlite::memory:` is its own database, so the pool
    /// is held at one connection.
    pub async fn in_memory() -> Result<Self, IndexerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<(), IndexerError> {
        // Single row, id = 1.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chain_checkpoint (
                id         INTEGER PRIMARY KEY CHECK (id = 1),
                height     INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        // `cost` is attoFIL and can exceed i64, so it stays a decimal string.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS miner_facts (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                height    INTEGER NOT NULL,
                block_cid TEXT    NOT NULL,
                block_time INTEGER NOT NULL,
                msg_cid   TEXT    NOT NULL UNIQUE,
                sender    TEXT    NOT NULL,
                cost      TEXT    NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_miner_facts_height ON miner_facts (height);")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_miner_facts_block_time ON miner_facts (block_time);",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}

// ─── CheckpointStore impl ────────────────────────────────────────────────────

#[async_trait]
impl CheckpointStore for SqliteStorage {
    async fn load_checkpoint(&self) -> Result<Option<Checkpoint>, IndexerError> {
        let row = sqlx::query("SELECT height, updated_at FROM chain_checkpoint WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(row.map(|r| Checkpoint {
            height: r.get("height"),
            updated_at: r.get("updated_at"),
        }))
    }

    async fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<(), IndexerError> {
        sqlx::query(
            "INSERT INTO chain_checkpoint (id, height, updated_at) VALUES (1, ?, ?)
             ON CONFLICT(id) DO UPDATE SET height = excluded.height, updated_at = excluded.updated_at",
        )
        .bind(checkpoint.height)
        .bind(checkpoint.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        debug!(height = checkpoint.height, "checkpoint saved");
        Ok(())
    }
}

// ─── FactStore impl ──────────────────────────────────────────────────────────

#[async_trait]
impl FactStore for SqliteStorage {
    async fn insert_fact(&self, fact: &MinerFact) -> Result<bool, IndexerError> {
        let res = sqlx::query(
            "INSERT OR IGNORE INTO miner_facts (height, block_cid, block_time, msg_cid, sender, cost)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(fact.height)
        .bind(&fact.block_cid)
        .bind(fact.timestamp)
        .bind(&fact.msg_cid)
        .bind(&fact.from)
        .bind(&fact.cost)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(res.rows_affected() == 1)
    }

    async fn fact_count(&self) -> Result<u64, IndexerError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM miner_facts")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let cnt: i64 = row.get("cnt");
        Ok(cnt as u64)
    }

    async fn facts_between(
        &self,
        from_height: i64,
        to_height: i64,
    ) -> Result<Vec<MinerFact>, IndexerError> {
        let rows = sqlx::query(
            "SELECT height, block_cid, block_time, msg_cid, sender, cost
             FROM miner_facts WHERE height BETWEEN ? AND ?
             ORDER BY height, msg_cid",
        )
        .bind(from_height)
        .bind(to_height)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|r| MinerFact {
                height: r.get("height"),
                block_cid: r.get("block_cid"),
                timestamp: r.get("block_time"),
                msg_cid: r.get("msg_cid"),
                from: r.get("sender"),
                cost: r.get("cost"),
            })
            .collect())
    }

    async fn daily_stats(
        &self,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<DailyMinerStat>, IndexerError> {
        let rows = sqlx::query(
            "SELECT date(block_time, 'unixepoch') AS day,
                    COUNT(*) AS cnt,
                    AVG(CAST(cost AS REAL)) / 1e18 AS cost
             FROM miner_facts WHERE block_time BETWEEN ? AND ?
             GROUP BY day ORDER BY day",
        )
        .bind(start_ts)
        .bind(end_ts)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|r| DailyMinerStat {
                date: r.get("day"),
                count: r.get("cnt"),
                cost: r.get::<Option<f64>, _>("cost").unwrap_or(0.0),
            })
            .collect())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
