//! janus-storage: pluggable storage backends for Janus.
//!
//! Backends:
//! - [`memory`]: in-memory (dev/testing, no persistence)
//! - `sqlite`: SQLite via `sqlx` (embedded, single-file persistence)
//! - `postgres`: PostgreSQL via `sqlx`
//!
//! Every backend implements both [`CheckpointStore`] and [`FactStore`].
//! [`open`] picks one from a database URL.

use std::sync::Arc;

use janus_core::checkpoint::CheckpointStore;
use janus_core::error::IndexerError;
use janus_core::facts::FactStore;

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStorage;

/// An opened backend, viewed through both storage seams.
#[derive(Clone)]
pub struct Storage {
    pub kind: &'static str,
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub facts: Arc<dyn FactStore>,
}

impl Storage {
    fn from_backend<S>(kind: &'static str, backend: S) -> Self
    where
        S: CheckpointStore + FactStore + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            kind,
            checkpoints: backend.clone(),
            facts: backend,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_backend("memory", InMemoryStorage::new())
    }
}

/// Open the backend named by `url`.
///
/// | URL                                | Backend  |
/// |------------------------------------|----------|
/// | empty or `memory`                  | memory   |
/// | `sqlite:…`                         | sqlite   |
/// | `postgres://…`, `postgresql://…`   | postgres |
pub async fn open(url: &str) -> Result<Storage, IndexerError> {
    let url = url.trim();
    if url.is_empty() || url == "memory" {
        return Ok(Storage::in_memory());
    }
    if url.starts_with("sqlite:") {
        return open_sqlite(url).await;
    }
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        return open_postgres(url).await;
    }
    Err(IndexerError::Config(format!("unsupported database url: {url}")))
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(url: &str) -> Result<Storage, IndexerError> {
    let store = sqlite::SqliteStorage::open(url).await?;
    Ok(Storage::from_backend("sqlite", store))
}

#[cfg(not(feature = "sqlite"))]
async fn open_sqlite(_url: &str) -> Result<Storage, IndexerError> {
    Err(IndexerError::Config("built without the `sqlite` feature".into()))
}

#[cfg(feature = "postgres")]
async fn open_postgres(url: &str) -> Result<Storage, IndexerError> {
    let store = postgres::PostgresStorage::connect(url).await?;
    Ok(Storage::from_backend("postgres", store))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(_url: &str) -> Result<Storage, IndexerError> {
    Err(IndexerError::Config("built without the `postgres` feature".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_memory_by_default() {
        assert_eq!(open("").await.unwrap().kind, "memory");
        assert_eq!(open("memory").await.unwrap().kind, "memory");
    }

    #[tokio::test]
    async fn unknown_scheme_is_config_error() {
        let err = open("mysql://localhost/janus").await.err().unwrap();
        assert!(matches!(err, IndexerError::Config(_)));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn open_sqlite_memory() {
        let storage = open("sqlite::memory:").await.unwrap();
        assert_eq!(storage.kind, "sqlite");
        assert_eq!(storage.facts.fact_count().await.unwrap(), 0);
    }
}
