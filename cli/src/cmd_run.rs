//! `janus run`: the long-running indexer.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use janus_core::{IndexerBuilder, MinerFactHandler};

use crate::config::JanusConfig;

pub async fn run(config: &JanusConfig) -> Result<()> {
    let storage = crate::open_storage(config).await?;
    if storage.kind == "memory" {
        warn!("using in-memory storage, nothing survives a restart");
    }
    let gateway = crate::connect_gateway(config)?;
    let handler = Arc::new(MinerFactHandler::new(storage.facts.clone()));

    let mut indexer = IndexerBuilder::from_config(config.indexer.clone())
        .build(gateway, storage.checkpoints.clone(), handler)
        .context("build indexer")?;

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received");
        let _ = tx.send(true);
    });

    info!(
        node = %config.node.endpoint,
        storage = storage.kind,
        "janus indexer starting"
    );
    indexer.run(rx).await.context("indexer stopped with error")?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM, only Ctrl-C stops the indexer");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
