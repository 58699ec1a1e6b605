//! `janus status`

use anyhow::Result;

use janus_core::{CheckpointStore, Cursor, FactStore, NodeGateway};

use crate::config::JanusConfig;

pub async fn run(config: &JanusConfig) -> Result<()> {
    let storage = crate::open_storage(config).await?;
    let gateway = crate::connect_gateway(config)?;

    let checkpoint = storage.checkpoints.load_checkpoint().await?;
    let head = gateway.head_height().await?;
    let facts = storage.facts.fact_count().await?;

    let height = checkpoint.map(|c| c.height).unwrap_or(config.indexer.floor_height);
    let cursor = Cursor::new(height, config.indexer.confirmation_depth);

    println!("Janus v{}", env!("CARGO_PKG_VERSION"));
    println!("  Node:        {}", config.node.endpoint);
    println!("  Storage:     {} ({})", storage.kind, config.storage.url);
    match checkpoint {
        Some(cp) => println!("  Checkpoint:  {} (updated {})", cp.height, cp.updated_at),
        None => println!("  Checkpoint:  none (starts at floor {height})"),
    }
    println!("  Head:        {head}");
    println!("  Safe head:   {}", cursor.safe_head(head));
    println!("  Lag:         {}", cursor.lag(head));
    println!("  Miner facts: {facts}");
    Ok(())
}
