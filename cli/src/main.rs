//! Janus CLI: index Filecoin miner creations from a Lotus node.
//!
//! # Commands
//! ```text
//! janus run                               index until SIGINT/SIGTERM
//! janus sync   --start <E> [--end <E>]    one-shot range sync (end 0 = head)
//! janus status                            checkpoint, head, safe head, lag
//! janus stats  [--interval 7d]            daily miner creations as JSON
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd_run;
mod cmd_stats;
mod cmd_status;
mod cmd_sync;
mod config;
mod logging;

use config::{JanusConfig, Overrides};

#[derive(Parser)]
#[command(
    name = "janus",
    about = "Filecoin miner-creation indexer",
    long_about = "
Janus follows a Lotus node, records every CreateMiner call to the storage
power actor once its epoch is final, and serves daily statistics.

ENVIRONMENT VARIABLES:
  JANUS_NODE_ENDPOINT   Lotus JSON-RPC endpoint
  JANUS_NODE_TOKEN      Lotus API token
  JANUS_DATABASE_URL    memory | sqlite:<path> | postgres://...
  RUST_LOG              tracing filter, overrides --log-level
",
    version
)]
struct Cli {
    /// Config file (default: ./janus.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Lotus JSON-RPC endpoint
    #[arg(long, global = true, env = "JANUS_NODE_ENDPOINT")]
    node: Option<String>,

    /// Lotus API token
    #[arg(long, global = true, env = "JANUS_NODE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Storage URL
    #[arg(long, global = true, env = "JANUS_DATABASE_URL")]
    database_url: Option<String>,

    /// Log level: trace | debug | info | warn | error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the checkpointed indexer until interrupted
    Run,

    /// Sync an epoch range once, without touching the checkpoint
    Sync {
        /// First epoch (inclusive)
        #[arg(long)]
        start: i64,
        /// Last epoch (inclusive); 0 means the current head
        #[arg(long, default_value_t = 0)]
        end: i64,
        /// Print matches instead of storing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show checkpoint, head, safe head and lag
    Status,

    /// Print daily miner-creation statistics as JSON
    Stats {
        /// Look-back window, e.g. 7d or 30d
        #[arg(long, default_value = "7d")]
        interval: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = JanusConfig::load(cli.config.as_deref()).context("load configuration")?;
    config.apply(Overrides {
        node_endpoint: cli.node,
        node_token: cli.token,
        database_url: cli.database_url,
        log_level: cli.log_level,
        log_json: cli.log_json,
    });
    config.validate()?;
    logging::init_tracing(&config.log);

    match cli.command {
        Commands::Run => cmd_run::run(&config).await,
        Commands::Sync { start, end, dry_run } => cmd_sync::run(&config, start, end, dry_run).await,
        Commands::Status => cmd_status::run(&config).await,
        Commands::Stats { interval } => cmd_stats::run(&config, &interval).await,
    }
}

/// Open the configured gateway.
pub(crate) fn connect_gateway(
    config: &JanusConfig,
) -> Result<std::sync::Arc<janus_lotus::LotusGateway<janus_lotus::HttpRpcClient>>> {
    let gateway = janus_lotus::LotusGateway::connect(config.node.clone())
        .with_context(|| format!("connect to node at {}", config.node.endpoint))?;
    Ok(std::sync::Arc::new(gateway))
}

/// Open the configured storage backend.
pub(crate) async fn open_storage(config: &JanusConfig) -> Result<janus_storage::Storage> {
    janus_storage::open(&config.storage.url)
        .await
        .with_context(|| format!("open storage '{}'", config.storage.url))
}
