//! `janus stats`: daily miner creations and average creation cost.

use anyhow::Result;
use chrono::Utc;

use janus_core::stats::{daily_series, parse_interval_days, StatsWindow};
use janus_core::FactStore;

use crate::config::JanusConfig;

pub async fn run(config: &JanusConfig, interval: &str) -> Result<()> {
    let storage = crate::open_storage(config).await?;

    let window = StatsWindow::ending_at(Utc::now(), parse_interval_days(interval));
    let rows = storage.facts.daily_stats(window.start_ts, window.end_ts).await?;
    let series = daily_series(&rows, window.start_date, window.days);

    println!("{}", serde_json::to_string_pretty(&series)?);
    Ok(())
}
