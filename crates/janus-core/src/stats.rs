//! Daily miner-creation statistics built on top of [`FactStore::daily_stats`].
//!
//! [`FactStore::daily_stats`]: crate::facts::FactStore::daily_stats

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;

use crate::facts::DailyMinerStat;

/// Look-back used when the interval is missing or malformed.
pub const DEFAULT_INTERVAL_DAYS: i64 = 7;

const ATTO_PER_FIL: f64 = 1e18;

/// Parse an interval of the form `"<N>d"` into a day count.
pub fn parse_interval_days(interval: &str) -> i64 {
    interval
        .strip_suffix('d')
        .and_then(|n| n.parse::<i64>().ok())
        .filter(|n| *n >= 0)
        .unwrap_or(DEFAULT_INTERVAL_DAYS)
}

/// Convert a decimal attoFIL string to FIL. Unparseable values count as zero.
pub fn atto_to_fil(atto: &str) -> f64 {
    atto.parse::<f64>().map(|v| v / ATTO_PER_FIL).unwrap_or(0.0)
}

/// The time window covering the last `days` days up to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindow {
    pub start_ts: i64,
    pub end_ts: i64,
    pub start_date: NaiveDate,
    pub days: i64,
}

impl StatsWindow {
    pub fn ending_at(now: DateTime<Utc>, days: i64) -> Self {
        let start = now - Duration::days(days);
        Self {
            start_ts: start.timestamp(),
            end_ts: now.timestamp(),
            start_date: start.date_naive(),
            days,
        }
    }
}

/// Expand sparse per-day rows into a dense `days + 1`-long series starting
/// at `start`.
///
/// Missing days get a zero count. Days whose average cost is zero take the
/// first non-zero cost found in the series, so the cost line has no holes.
pub fn daily_series(rows: &[DailyMinerStat], start: NaiveDate, days: i64) -> Vec<DailyMinerStat> {
    let by_date: HashMap<&str, &DailyMinerStat> =
        rows.iter().map(|r| (r.date.as_str(), r)).collect();

    let mut series: Vec<DailyMinerStat> = (0..=days)
        .map(|d| {
            let date = (start + Duration::days(d)).format("%Y-%m-%d").to_string();
            let (count, cost) = by_date
                .get(date.as_str())
                .map(|r| (r.count, r.cost))
                .unwrap_or((0, 0.0));
            DailyMinerStat { date, count, cost }
        })
        .collect();

    let fill = series
        .iter()
        .map(|s| s.cost)
        .find(|c| *c != 0.0)
        .unwrap_or(0.0);
    for stat in series.iter_mut().filter(|s| s.cost == 0.0) {
        stat.cost = fill;
    }
    series
}
