//! `janus.yaml`: file configuration, overridden by flags and environment.
//!
//! ```yaml
//! node:
//!   endpoint: http://127.0.0.1:1234/rpc/v1
//!   token: eyJhbGciOi...
//!   timeout_secs: 30
//!   retry: { max_retries: 3, initial_backoff_ms: 200 }
//! storage:
//!   url: sqlite:./janus.db
//! indexer:
//!   floor_height: 5200000
//!   confirmation_depth: 20
//!   batch_size: 1000
//!   interval_secs: 10
//! log:
//!   level: info
//!   json: false
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use janus_core::IndexerConfig;
use janus_lotus::LotusConfig;

use crate::logging::LogConfig;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "janus.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `memory`, `sqlite:<path>` or `postgres://…`.
    pub url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: "memory".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JanusConfig {
    pub node: LotusConfig,
    pub storage: StorageConfig,
    pub indexer: IndexerConfig,
    pub log: LogConfig,
}

/// Values given on the command line (or their env fallbacks).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub node_endpoint: Option<String>,
    pub node_token: Option<String>,
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_json: bool,
}

impl JanusConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty file is valid and means "all defaults".
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("parse config YAML")
    }

    /// Load `path`, or `janus.yaml` if it exists, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Path::new(DEFAULT_CONFIG_FILE),
            None => return Ok(Self::default()),
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config file '{}'", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in '{}'", path.display()))
    }

    pub fn apply(&mut self, o: Overrides) {
        if let Some(endpoint) = o.node_endpoint {
            self.node.endpoint = endpoint;
        }
        if let Some(token) = o.node_token {
            self.node.token = Some(token);
        }
        if let Some(url) = o.database_url {
            self.storage.url = url;
        }
        if let Some(level) = o.log_level {
            self.log.level = level;
        }
        if o.log_json {
            self.log.json = true;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.indexer.validate().context("invalid indexer config")?;
        anyhow::ensure!(!self.node.endpoint.is_empty(), "node endpoint is empty");
        Ok(())
    }
}
