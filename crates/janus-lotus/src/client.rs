//! HTTP JSON-RPC client backed by `reqwest`.
//!
//! Transient failures (connection errors, non-2xx statuses, timeouts) are
//! retried with exponential backoff. Errors reported by the node itself are
//! returned on the first attempt.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::transport::RpcTransport;

/// Connection settings for a Lotus node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotusConfig {
    /// JSON-RPC endpoint, e.g. `http://127.0.0.1:1234/rpc/v1`.
    pub endpoint: String,
    /// API token sent as `Authorization: Bearer <token>`.
    pub token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for LotusConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:1234/rpc/v1".into(),
            token: None,
            timeout_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

/// HTTP JSON-RPC client with retry.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    timeout: Duration,
    ids: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(config: LotusConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TransportError::Http(format!("invalid API token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let timeout = Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: config.endpoint,
            http,
            retry: RetryPolicy::new(config.retry),
            timeout,
            ids: AtomicU64::new(1),
        })
    }

    async fn send_once(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let resp = self
            .http
            .post(&self.url)
            .json(req)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        let body = resp.bytes().await.map_err(|e| self.classify(e))?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        with_retry(&self.retry, &req.method, || self.send_once(&req)).await
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.ids.fetch_add(1, Ordering::Relaxed)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    method: &str,
    mut op: F,
) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() => match policy.next_delay(attempt) {
                Some(delay) => {
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        method,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::error!(attempt, error = %e, method, "max retries exceeded");
                    return Err(e);
                }
            },
            Err(e) => return Err(e),
        }
    }
}
