//! The `RpcTransport` trait: how the gateway reaches a Lotus node.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// Async JSON-RPC transport.
///
/// Implementations must be `Send + Sync` for use across Tokio tasks. The
/// HTTP client is the production implementation; tests plug in canned
/// responses.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// The transport's identifier (URL or name).
    fn url(&self) -> &str;

    /// Id for the next request.
    fn next_id(&self) -> u64 {
        1
    }

    /// Call a method and deserialize the result.
    async fn call<T: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, TransportError> {
        let req = JsonRpcRequest::new(self.next_id(), method, params);
        let resp = self.send(req).await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        serde_json::from_value(result).map_err(TransportError::Deserialization)
    }
}
