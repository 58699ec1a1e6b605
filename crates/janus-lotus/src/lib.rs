//! janus-lotus: Lotus full-node gateway for the Janus indexer.
//!
//! [`LotusGateway`] implements [`janus_core::NodeGateway`] on top of any
//! [`RpcTransport`]; [`HttpRpcClient`] is the HTTP transport with bearer
//! authentication and exponential-backoff retry.
//!
//! # Quick Start
//! ```rust,no_run
//! use janus_lotus::{LotusConfig, LotusGateway};
//! use janus_core::NodeGateway;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = LotusGateway::connect(LotusConfig {
//!     endpoint: "http://127.0.0.1:1234/rpc/v1".into(),
//!     ..Default::default()
//! })?;
//! let head = gateway.head_height().await?;
//! println!("head = {head}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod gateway;
pub mod request;
pub mod retry;
pub mod transport;

pub use client::{HttpRpcClient, LotusConfig};
pub use error::TransportError;
pub use gateway::LotusGateway;
pub use request::{CidLink, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use retry::{RetryConfig, RetryPolicy};
pub use transport::RpcTransport;
