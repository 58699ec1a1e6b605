//! [`NodeGateway`] over the Lotus full-node API.
//!
//! | Operation        | Lotus method                       |
//! |------------------|------------------------------------|
//! | `head_height`    | `Filecoin.ChainHead`               |
//! | `tipset`         | `Filecoin.ChainGetTipSetByHeight`  |
//! | `block_messages` | `Filecoin.ChainGetBlockMessages`   |

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use janus_core::{BlockMeta, Epoch, IndexerError, Message, NodeGateway};

use crate::client::{HttpRpcClient, LotusConfig};
use crate::error::TransportError;
use crate::request::CidLink;
use crate::transport::RpcTransport;

pub const METHOD_CHAIN_HEAD: &str = "Filecoin.ChainHead";
pub const METHOD_TIPSET_BY_HEIGHT: &str = "Filecoin.ChainGetTipSetByHeight";
pub const METHOD_BLOCK_MESSAGES: &str = "Filecoin.ChainGetBlockMessages";

/// Go encodes empty slices as `null`.
fn nullable<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(d).map(Option::unwrap_or_default)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TipSet {
    #[serde(default, deserialize_with = "nullable")]
    cids: Vec<CidLink>,
    #[serde(default, deserialize_with = "nullable")]
    blocks: Vec<BlockHeader>,
    height: Epoch,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlockHeader {
    timestamp: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LotusMessage {
    to: String,
    from: String,
    #[serde(default)]
    nonce: u64,
    #[serde(default)]
    value: String,
    #[serde(default)]
    method: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignedMessage {
    message: LotusMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlockMessages {
    #[serde(default, deserialize_with = "nullable")]
    bls_messages: Vec<LotusMessage>,
    #[serde(default, deserialize_with = "nullable")]
    secpk_messages: Vec<SignedMessage>,
    #[serde(default, deserialize_with = "nullable")]
    cids: Vec<CidLink>,
}

impl LotusMessage {
    fn into_message(self, cid: CidLink) -> Message {
        Message {
            cid: cid.cid,
            from: self.from,
            to: self.to,
            nonce: self.nonce,
            value: if self.value.is_empty() { "0".into() } else { self.value },
            method: self.method,
        }
    }
}

/// Lotus-backed chain gateway.
pub struct LotusGateway<T: RpcTransport> {
    transport: T,
}

impl LotusGateway<HttpRpcClient> {
    /// Connect over HTTP using `config`.
    pub fn connect(config: LotusConfig) -> Result<Self, TransportError> {
        Ok(Self::new(HttpRpcClient::new(config)?))
    }
}

impl<T: RpcTransport> LotusGateway<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: RpcTransport> NodeGateway for LotusGateway<T> {
    async fn head_height(&self) -> Result<Epoch, IndexerError> {
        let head: TipSet = self.transport.call(METHOD_CHAIN_HEAD, vec![]).await?;
        Ok(head.height)
    }

    async fn tipset(&self, epoch: Epoch) -> Result<Vec<BlockMeta>, IndexerError> {
        let ts: TipSet = self
            .transport
            .call(METHOD_TIPSET_BY_HEIGHT, vec![json!(epoch), Value::Null])
            .await?;

        // Lotus answers a null round with the nearest tipset below it.
        if ts.height != epoch {
            tracing::trace!(epoch, returned = ts.height, "null round");
            return Ok(Vec::new());
        }
        if ts.cids.len() != ts.blocks.len() {
            return Err(TransportError::Malformed(format!(
                "tipset {epoch} has {} cids for {} blocks",
                ts.cids.len(),
                ts.blocks.len()
            ))
            .into());
        }

        Ok(ts
            .cids
            .into_iter()
            .zip(ts.blocks)
            .map(|(cid, header)| BlockMeta {
                height: epoch,
                cid: cid.cid,
                timestamp: header.timestamp as i64,
            })
            .collect())
    }

    async fn block_messages(&self, block_cid: &str) -> Result<Vec<Message>, IndexerError> {
        let msgs: BlockMessages = self
            .transport
            .call(METHOD_BLOCK_MESSAGES, vec![json!(CidLink::new(block_cid))])
            .await?;

        let total = msgs.bls_messages.len() + msgs.secpk_messages.len();
        if msgs.cids.len() != total {
            return Err(TransportError::Malformed(format!(
                "block {block_cid} lists {} cids for {total} messages",
                msgs.cids.len()
            ))
            .into());
        }

        // `Cids` lists BLS messages first, then secp256k1 ones.
        let bodies = msgs
            .bls_messages
            .into_iter()
            .chain(msgs.secpk_messages.into_iter().map(|s| s.message));
        Ok(bodies
            .zip(msgs.cids)
            .map(|(body, cid)| body.into_message(cid))
            .collect())
    }
}
