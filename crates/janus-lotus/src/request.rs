//! JSON-RPC 2.0 wire types as spoken by the Lotus API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An IPLD link as Lotus encodes CIDs in JSON: `{"/": "bafy…"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CidLink {
    #[serde(rename = "/")]
    pub cid: String,
}

impl CidLink {
    pub fn new(cid: impl Into<String>) -> Self {
        Self { cid: cid.into() }
    }
}

impl std::fmt::Display for CidLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.cid)
    }
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: Value::from(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: Value::from(id),
            result: None,
            error: Some(error),
        }
    }

    /// The result value, or the node's error object. A missing result is `null`.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_format() {
        let req = JsonRpcRequest::new(7, "Filecoin.ChainGetTipSetByHeight", vec![json!(42), Value::Null]);
        let wire = serde_json::to_value(&req).unwrap();
        assert_eq!(
            wire,
            json!({
                "jsonrpc": "2.0",
                "method": "Filecoin.ChainGetTipSetByHeight",
                "params": [42, null],
                "id": 7
            })
        );
    }

    #[test]
    fn cid_link_encoding() {
        let link = CidLink::new("bafy2bzace");
        assert_eq!(serde_json::to_value(&link).unwrap(), json!({"/": "bafy2bzace"}));
        let back: CidLink = serde_json::from_value(json!({"/": "bafy2bzace"})).unwrap();
        assert_eq!(back, link);
    }

    #[test]
    fn error_response_wins_over_result() {
        let resp: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": 1, "message": "looking for tipset with height greater than start point"}
        }))
        .unwrap();
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code, 1);
    }

    #[test]
    fn missing_result_is_null() {
        let resp: JsonRpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1})).unwrap();
        assert_eq!(resp.into_result().unwrap(), Value::Null);
    }
}
