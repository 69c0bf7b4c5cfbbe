use crate::networking::response::ResponseEnvelope;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const JSONRPC_VERSION: &str = "2.0";

/// A request as it travels between peers.
///
/// `method` names the service (`bch`) and `params.endpoint` the operation.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct RpcEnvelope {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl RpcEnvelope {
    pub fn new(id: &str, method: &str, params: Map<String, Value>) -> RpcEnvelope {
        RpcEnvelope {
            jsonrpc: String::from(JSONRPC_VERSION),
            id: id.to_string(),
            method: method.to_string(),
            params,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.params.get("endpoint").and_then(Value::as_str)
    }

    pub fn deserialize(payload: &str) -> serde_json::Result<RpcEnvelope> {
        serde_json::from_str(payload)
    }

    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A decoded request together with the peer it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequestContext {
    pub from: String,
    pub payload: RpcEnvelope,
}

impl RpcRequestContext {
    pub fn new(from: &str, payload: RpcEnvelope) -> Self {
        RpcRequestContext {
            from: from.to_string(),
            payload,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct RpcResult {
    pub method: String,
    /// Node that produced the reply. The spelling is part of the wire format.
    pub reciever: String,
    pub value: ResponseEnvelope,
}

/// Reply to an [`RpcEnvelope`]. Failures are reported inside
/// `result.value`, there is no JSON-RPC `error` member.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: String,
    pub result: RpcResult,
}

impl RpcResponse {
    pub fn new(request: &RpcEnvelope, reciever: &str, value: ResponseEnvelope) -> RpcResponse {
        RpcResponse {
            jsonrpc: String::from(JSONRPC_VERSION),
            id: request.id.clone(),
            result: RpcResult {
                method: request.method.clone(),
                reciever: reciever.to_string(),
                value,
            },
        }
    }

    pub fn deserialize(payload: &str) -> serde_json::Result<RpcResponse> {
        serde_json::from_str(payload)
    }

    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
