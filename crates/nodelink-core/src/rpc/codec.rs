//! JSON-RPC 2.0 wire types and message classification.
//!
//! Outbound calls are encoded as request objects with positional params:
//!
//! ```text
//! {"jsonrpc":"2.0","method":"header.LocalHead","params":[],"id":"<uuid>"}
//! ```
//!
//! Inbound messages are classified once into [`Message`]: anything carrying a
//! `method` is a subscription notification, anything else carrying an `id` is
//! a response to one of our calls.

use crate::config::RpcConfig;
use crate::{Result, RpcError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: String,
}

impl RpcRequest {
    /// Create a new JSON-RPC 2.0 request.
    pub fn new(method: impl Into<String>, params: Vec<Value>, id: impl Into<String>) -> Self {
        Self {
            jsonrpc: RpcConfig::JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: id.into(),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<ErrorObject> for RpcError {
    fn from(err: ErrorObject) -> Self {
        RpcError::RemoteCallFailed {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

/// Response correlated to an earlier request by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: String,
    pub outcome: std::result::Result<Value, ErrorObject>,
}

/// Server-pushed item for an open subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    pub subscription_id: String,
    pub item: Value,
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Response(Response),
    Notification(Notification),
}

/// Serialize a call into its request payload.
pub fn encode_request(method: &str, params: Vec<Value>, id: &str) -> Result<String> {
    let request = RpcRequest::new(method, params, id);
    Ok(serde_json::to_string(&request)?)
}

/// Classify a raw inbound message.
pub fn decode_message(raw: &str) -> Result<Message> {
    let value: Value = serde_json::from_str(raw).map_err(|e| RpcError::MalformedMessage {
        message: format!("invalid JSON: {}", e),
    })?;

    let Value::Object(mut object) = value else {
        return Err(malformed("expected a JSON object"));
    };

    if let Some(method) = object.remove("method") {
        let method = match method {
            Value::String(method) => method,
            _ => return Err(malformed("notification method is not a string")),
        };
        let params = match object.remove("params") {
            Some(Value::Array(params)) if params.len() == 2 => params,
            _ => {
                return Err(malformed(
                    "notification params must be [subscription_id, item]",
                ))
            }
        };
        let mut params = params.into_iter();
        let subscription_id = params
            .next()
            .as_ref()
            .and_then(normalize_id)
            .ok_or_else(|| malformed("subscription id must be a string or integer"))?;
        let item = params.next().unwrap_or(Value::Null);

        return Ok(Message::Notification(Notification {
            method,
            subscription_id,
            item,
        }));
    }

    let Some(id) = object.get("id") else {
        return Err(malformed("message has neither `method` nor `id`"));
    };
    let id = normalize_id(id).ok_or_else(|| malformed("response id must be a string or integer"))?;

    let outcome = match object.remove("error") {
        Some(Value::Null) | None => Ok(object.remove("result").unwrap_or(Value::Null)),
        Some(error) => Err(serde_json::from_value::<ErrorObject>(error)
            .map_err(|e| malformed(format!("invalid error object: {}", e)))?),
    };

    Ok(Message::Response(Response { id, outcome }))
}

/// Render a wire id as the string key used by the engine tables.
pub(crate) fn normalize_id(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

fn malformed(message: impl Into<String>) -> RpcError {
    RpcError::MalformedMessage {
        message: message.into(),
    }
}
