//! JSON-RPC 2.0 framing types
//!
//! Outbound requests and inbound responses exchanged with the compliance
//! server. Every message travels as one line of JSON (NDJSON framing is handled
//! by the transport crate).

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Protocol version string carried in every message
pub const JSONRPC_VERSION: &str = "2.0";

/// Request sent from the client to the server
///
/// The `id` is allocated by the session and is never reused while the session
/// is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`
    pub jsonrpc: String,

    /// Correlation id, unique within the session
    pub id: u64,

    /// Method name (`initialize`, `tools/call`, ...)
    pub method: String,

    /// Method parameters, normally an object
    pub params: Value,
}

impl JsonRpcRequest {
    /// Create a new request
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }

    /// Serialize to a single line of JSON, without the trailing newline
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a request back from a line
    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Error object carried by a failed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    /// JSON-RPC error code
    pub code: i64,

    /// Human-readable message
    pub message: String,

    /// Optional server-defined details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    /// Create an error object without extra data
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl fmt::Display for RpcErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Response received from the server
///
/// `result` distinguishes an absent field from an explicit `null`: a
/// `"result": null` member deserializes to `Some(Value::Null)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version, `"2.0"` when present
    #[serde(default = "default_version")]
    pub jsonrpc: String,

    /// Id of the request this answers
    pub id: u64,

    /// Success payload
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,

    /// Failure payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

/// Validated content of a response
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// The server returned a `result`
    Result(Value),

    /// The server returned an `error` object
    Error(RpcErrorObject),
}

impl JsonRpcResponse {
    /// Build a success response
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response
    pub fn failure(id: u64, error: RpcErrorObject) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Validate the response shape
    ///
    /// Exactly one of `result` and `error` must be present; anything else is a
    /// malformed reply.
    pub fn into_outcome(self) -> Result<ResponseOutcome> {
        match (self.result, self.error) {
            (Some(result), None) => Ok(ResponseOutcome::Result(result)),
            (None, Some(error)) => Ok(ResponseOutcome::Error(error)),
            (None, None) => Err(ProtocolError::MalformedResponse {
                id: self.id,
                reason: "response has neither result nor error".to_string(),
            }),
            (Some(_), Some(_)) => Err(ProtocolError::MalformedResponse {
                id: self.id,
                reason: "response has both result and error".to_string(),
            }),
        }
    }
}

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Classification of one inbound line
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A reply to one of our requests
    Response(JsonRpcResponse),

    /// A server notification (has `method`, no `id`)
    Notification {
        /// Notification method
        method: String,
    },

    /// A server-initiated request (has `method` and `id`)
    ServerRequest {
        /// Raw id as sent by the server
        id: Value,
        /// Requested method
        method: String,
    },
}

impl Inbound {
    /// Parse and classify one line read from the server
    ///
    /// Fails when the line is not JSON, not an object, declares a different
    /// protocol version, or is a response whose id is not a non-negative
    /// integer.
    pub fn parse(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        let Value::Object(object) = &value else {
            return Err(ProtocolError::InvalidMessage(
                "message is not a JSON object".to_string(),
            ));
        };

        if let Some(version) = object.get("jsonrpc")
            && version.as_str() != Some(JSONRPC_VERSION)
        {
            return Err(ProtocolError::InvalidMessage(format!(
                "unsupported jsonrpc version {}",
                version
            )));
        }

        if let Some(method) = object.get("method") {
            let method = method
                .as_str()
                .ok_or_else(|| ProtocolError::InvalidMessage("method is not a string".into()))?
                .to_string();
            return Ok(match object.get("id") {
                Some(id) if !id.is_null() => Inbound::ServerRequest {
                    id: id.clone(),
                    method,
                },
                _ => Inbound::Notification { method },
            });
        }

        match object.get("id") {
            Some(id) if id.as_u64().is_some() => {}
            Some(id) => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "response id {} is not a non-negative integer",
                    id
                )));
            }
            None => {
                return Err(ProtocolError::InvalidMessage(
                    "message has neither method nor id".to_string(),
                ));
            }
        }

        let response: JsonRpcResponse = serde_json::from_value(value)?;
        Ok(Inbound::Response(response))
    }
}
