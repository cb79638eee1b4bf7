//! Tool invocation with failures folded into values
//!
//! [`Session::call_tool`] never returns an error: every failure becomes a
//! [`ToolCallOutcome::Failure`], which serializes to
//! `{"success": false, "error": ...}`. Successes serialize to
//! `{"success": true, "data": <raw result>}`.

use crate::error::ClientError;
use crate::session::Session;
use pretmcp_protocol::{CallToolParams, CallToolResult, METHOD_TOOLS_CALL};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Why a tool call failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    /// Machine-readable error kind, e.g. `timeout` or `remote_error`
    pub kind: String,

    /// Human-readable description
    pub message: String,

    /// JSON-RPC error code, for server-reported errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,

    /// Structured detail sent by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<&ClientError> for ToolFailure {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::Remote {
                code,
                message,
                data,
            } => Self {
                kind: err.kind().to_string(),
                message: message.clone(),
                code: Some(*code),
                data: data.clone(),
            },
            other => Self {
                kind: other.kind().to_string(),
                message: other.to_string(),
                code: None,
                data: None,
            },
        }
    }
}

impl From<ClientError> for ToolFailure {
    fn from(err: ClientError) -> Self {
        Self::from(&err)
    }
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Result of a tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallOutcome {
    /// The server returned a `result`
    Success {
        /// Raw `result` value
        data: Value,
    },

    /// The call failed at any layer
    Failure {
        /// What went wrong
        error: ToolFailure,
    },
}

impl ToolCallOutcome {
    /// Build a failure from a client error
    pub fn from_error(err: &ClientError) -> Self {
        Self::Failure {
            error: ToolFailure::from(err),
        }
    }

    /// Whether the call succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Raw result value of a successful call
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Success { data } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    /// Failure detail of a failed call
    pub fn error(&self) -> Option<&ToolFailure> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }

    /// Convert into a `Result`
    pub fn into_result(self) -> Result<Value, ToolFailure> {
        match self {
            Self::Success { data } => Ok(data),
            Self::Failure { error } => Err(error),
        }
    }

    /// Decode the result as an MCP `CallToolResult`
    pub fn tool_result(&self) -> Option<serde_json::Result<CallToolResult>> {
        self.data().map(CallToolResult::deserialize)
    }

    /// Text of the first content item
    pub fn first_text(&self) -> Option<String> {
        match self.tool_result()? {
            Ok(result) => result.first_text().map(str::to_string),
            Err(_) => None,
        }
    }

    /// First content item parsed as a JSON document
    ///
    /// The compliance server embeds its registry payload as a JSON string in
    /// `content[0].text`.
    pub fn text_json(&self) -> Option<serde_json::Result<Value>> {
        self.first_text().map(|text| serde_json::from_str(&text))
    }

    /// The `{success, data|error}` JSON shape
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for ToolCallOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Self::Success { data } => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("data", data)?;
            }
            Self::Failure { error } => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
            }
        }
        map.end()
    }
}

impl Session {
    /// Invoke a server tool through `tools/call`
    pub async fn call_tool(&self, name: &str, arguments: Value, timeout: Duration) -> ToolCallOutcome {
        let params = match serde_json::to_value(CallToolParams::new(name, arguments)) {
            Ok(params) => params,
            Err(e) => return ToolCallOutcome::from_error(&ClientError::from(e)),
        };

        match self.call(METHOD_TOOLS_CALL, params, timeout).await {
            Ok(data) => {
                debug!(tool = name, "Tool call succeeded");
                ToolCallOutcome::Success { data }
            }
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                ToolCallOutcome::from_error(&e)
            }
        }
    }

    /// [`call_tool`](Session::call_tool) with the configured request timeout
    pub async fn call_tool_default(&self, name: &str, arguments: Value) -> ToolCallOutcome {
        self.call_tool(name, arguments, self.config.request_timeout).await
    }
}
