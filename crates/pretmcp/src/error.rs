//! Error types for the compliance client
//!
//! Every error carries recovery guidance through [`ErrorRecovery`]: whether a
//! retry can help, whether the session is still usable, and what the operator
//! should do about it.

use crate::session::ConnectionState;
use pretmcp_protocol::ProtocolError;
use pretmcp_transport::TransportError;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Error recovery guidance
pub trait ErrorRecovery {
    /// Whether repeating the same operation may succeed
    fn is_retriable(&self) -> bool;

    /// Whether the session that produced this error can no longer be used
    fn is_session_fatal(&self) -> bool;

    /// User-facing action to take
    fn suggested_action(&self) -> &'static str;
}

/// Errors that can occur in session operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server process could not be started
    #[error("Failed to start compliance server: {0}")]
    Spawn(#[source] TransportError),

    /// A request could not be written to the server
    #[error("Failed to send request: {0}")]
    Write(#[source] TransportError),

    /// The session has not completed the handshake
    #[error("Session not ready (state: {state})")]
    NotReady {
        /// State the session was in
        state: ConnectionState,
    },

    /// The server answered with a JSON-RPC error
    #[error("Server error {code}: {message}")]
    Remote {
        /// JSON-RPC error code
        code: i64,
        /// Error message
        message: String,
        /// Optional structured detail
        data: Option<Value>,
    },

    /// No response arrived before the deadline
    #[error("Request {} ({method}) timed out after {timeout:?}", request_label(.id))]
    Timeout {
        /// Id of the abandoned request, `None` if it never reached the writer
        id: Option<u64>,
        /// Method of the abandoned request
        method: String,
        /// Deadline that elapsed
        timeout: Duration,
    },

    /// The server closed its output or the session was terminated
    #[error("Connection to compliance server closed")]
    ConnectionClosed,

    /// The matching response carried neither `result` nor `error`
    #[error("Malformed response for request {id}: {reason}")]
    MalformedResponse {
        /// Id of the offending response
        id: u64,
        /// Validation failure
        reason: String,
    },

    /// Encoding or decoding failure
    #[error("Protocol error: {0}")]
    Protocol(ProtocolError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Process management failure during shutdown
    #[error("Transport error: {0}")]
    Transport(#[source] TransportError),
}

impl ClientError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Spawn(_) => "spawn_error",
            Self::Write(_) => "write_error",
            Self::NotReady { .. } => "not_ready",
            Self::Remote { .. } => "remote_error",
            Self::Timeout { .. } => "timeout",
            Self::ConnectionClosed => "connection_closed",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Protocol(_) => "protocol_error",
            Self::Config(_) => "config_error",
            Self::Transport(_) => "transport_error",
        }
    }
}

fn request_label(id: &Option<u64>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => "<unsent>".to_string(),
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::MalformedResponse { id, reason } => {
                Self::MalformedResponse { id, reason }
            }
            other => Self::Protocol(other),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(ProtocolError::from(err))
    }
}

impl ErrorRecovery for ClientError {
    fn is_retriable(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::Timeout { .. })
    }

    fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Self::Spawn(_) | Self::Write(_) | Self::ConnectionClosed | Self::Transport(_)
        )
    }

    fn suggested_action(&self) -> &'static str {
        match self {
            Self::Spawn(_) => {
                "Check that the server command is installed and PRET_MCP_SERVER_PATH points at the built server"
            }
            Self::Write(_) | Self::ConnectionClosed => {
                "The server process exited. Check its stderr output and start a new session"
            }
            Self::NotReady { .. } => "Call initialize() before issuing requests",
            Self::Remote { .. } => "Check the tool name and arguments, then retry",
            Self::Timeout { .. } => "Retry the request or raise PRET_MCP_TIMEOUT_SECS",
            Self::MalformedResponse { .. } | Self::Protocol(_) => {
                "The server sent an unexpected payload. Check the server version"
            }
            Self::Config(_) => "Fix the configuration and try again",
            Self::Transport(_) => "The server may still be running. Terminate it manually",
        }
    }
}
