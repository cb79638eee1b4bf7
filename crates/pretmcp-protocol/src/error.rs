//! Error types for protocol operations
//!
//! Covers encoding and decoding of wire messages and shape validation of
//! inbound responses.

use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding wire messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The line parsed as JSON but is not a JSON-RPC 2.0 message
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// A response carried neither `result` nor `error`
    #[error("Malformed response for id {id}: {reason}")]
    MalformedResponse {
        /// Id of the response that failed validation
        id: u64,
        /// What was wrong with it
        reason: String,
    },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
