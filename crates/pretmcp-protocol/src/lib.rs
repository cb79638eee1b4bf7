//! Wire types for talking to the PRET compliance server
//!
//! This crate holds the pure data structures exchanged with the compliance
//! server over its standard streams. Nothing here performs I/O; the transport
//! and session crates own the pipes and the correlation table.
//!
//! # Type Organization
//!
//! - **JSON-RPC framing**: [`jsonrpc`] - requests, responses, error objects, inbound classification
//! - **MCP payloads**: [`mcp`] - the `initialize` handshake and `tools/call` shapes
//! - **Error types**: [`error`] - parse and shape errors
//!
//! Every message is a single line of JSON. Serializing a [`JsonRpcRequest`]
//! never produces an embedded newline, so one line always carries exactly one
//! document.
//!
//! # Usage
//!
//! ```
//! use pretmcp_protocol::{Inbound, JsonRpcRequest};
//! use serde_json::json;
//!
//! let request = JsonRpcRequest::new(1, "tools/call", json!({"name": "get-GLEIF-data"}));
//! let line = request.to_line().unwrap();
//! assert!(!line.contains('\n'));
//!
//! let inbound = Inbound::parse(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#).unwrap();
//! assert!(matches!(inbound, Inbound::Response(_)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod jsonrpc;
pub mod mcp;

// Re-export commonly used types at crate level
pub use error::{ProtocolError, Result};
pub use jsonrpc::{
    Inbound, JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse, ResponseOutcome, RpcErrorObject,
};
pub use mcp::{
    CallToolParams, CallToolResult, ClientCapabilities, ContentItem, Implementation,
    InitializeParams, InitializeResult, MCP_PROTOCOL_VERSION, METHOD_INITIALIZE, METHOD_TOOLS_CALL,
};
