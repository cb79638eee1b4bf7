//! Client for the PRET compliance-data MCP server
//!
//! Launches the PRET server as a child process and talks JSON-RPC 2.0 to it
//! over newline-delimited stdio: the MCP `initialize` handshake followed by
//! `tools/call` requests for GLEIF, EXIM and corporate-registration lookups.
//!
//! # Key Features
//!
//! - **Pipelined calls**: any number of concurrent requests per session, matched by id
//! - **Deadlines**: every call has a timeout; late responses are dropped
//! - **Clean shutdown**: terminating a session fails outstanding calls and stops the process
//! - **Value-shaped failures**: tool calls yield `{success, data|error}` instead of errors
//!
//! # Architecture
//!
//! 1. **Protocol Layer** (`pretmcp-protocol`): wire and MCP message types
//! 2. **Transport Layer** (`pretmcp-transport`): process supervision and line framing
//! 3. **Session Layer** (this crate): correlation, dispatch, tools and the lazy client
//!
//! # Usage Example
//!
//! ```no_run
//! use pretmcp::{PretClient, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PretClient::new(SessionConfig::from_env()?);
//!
//!     let outcome = client.get_gleif_data("ACME LTD").await;
//!     println!("{}", serde_json::to_string_pretty(&outcome)?);
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod tools;

mod correlation;
mod dispatcher;

// Re-export commonly used types
pub use catalog::{ComplianceTool, ToolDescriptor, catalog};
pub use client::PretClient;
pub use config::SessionConfig;
pub use error::{ClientError, ErrorRecovery, Result};
pub use session::{ConnectionState, Session};
pub use tools::{ToolCallOutcome, ToolFailure};

pub use pretmcp_protocol::{CallToolResult, InitializeResult, JsonRpcRequest};
pub use pretmcp_transport::{LineSink, LineSource, ProcessConfig};
