//! JSON-RPC session with the compliance server
//!
//! # Module Organization
//!
//! - [`state`] - Connection state machine
//! - [`core`] - The [`Session`] struct and its lifecycle (start, connect, terminate)
//! - `request` - The `initialize` handshake and request execution
//!
//! # Examples
//!
//! ```no_run
//! # use pretmcp::{Session, SessionConfig};
//! # use serde_json::json;
//! # async fn example() -> pretmcp::Result<()> {
//! let session = Session::connect(SessionConfig::from_env()?).await?;
//! let result = session
//!     .call_default("tools/call", json!({"name": "get-GLEIF-data", "arguments": {"companyName": "ACME LTD"}}))
//!     .await?;
//! session.terminate().await?;
//! # Ok(())
//! # }
//! ```

pub mod core;
mod request;
pub mod state;

pub use self::core::Session;
pub use self::state::ConnectionState;
