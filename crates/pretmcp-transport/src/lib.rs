//! Stdio transport layer for the PRET compliance client
//!
//! Launches the compliance server as a child process and exposes its standard
//! streams as newline-delimited line channels. The RPC session in the
//! `pretmcp` crate sits on top of the [`LineSink`] / [`LineSource`] traits and
//! never touches the child process directly.
//!
//! # Architecture
//!
//! - **Process supervision**: [`ProcessSupervisor`] spawns the child, [`ProcessHandle`] owns and terminates it
//! - **Line framing**: [`LineWriter`] / [`LineReader`] over any async byte stream
//! - **Diagnostics**: the child's stderr is drained to `tracing` on a side task
//! - **Error handling**: [`TransportError`] covers spawn, write and framing failures
//!
//! # Usage
//!
//! ```no_run
//! use pretmcp_transport::{LineSink, LineSource, ProcessConfig, ProcessSupervisor};
//!
//! # async fn example() -> pretmcp_transport::Result<()> {
//! let config = ProcessConfig::new("node").with_arg("build/pretmcpserver/index.js");
//! let mut spawned = ProcessSupervisor::start(config).await?;
//! spawned.writer.write_line(br#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{}}"#).await?;
//! let reply = spawned.reader.read_line().await?;
//! spawned.handle.terminate().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod line;
pub mod subprocess;
pub mod traits;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use line::{LineReader, LineWriter};
pub use subprocess::{ProcessConfig, ProcessHandle, ProcessSupervisor, SpawnedProcess, StderrCallback};
pub use traits::{LineSink, LineSource};
