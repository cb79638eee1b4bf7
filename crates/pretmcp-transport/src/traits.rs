//! Line channel traits
//!
//! The session talks to the server through these two halves. The stdio
//! implementations live in [`crate::line`]; tests plug in in-memory pipes.

use crate::error::Result;
use async_trait::async_trait;

/// Outbound half: writes one newline-terminated frame at a time
#[async_trait]
pub trait LineSink: Send {
    /// Write `line` followed by a single `\n`, then flush
    ///
    /// `line` must not contain a newline itself.
    async fn write_line(&mut self, line: &[u8]) -> Result<()>;

    /// Close the outbound stream
    async fn close(&mut self) -> Result<()>;
}

/// Inbound half: yields complete lines in arrival order
#[async_trait]
pub trait LineSource: Send {
    /// Wait for the next complete line, without its terminator
    ///
    /// Returns `Ok(None)` once the stream has ended.
    async fn read_line(&mut self) -> Result<Option<String>>;
}
