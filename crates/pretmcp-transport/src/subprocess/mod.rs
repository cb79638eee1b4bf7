//! Subprocess transport for the compliance server
//!
//! Spawns the server with piped stdin/stdout/stderr, hands stdin and stdout to
//! the line framing layer, and drains stderr to the log.

pub mod process;
mod stderr;

pub use process::{ProcessConfig, ProcessHandle, ProcessSupervisor, SpawnedProcess, StderrCallback};
