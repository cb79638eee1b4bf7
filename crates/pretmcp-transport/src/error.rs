//! Transport error types

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur in transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    /// The child process could not be created
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        /// Executable that was requested
        command: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The child's stdin is closed or the process has exited
    #[error("Write to server stdin failed: {0}")]
    Write(#[source] std::io::Error),

    /// Outbound bytes would not form exactly one line
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Process management error
    #[error("Process error: {0}")]
    Process(String),

    /// I/O error while reading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether this error means the peer can no longer be written to
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Write(_) => true,
            Self::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
