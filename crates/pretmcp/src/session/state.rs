//! Session connection state

use std::fmt;

/// Lifecycle of a session's connection to the server
///
/// `NotStarted → Starting → Ready → Closed`. `Closed` is terminal; any state
/// may move to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No process has been started yet
    #[default]
    NotStarted,

    /// Process running, handshake not completed
    Starting,

    /// Handshake completed, requests accepted
    Ready,

    /// Terminated or the server closed its output
    Closed,
}

impl ConnectionState {
    /// Whether requests other than the handshake are accepted
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }

    /// Whether the state is terminal
    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_default_and_display() {
        assert_eq!(ConnectionState::default(), ConnectionState::NotStarted);
        assert_eq!(ConnectionState::Starting.to_string(), "starting");
        assert_eq!(ConnectionState::Ready.to_string(), "ready");
        assert!(ConnectionState::Ready.is_ready());
        assert!(!ConnectionState::Starting.is_ready());
        assert!(ConnectionState::Closed.is_closed());
    }
}
