//! Inbound message dispatcher
//!
//! A single task owns the read side of the transport. It parses each line,
//! hands responses to their pending calls, and drops everything else. When
//! the stream ends the session is marked closed and every outstanding call
//! fails with `ConnectionClosed`.

use crate::correlation::{CallOutcome, PendingCalls};
use crate::error::ClientError;
use crate::session::ConnectionState;
use pretmcp_protocol::{Inbound, ResponseOutcome};
use pretmcp_transport::LineSource;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Longest line excerpt included in log events
const LOG_EXCERPT_CHARS: usize = 200;

/// What happened to one inbound line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Routed {
    /// Delivered to its pending call
    Delivered,
    /// A response for an id nobody is waiting on
    Unmatched,
    /// Not a response, or not valid at all
    Skipped,
}

/// Start the dispatcher task for one session
pub(crate) fn spawn(
    source: Box<dyn LineSource>,
    pending: Arc<PendingCalls>,
    state: Arc<watch::Sender<ConnectionState>>,
) -> JoinHandle<()> {
    tokio::spawn(message_loop(source, pending, state))
}

async fn message_loop(
    mut source: Box<dyn LineSource>,
    pending: Arc<PendingCalls>,
    state: Arc<watch::Sender<ConnectionState>>,
) {
    let mut delivered = 0u64;
    let mut unmatched = 0u64;
    loop {
        match source.read_line().await {
            Ok(Some(line)) => match route_line(&line, &pending) {
                Routed::Delivered => delivered += 1,
                Routed::Unmatched => unmatched += 1,
                Routed::Skipped => {}
            },
            Ok(None) => {
                info!(delivered, unmatched, "Server closed its output stream");
                break;
            }
            Err(e) => {
                warn!(error = %e, delivered, unmatched, "Failed to read from server");
                break;
            }
        }
    }

    state.send_replace(ConnectionState::Closed);
    let failed = pending.fail_all();
    if failed > 0 {
        warn!(failed, "Outstanding calls failed: connection closed");
    }
}

/// Parse one line and deliver it if it answers a pending call
pub(crate) fn route_line(line: &str, pending: &PendingCalls) -> Routed {
    if line.trim().is_empty() {
        trace!("Skipping blank line");
        return Routed::Skipped;
    }

    let inbound = match Inbound::parse(line) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!(error = %e, line = %excerpt(line), "Discarding malformed line from server");
            return Routed::Skipped;
        }
    };

    let response = match inbound {
        Inbound::Response(response) => response,
        Inbound::Notification { method } => {
            debug!(%method, "Ignoring server notification");
            return Routed::Skipped;
        }
        Inbound::ServerRequest { id, method } => {
            debug!(%id, %method, "Ignoring server-initiated request");
            return Routed::Skipped;
        }
    };

    let id = response.id;
    let outcome: CallOutcome = match response.into_outcome() {
        Ok(ResponseOutcome::Result(value)) => Ok(value),
        Ok(ResponseOutcome::Error(error)) => Err(ClientError::Remote {
            code: error.code,
            message: error.message,
            data: error.data,
        }),
        Err(e) => Err(ClientError::from(e)),
    };

    if pending.resolve(id, outcome) {
        debug!(id, "Delivered response");
        Routed::Delivered
    } else {
        warn!(id, "Dropping response with no pending call");
        Routed::Unmatched
    }
}

fn excerpt(line: &str) -> String {
    if line.chars().count() <= LOG_EXCERPT_CHARS {
        line.to_string()
    } else {
        let mut cut: String = line.chars().take(LOG_EXCERPT_CHARS).collect();
        cut.push_str("...");
        cut
    }
}
