//! Request/response correlation
//!
//! Each outstanding request owns one entry in [`PendingCalls`], keyed by its
//! JSON-RPC id. The dispatcher resolves entries as responses arrive; the
//! caller's [`PendingGuard`] removes the entry if the call times out or its
//! future is dropped. An entry is removed exactly once, by whichever side gets
//! there first.

use crate::error::{ClientError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// Outcome delivered to a waiting caller
pub(crate) type CallOutcome = Result<Value>;

#[derive(Default)]
struct Table {
    calls: HashMap<u64, oneshot::Sender<CallOutcome>>,
    closed: bool,
}

/// Correlation table for one session
#[derive(Default)]
pub(crate) struct PendingCalls {
    table: Mutex<Table>,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a pending call for `id`
    ///
    /// Fails with [`ClientError::ConnectionClosed`] once the table has been
    /// closed by [`PendingCalls::fail_all`].
    pub(crate) fn register(
        self: &Arc<Self>,
        id: u64,
    ) -> Result<(PendingGuard, oneshot::Receiver<CallOutcome>)> {
        let (tx, rx) = oneshot::channel();
        {
            let mut table = self.table();
            if table.closed {
                return Err(ClientError::ConnectionClosed);
            }
            table.calls.insert(id, tx);
        }

        let guard = PendingGuard {
            pending: Arc::clone(self),
            id,
        };
        Ok((guard, rx))
    }

    /// Deliver an outcome to the call registered under `id`
    ///
    /// Returns `false` when no such call is pending or its caller is gone.
    pub(crate) fn resolve(&self, id: u64, outcome: CallOutcome) -> bool {
        let sender = self.table().calls.remove(&id);
        match sender {
            Some(sender) => sender.send(outcome).is_ok(),
            None => false,
        }
    }

    /// Remove the call registered under `id` without delivering anything
    pub(crate) fn discard(&self, id: u64) -> bool {
        self.table().calls.remove(&id).is_some()
    }

    /// Close the table and fail every pending call with `ConnectionClosed`
    ///
    /// Returns the number of calls that were failed.
    pub(crate) fn fail_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut table = self.table();
            table.closed = true;
            table.calls.drain().collect()
        };

        let count = drained.len();
        for (_, sender) in drained {
            let _ = sender.send(Err(ClientError::ConnectionClosed));
        }
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.table().calls.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.table().closed
    }
}

/// Removes its pending call on drop
pub(crate) struct PendingGuard {
    pending: Arc<PendingCalls>,
    id: u64,
}

impl PendingGuard {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.discard(self.id);
    }
}
