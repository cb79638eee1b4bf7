//! Handshake and request execution

use super::core::Session;
use super::state::ConnectionState;
use crate::error::{ClientError, Result};
use pretmcp_protocol::{InitializeResult, JsonRpcRequest, METHOD_INITIALIZE, ProtocolError};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How far a request got before its deadline
#[derive(Default)]
struct Progress {
    /// Allocated id, 0 until the writer lock was taken
    id: AtomicU64,
    writing: AtomicBool,
}

impl Progress {
    fn id(&self) -> Option<u64> {
        match self.id.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }
}

impl Session {
    /// Perform the `initialize` handshake
    ///
    /// Moves the session from `Starting` to `Ready` once the server answers.
    /// On a session that is already `Ready` the stored result is returned
    /// without contacting the server. A failed handshake leaves the session
    /// in `Starting`, so it can be retried unless the connection closed.
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let _init = self.init_lock.lock().await;
        if let Some(info) = self.server_info.get() {
            return Ok(info.clone());
        }
        if self.state().is_closed() {
            return Err(ClientError::ConnectionClosed);
        }

        let params = serde_json::to_value(self.config.initialize_params())?;
        let reply = self
            .send_request(METHOD_INITIALIZE, params, self.config.initialize_timeout)
            .await?;
        let result: InitializeResult = serde_json::from_value(reply).map_err(|e| {
            ClientError::Protocol(ProtocolError::InvalidMessage(format!(
                "invalid initialize result: {}",
                e
            )))
        })?;

        let ready = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Starting {
                *state = ConnectionState::Ready;
                true
            } else {
                false
            }
        });
        if !ready {
            return Err(ClientError::ConnectionClosed);
        }

        info!(
            server = result
                .server_info
                .as_ref()
                .map(|info| info.name.as_str())
                .unwrap_or("unknown"),
            protocol_version = result.protocol_version.as_deref().unwrap_or("unspecified"),
            "Session initialized"
        );
        let _ = self.server_info.set(result.clone());
        Ok(result)
    }

    /// Send a request and wait for its response
    ///
    /// Fails with `NotReady` before the handshake completed and with
    /// `ConnectionClosed` once the session is closed. The deadline covers
    /// waiting for the writer, writing the line, and waiting for the reply.
    /// On timeout the call is abandoned; a response arriving later is
    /// dropped. A timeout that interrupts a partly written line also closes
    /// the session.
    pub async fn call(&self, method: &str, params: Value, timeout: Duration) -> Result<Value> {
        self.ensure_ready()?;
        self.send_request(method, params, timeout).await
    }

    /// [`call`](Session::call) with the configured request timeout
    pub async fn call_default(&self, method: &str, params: Value) -> Result<Value> {
        self.call(method, params, self.config.request_timeout).await
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state() {
            ConnectionState::Ready => Ok(()),
            ConnectionState::Closed => Err(ClientError::ConnectionClosed),
            state => Err(ClientError::NotReady { state }),
        }
    }

    async fn send_request(&self, method: &str, params: Value, timeout: Duration) -> Result<Value> {
        let deadline = Instant::now() + timeout;
        let mut closed = self.state.subscribe();
        let progress = Progress::default();

        let outcome = tokio::select! {
            biased;
            outcome = tokio::time::timeout_at(deadline, self.exchange(method, params, &progress)) => outcome,
            _ = async { let _ = closed.wait_for(|state| state.is_closed()).await; } => {
                return Err(ClientError::ConnectionClosed);
            }
        };
        if let Ok(outcome) = outcome {
            return outcome;
        }

        let id = progress.id();
        warn!(?id, method, timeout_ms = timeout.as_millis() as u64, "Request timed out");
        let err = ClientError::Timeout {
            id,
            method: method.to_string(),
            timeout,
        };
        // A line cut off mid-write leaves the stream unframed.
        if progress.writing.load(Ordering::Acquire) {
            self.close_on_error(&err);
        }
        Err(err)
    }

    /// Write one request and wait for its response, without a deadline
    ///
    /// The pending entry lives as long as this future; dropping it removes
    /// the entry.
    async fn exchange(&self, method: &str, params: Value, progress: &Progress) -> Result<Value> {
        // Ids are allocated under the writer lock so wire order matches id order.
        let (_guard, response) = {
            let mut writer = self.writer.lock().await;
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let (guard, response) = self.pending.register(id)?;
            progress.id.store(id, Ordering::Release);

            let line = JsonRpcRequest::new(id, method, params).to_line()?;
            debug!(id, method, "Sending request");

            progress.writing.store(true, Ordering::Release);
            let written = writer.write_line(line.as_bytes()).await;
            progress.writing.store(false, Ordering::Release);

            if let Err(e) = written {
                if self.state().is_closed() {
                    return Err(ClientError::ConnectionClosed);
                }
                let closed = e.is_closed();
                let err = ClientError::Write(e);
                if closed {
                    self.close_on_error(&err);
                }
                return Err(err);
            }
            (guard, response)
        };

        response.await.map_err(|_| ClientError::ConnectionClosed)?
    }

    /// Id the next request will carry
    pub fn next_request_id(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }
}
