//! Core Session struct and lifecycle methods

use super::state::ConnectionState;
use crate::config::SessionConfig;
use crate::correlation::PendingCalls;
use crate::dispatcher;
use crate::error::{ClientError, Result};
use pretmcp_protocol::InitializeResult;
use pretmcp_transport::{LineSink, LineSource, ProcessHandle, ProcessSupervisor};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, OnceLock, PoisonError};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One JSON-RPC session with a compliance server
///
/// Owns the server process (when it launched one), the write half of the
/// line channel, the correlation table, and the dispatcher task reading the
/// other half. Calls may be issued concurrently from many tasks through a
/// shared reference; share the session with `Arc` when tasks must own it.
///
/// Dropping the session stops the dispatcher and kills the server process.
pub struct Session {
    pub(crate) config: Arc<SessionConfig>,
    pub(crate) process: Option<ProcessHandle>,
    pub(crate) writer: Mutex<Box<dyn LineSink>>,
    pub(crate) pending: Arc<PendingCalls>,
    pub(crate) next_id: AtomicU64,
    pub(crate) state: Arc<watch::Sender<ConnectionState>>,
    pub(crate) server_info: OnceLock<InitializeResult>,
    pub(crate) init_lock: Mutex<()>,
    dispatcher: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Launch the configured server and attach a session to it
    ///
    /// The session is left in `Starting`; call
    /// [`initialize`](Session::initialize) before issuing requests, or use
    /// [`connect`](Session::connect) to do both.
    pub async fn start(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let spawned = ProcessSupervisor::start(config.server.clone())
            .await
            .map_err(ClientError::Spawn)?;

        Ok(Self::assemble(
            config,
            Box::new(spawned.writer),
            Box::new(spawned.reader),
            Some(spawned.handle),
        ))
    }

    /// Launch the server and complete the handshake
    ///
    /// On handshake failure the server process is terminated before the
    /// error is returned.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let session = Self::start(config).await?;
        if let Err(e) = session.initialize().await {
            let _ = session.terminate().await;
            return Err(e);
        }
        Ok(session)
    }

    /// Attach a session to an existing line channel
    ///
    /// No process is owned; [`terminate`](Session::terminate) only closes the
    /// channel. Must be called from within a Tokio runtime.
    pub fn with_transport<W, R>(config: SessionConfig, sink: W, source: R) -> Self
    where
        W: LineSink + 'static,
        R: LineSource + 'static,
    {
        Self::assemble(config, Box::new(sink), Box::new(source), None)
    }

    fn assemble(
        config: SessionConfig,
        sink: Box<dyn LineSink>,
        source: Box<dyn LineSource>,
        process: Option<ProcessHandle>,
    ) -> Self {
        let pending = Arc::new(PendingCalls::new());
        let state = Arc::new(watch::Sender::new(ConnectionState::Starting));
        let dispatcher = dispatcher::spawn(source, Arc::clone(&pending), Arc::clone(&state));

        Self {
            config: Arc::new(config),
            process,
            writer: Mutex::new(sink),
            pending,
            next_id: AtomicU64::new(1),
            state,
            server_info: OnceLock::new(),
            init_lock: Mutex::new(()),
            dispatcher: std::sync::Mutex::new(Some(dispatcher)),
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribe to connection state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Handshake result, once [`initialize`](Session::initialize) succeeded
    pub fn server_info(&self) -> Option<&InitializeResult> {
        self.server_info.get()
    }

    /// Number of calls waiting for a response
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// OS process id of the server, if this session launched one
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(ProcessHandle::pid)
    }

    /// Whether the session is usable and its server process still running
    pub async fn is_alive(&self) -> bool {
        if self.state().is_closed() || self.pending.is_closed() {
            return false;
        }
        match &self.process {
            Some(process) => process.is_alive().await,
            None => true,
        }
    }

    /// Close the session
    ///
    /// Every outstanding call fails with `ConnectionClosed`, later calls fail
    /// immediately, and the server process is stopped (SIGTERM, then SIGKILL
    /// after the configured grace period). Safe to call more than once.
    pub async fn terminate(&self) -> Result<()> {
        let previous = self.state.send_replace(ConnectionState::Closed);
        let failed = self.pending.fail_all();
        if previous != ConnectionState::Closed {
            info!(failed, "Terminating session");
        }

        // A writer blocked on a full pipe must not stall shutdown.
        if let Ok(mut writer) = self.writer.try_lock()
            && let Err(e) = writer.close().await
        {
            debug!(error = %e, "Closing server stdin failed");
        }

        let result = match &self.process {
            Some(process) => process.terminate().await.map_err(ClientError::Transport),
            None => Ok(()),
        };

        self.stop_dispatcher();
        result
    }

    /// Mark the session closed after a fatal transport failure
    pub(crate) fn close_on_error(&self, reason: &ClientError) {
        let previous = self.state.send_replace(ConnectionState::Closed);
        let failed = self.pending.fail_all();
        if previous != ConnectionState::Closed {
            info!(error = %reason, failed, "Session closed");
        }
    }

    fn stop_dispatcher(&self) {
        if let Some(task) = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_dispatcher();
        self.pending.fail_all();
    }
}
