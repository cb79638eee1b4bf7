//! Process management for the compliance server subprocess

use super::stderr;
use crate::error::{Result, TransportError};
use crate::line::{LineReader, LineWriter};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Callback invoked with every line the server writes to stderr
pub type StderrCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Configuration for spawning the server process
#[derive(Clone)]
pub struct ProcessConfig {
    /// Executable to run
    pub command: String,

    /// Arguments to pass to the executable
    pub args: Vec<String>,

    /// Environment variables to set
    pub env: HashMap<String, String>,

    /// Whether the child inherits the parent environment
    pub inherit_env: bool,

    /// Working directory for the child
    pub working_dir: Option<PathBuf>,

    /// How long to wait after SIGTERM before killing the process
    pub terminate_grace: Duration,

    /// Optional observer for stderr lines
    pub stderr_callback: Option<StderrCallback>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            command: "node".to_string(),
            args: vec!["build/pretmcpserver/index.js".to_string()],
            env: HashMap::new(),
            inherit_env: true,
            working_dir: None,
            terminate_grace: Duration::from_secs(2),
            stderr_callback: None,
        }
    }
}

impl fmt::Debug for ProcessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessConfig")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("inherit_env", &self.inherit_env)
            .field("working_dir", &self.working_dir)
            .field("terminate_grace", &self.terminate_grace)
            .field("stderr_callback", &self.stderr_callback.is_some())
            .finish()
    }
}

impl ProcessConfig {
    /// Create a configuration for `command` with no arguments
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            ..Default::default()
        }
    }

    /// Add an argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Control inheritance of the parent environment
    ///
    /// When disabled, only the variables set via [`ProcessConfig::with_env`]
    /// reach the child.
    pub fn with_inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the SIGTERM grace period
    pub fn with_terminate_grace(mut self, grace: Duration) -> Self {
        self.terminate_grace = grace;
        self
    }

    /// Observe stderr lines in addition to logging them
    pub fn with_stderr_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.stderr_callback = Some(Arc::new(callback));
        self
    }

    /// The full command line, for logging
    pub fn display_command(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A freshly started server: its handle plus both ends of the line channel
pub struct SpawnedProcess {
    /// Owner of the child process
    pub handle: ProcessHandle,

    /// Line writer over the child's stdin
    pub writer: LineWriter<ChildStdin>,

    /// Line reader over the child's stdout
    pub reader: LineReader<ChildStdout>,
}

/// Starts server processes
pub struct ProcessSupervisor;

impl ProcessSupervisor {
    /// Spawn the server process described by `config`
    ///
    /// All three standard streams are piped. stderr is drained on a
    /// background task; stdin and stdout are returned as line channels.
    pub async fn start(config: ProcessConfig) -> Result<SpawnedProcess> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);

        if !config.inherit_env {
            cmd.env_clear();
        }
        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| TransportError::Spawn {
            command: config.command.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Process("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Process("Failed to get stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TransportError::Process("Failed to get stderr".to_string()))?;

        let pid = child.id();
        info!(command = %config.display_command(), pid = pid, "Started server process");

        let drain = stderr::spawn_drain(
            stderr,
            config.command.clone(),
            config.stderr_callback.clone(),
        );

        Ok(SpawnedProcess {
            handle: ProcessHandle {
                child: Mutex::new(Some(child)),
                pid,
                drain: std::sync::Mutex::new(Some(drain)),
                config,
            },
            writer: LineWriter::new(stdin),
            reader: LineReader::new(stdout),
        })
    }
}

/// Handle to a running server process
///
/// Dropping the handle kills the process.
pub struct ProcessHandle {
    child: Mutex<Option<Child>>,
    pid: Option<u32>,
    drain: std::sync::Mutex<Option<JoinHandle<()>>>,
    config: ProcessConfig,
}

impl ProcessHandle {
    /// OS process id, if the process was running when spawned
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Get the process configuration
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Check if the process is still alive
    pub async fn is_alive(&self) -> bool {
        let mut child = self.child.lock().await;
        match child.as_mut() {
            Some(child) => child.try_wait().ok().flatten().is_none(),
            None => false,
        }
    }

    /// Terminate the process
    ///
    /// Sends SIGTERM (a hard kill on non-Unix platforms), waits up to the
    /// configured grace period, then kills. Calling this on a process that
    /// already exited or was already terminated does nothing.
    pub async fn terminate(&self) -> Result<()> {
        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };

        if let Ok(Some(status)) = child.try_wait() {
            debug!(pid = self.pid, %status, "Server process already exited");
            self.finish_drain().await;
            return Ok(());
        }

        if let Err(e) = request_stop(&mut child) {
            debug!(pid = self.pid, error = %e, "Graceful stop request failed");
        }

        match tokio::time::timeout(self.config.terminate_grace, child.wait()).await {
            Ok(Ok(status)) => {
                info!(pid = self.pid, %status, "Server process terminated");
            }
            Ok(Err(e)) => {
                return Err(TransportError::Process(format!(
                    "Failed to wait for process: {}",
                    e
                )));
            }
            Err(_) => {
                warn!(
                    pid = self.pid,
                    grace_ms = self.config.terminate_grace.as_millis() as u64,
                    "Server process ignored SIGTERM, killing"
                );
                child
                    .kill()
                    .await
                    .map_err(|e| TransportError::Process(format!("Failed to kill process: {}", e)))?;
            }
        }

        self.finish_drain().await;
        Ok(())
    }

    /// Let the stderr drain flush its last lines, then stop it
    async fn finish_drain(&self) {
        let drain = self
            .drain
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(mut drain) = drain
            && tokio::time::timeout(Duration::from_millis(200), &mut drain)
                .await
                .is_err()
        {
            drain.abort();
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if let Some(drain) = self
            .drain
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
        {
            drain.abort();
        }
    }
}

#[cfg(unix)]
fn request_stop(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    match child.id().map(i32::try_from) {
        Some(Ok(pid)) => kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(std::io::Error::from),
        Some(Err(_)) => child.start_kill(),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}
