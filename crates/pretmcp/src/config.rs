//! Session configuration

use crate::error::{ClientError, Result};
use pretmcp_protocol::{ClientCapabilities, Implementation, InitializeParams, MCP_PROTOCOL_VERSION};
use pretmcp_transport::ProcessConfig;
use std::env;
use std::time::Duration;

/// Executable used to run the server
pub const ENV_SERVER_COMMAND: &str = "PRET_MCP_SERVER_COMMAND";

/// Path of the server entry script, passed as the first argument
pub const ENV_SERVER_PATH: &str = "PRET_MCP_SERVER_PATH";

/// Extra whitespace-separated server arguments
pub const ENV_SERVER_ARGS: &str = "PRET_MCP_SERVER_ARGS";

/// Per-request timeout in whole seconds
pub const ENV_TIMEOUT_SECS: &str = "PRET_MCP_TIMEOUT_SECS";

/// Default server executable
pub const DEFAULT_SERVER_COMMAND: &str = "node";

/// Default server entry script
pub const DEFAULT_SERVER_PATH: &str = "build/pretmcpserver/index.js";

/// Client name announced in the handshake
pub const DEFAULT_CLIENT_NAME: &str = "PRET-Rust-Client";

/// Configuration for a compliance server session
///
/// Controls which server process is launched, how long calls may wait, and
/// how the client identifies itself during the handshake.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server process to launch
    pub server: ProcessConfig,

    /// Deadline for each request after the handshake
    pub request_timeout: Duration,

    /// Deadline for the `initialize` handshake
    pub initialize_timeout: Duration,

    /// Protocol revision announced in the handshake
    pub protocol_version: String,

    /// Client identity announced in the handshake
    pub client_info: Implementation,

    /// Capabilities announced in the handshake
    pub capabilities: ClientCapabilities,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server: ProcessConfig::new(DEFAULT_SERVER_COMMAND).with_arg(DEFAULT_SERVER_PATH),
            request_timeout: Duration::from_secs(15),
            initialize_timeout: Duration::from_secs(30),
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            client_info: Implementation::new(DEFAULT_CLIENT_NAME, env!("CARGO_PKG_VERSION")),
            capabilities: ClientCapabilities::default(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `PRET_MCP_*` environment variables
    ///
    /// Unset variables fall back to the defaults. Setting
    /// `PRET_MCP_SERVER_PATH` to an empty string launches the command with no
    /// script argument.
    pub fn from_env() -> Result<Self> {
        let command =
            env::var(ENV_SERVER_COMMAND).unwrap_or_else(|_| DEFAULT_SERVER_COMMAND.to_string());
        let path = env::var(ENV_SERVER_PATH).unwrap_or_else(|_| DEFAULT_SERVER_PATH.to_string());

        let mut server = ProcessConfig::new(command);
        if !path.is_empty() {
            server = server.with_arg(path);
        }
        if let Ok(extra) = env::var(ENV_SERVER_ARGS) {
            server = server.with_args(extra.split_whitespace());
        }

        let mut config = Self::default().with_server(server);
        if let Ok(raw) = env::var(ENV_TIMEOUT_SECS) {
            config.request_timeout = parse_timeout_secs(&raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the server process
    pub fn with_server(mut self, server: ProcessConfig) -> Self {
        self.server = server;
        self
    }

    /// Launch `command` with `args` instead of the default server
    pub fn with_server_command<I, S>(mut self, command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut server = self.server.clone();
        server.command = command.into();
        server.args = args.into_iter().map(Into::into).collect();
        self.server = server;
        self
    }

    /// Set the per-request deadline
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the handshake deadline
    pub fn with_initialize_timeout(mut self, timeout: Duration) -> Self {
        self.initialize_timeout = timeout;
        self
    }

    /// Set the announced protocol revision
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Set the announced client identity
    pub fn with_client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_info = Implementation::new(name, version);
        self
    }

    /// Set the announced capabilities
    pub fn with_capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Check the configuration for values that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.server.command.trim().is_empty() {
            return Err(ClientError::config("server command is empty"));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::config("request timeout must be positive"));
        }
        if self.initialize_timeout.is_zero() {
            return Err(ClientError::config("initialize timeout must be positive"));
        }
        Ok(())
    }

    /// Parameters of the `initialize` request
    pub fn initialize_params(&self) -> InitializeParams {
        InitializeParams {
            protocol_version: self.protocol_version.clone(),
            capabilities: self.capabilities.clone(),
            client_info: self.client_info.clone(),
        }
    }
}

fn parse_timeout_secs(raw: &str) -> Result<Duration> {
    let secs: u64 = raw.trim().parse().map_err(|_| {
        ClientError::config(format!(
            "{} must be a whole number of seconds, got {:?}",
            ENV_TIMEOUT_SECS, raw
        ))
    })?;
    if secs == 0 {
        return Err(ClientError::config(format!(
            "{} must be greater than zero",
            ENV_TIMEOUT_SECS
        )));
    }
    Ok(Duration::from_secs(secs))
}
