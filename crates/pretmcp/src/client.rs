//! Lazily connected compliance client

use crate::catalog::ComplianceTool;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::{ConnectionState, Session};
use crate::tools::ToolCallOutcome;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Client that owns at most one live [`Session`]
///
/// The server is launched and initialized on the first tool call. Later calls
/// reuse the session; a session that closed (server exit, terminate) is
/// replaced on the next call.
pub struct PretClient {
    config: SessionConfig,
    session: Mutex<Option<Arc<Session>>>,
}

impl PretClient {
    /// Create a client that will launch sessions with `config`
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    /// Create a client configured from `PRET_MCP_*` environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(SessionConfig::from_env()?))
    }

    /// Configuration used for new sessions
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// State of the current session, `NotStarted` if there is none
    pub async fn state(&self) -> ConnectionState {
        match self.session.lock().await.as_ref() {
            Some(session) => session.state(),
            None => ConnectionState::NotStarted,
        }
    }

    /// The live session, connecting first if needed
    pub async fn session(&self) -> Result<Arc<Session>> {
        let mut slot = self.session.lock().await;

        if let Some(session) = slot.as_ref() {
            if session.is_alive().await && session.state().is_ready() {
                return Ok(Arc::clone(session));
            }
            info!(state = %session.state(), "Replacing stale session");
        }

        if let Some(stale) = slot.take()
            && let Err(e) = stale.terminate().await
        {
            debug!(error = %e, "Stale session did not terminate cleanly");
        }

        let session = Arc::new(Session::connect(self.config.clone()).await?);
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Invoke a server tool, connecting first if needed
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallOutcome {
        match self.session().await {
            Ok(session) => session.call_tool_default(name, arguments).await,
            Err(e) => ToolCallOutcome::from_error(&e),
        }
    }

    /// Call a compliance tool with its single argument
    pub async fn call_compliance_tool(&self, tool: ComplianceTool, value: &str) -> ToolCallOutcome {
        self.call_tool(tool.name(), tool.arguments(value)).await
    }

    /// Look up GLEIF Legal Entity Identifier data for a company
    pub async fn get_gleif_data(&self, company_name: &str) -> ToolCallOutcome {
        self.call_compliance_tool(ComplianceTool::Gleif, company_name).await
    }

    /// Look up Export-Import compliance data for a company
    pub async fn get_exim_data(&self, company_name: &str) -> ToolCallOutcome {
        self.call_compliance_tool(ComplianceTool::Exim, company_name).await
    }

    /// Look up corporate registration data by Corporate Identification Number
    pub async fn get_corporate_registration_data(&self, cin: &str) -> ToolCallOutcome {
        self.call_compliance_tool(ComplianceTool::CorporateRegistration, cin).await
    }

    /// Terminate the current session, if any
    pub async fn close(&self) -> Result<()> {
        match self.session.lock().await.take() {
            Some(session) => session.terminate().await,
            None => Ok(()),
        }
    }
}
