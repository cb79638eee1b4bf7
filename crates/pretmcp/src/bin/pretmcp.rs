use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pretmcp::config::ENV_SERVER_PATH;
use pretmcp::{ComplianceTool, PretClient, SessionConfig, ToolCallOutcome, catalog};
use serde_json::Value;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Query the PRET compliance server from the command line.
///
/// Server settings come from `PRET_MCP_*` environment variables (a `.env`
/// file is loaded first); the flags below override them.
#[derive(Debug, Parser)]
#[command(name = "pretmcp", version, about)]
struct Cli {
    #[command(flatten)]
    overrides: ServerOverrides,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that take precedence over the environment
#[derive(Debug, Default, Args)]
struct ServerOverrides {
    /// Executable that runs the server
    #[arg(long, global = true)]
    server_command: Option<String>,

    /// Server entry script passed as the first argument
    #[arg(long, global = true)]
    server_path: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the known compliance tools
    Tools,
    /// Call any server tool with a JSON arguments object
    Call {
        /// Tool name, e.g. get-GLEIF-data
        name: String,
        /// Arguments object as JSON
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Look up GLEIF Legal Entity Identifier data
    Gleif {
        /// Company name
        #[arg(required = true, num_args = 1..)]
        company: Vec<String>,
    },
    /// Look up Export-Import compliance data
    Exim {
        /// Company name
        #[arg(required = true, num_args = 1..)]
        company: Vec<String>,
    },
    /// Look up corporate registration data by CIN
    Cin {
        /// Corporate Identification Number
        cin: String,
    },
}

impl ServerOverrides {
    fn session_config(&self) -> Result<SessionConfig> {
        let config = SessionConfig::from_env().context("invalid PRET_MCP_* environment")?;
        self.apply(config)
    }

    /// Layer the flags over a config built by `SessionConfig::from_env`
    fn apply(&self, mut config: SessionConfig) -> Result<SessionConfig> {
        if let Some(command) = &self.server_command {
            config.server.command = command.clone();
        }
        if let Some(path) = &self.server_path {
            // `from_env` puts the script path first unless it was set empty.
            let env_path_set = !matches!(std::env::var(ENV_SERVER_PATH), Ok(p) if p.is_empty());
            let extra: Vec<String> = config
                .server
                .args
                .iter()
                .skip(usize::from(env_path_set))
                .cloned()
                .collect();
            config.server.args = std::iter::once(path.clone()).chain(extra).collect();
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (tool, arguments) = match &cli.command {
        Commands::Tools => {
            println!("{}", serde_json::to_string_pretty(&catalog())?);
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Call { name, args } => {
            let arguments: Value =
                serde_json::from_str(args).context("--args must be a JSON object")?;
            anyhow::ensure!(arguments.is_object(), "--args must be a JSON object");
            (name.clone(), arguments)
        }
        Commands::Gleif { company } => compliance_call(ComplianceTool::Gleif, &company.join(" ")),
        Commands::Exim { company } => compliance_call(ComplianceTool::Exim, &company.join(" ")),
        Commands::Cin { cin } => compliance_call(ComplianceTool::CorporateRegistration, cin),
    };

    let client = PretClient::new(cli.overrides.session_config()?);
    let outcome = client.call_tool(&tool, arguments).await;
    if let Err(e) = client.close().await {
        tracing::warn!(error = %e, "Server did not shut down cleanly");
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(exit_code(&outcome))
}

fn compliance_call(tool: ComplianceTool, value: &str) -> (String, Value) {
    (tool.name().to_string(), tool.arguments(value))
}

fn exit_code(outcome: &ToolCallOutcome) -> ExitCode {
    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
