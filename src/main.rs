//! aap-bridge: MCP server for the Ansible Automation Platform controller.
//!
//! Usage:
//!   aap-bridge serve        Serve MCP over stdin/stdout
//!   aap-bridge check        Check that the controller is reachable
//!   aap-bridge tools        Print the tool definitions as JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use aap_bridge::config::{self, BridgeConfig};
use aap_bridge::controller::ControllerClient;
use aap_bridge::jobs::JobTracker;
use aap_bridge::server::McpServer;
use aap_bridge::tools::{builtin_registry, handlers::CheckConnectivity, Dispatcher};
use aap_bridge::types::{ToolInvocation, ToolResult};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "aap-bridge")]
#[command(version)]
#[command(about = "MCP tool bridge for the Ansible Automation Platform controller")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file.
    #[arg(long, default_value = "~/.aap-bridge/config.toml")]
    config: String,

    /// Log level (debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve MCP over stdin/stdout.
    Serve,

    /// Check connectivity and credentials against the controller.
    Check,

    /// Print the tool definitions as JSON.
    Tools,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = PathBuf::from(shellexpand::tilde(&cli.config).into_owned());
    let cfg = config::resolve_config(&config_path)?;

    // stdout belongs to the protocol; logs go to stderr.
    let level = cli.log_level.as_deref().unwrap_or(&cfg.log_level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve => cmd_serve(&cfg, &config_path).await,
        Commands::Check => cmd_check(&cfg, &config_path).await,
        Commands::Tools => cmd_tools(&cfg, &config_path),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_serve(cfg: &BridgeConfig, config_path: &Path) -> Result<()> {
    let dispatcher = bootstrap(cfg, config_path)?;
    let server = McpServer::new(dispatcher);

    tokio::select! {
        result = server.serve_stdio() => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            warn!("Interrupted; abandoning in-flight tool calls");
            Ok(())
        }
    }
}

async fn cmd_check(cfg: &BridgeConfig, config_path: &Path) -> Result<()> {
    let dispatcher = bootstrap(cfg, config_path)?;

    eprintln!();
    eprintln!("{}", "=== AAP Controller ===".bold());
    eprintln!();
    eprintln!("  {}:  {}", "URL".bold(), cfg.base_url.trim());
    eprintln!("  {}:  {}", "Auth".bold(), auth_mode(cfg));
    eprintln!(
        "  {}:  {}",
        "TLS".bold(),
        if cfg.verify_ssl {
            "verified".green().to_string()
        } else {
            "NOT verified".yellow().to_string()
        }
    );

    let result = dispatcher
        .dispatch(ToolInvocation::new(CheckConnectivity::NAME, serde_json::json!({})))
        .await;

    match &result {
        ToolResult::Success { payload } => {
            eprintln!("  {}:  {}", "Status".bold(), "reachable".green());
            if let Some(version) = payload["version"].as_str() {
                eprintln!("  {}:  {}", "Version".bold(), version);
            }
            if let Some(node) = payload["active_node"].as_str() {
                eprintln!("  {}:  {}", "Node".bold(), node);
            }
            eprintln!();
            Ok(())
        }
        ToolResult::Failure { kind, message } => {
            eprintln!("  {}:  {}", "Status".bold(), kind.to_string().red().bold());
            eprintln!("  {}:  {}", "Detail".bold(), message);
            eprintln!();
            anyhow::bail!("controller check failed ({kind})")
        }
    }
}

fn cmd_tools(cfg: &BridgeConfig, config_path: &Path) -> Result<()> {
    let dispatcher = bootstrap(cfg, config_path)?;
    let defs = dispatcher.registry().definitions();
    let rendered =
        serde_json::to_string_pretty(&defs).context("Failed to serialize tool definitions")?;
    println!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate config and wire client, tracker, registry and dispatcher.
fn bootstrap(cfg: &BridgeConfig, config_path: &Path) -> Result<Dispatcher> {
    let connection = cfg.connection().with_context(|| {
        format!(
            "Invalid controller configuration (file: {}, plus AAP_* environment)",
            config_path.display()
        )
    })?;
    info!(
        "Controller {} (timeout {:?})",
        connection.base_url(),
        connection.timeout
    );

    let client = ControllerClient::new(Arc::new(connection))
        .context("Failed to build controller HTTP client")?;
    let registry = builtin_registry(Arc::new(client), JobTracker::new())
        .context("Failed to register tools")?;

    Ok(Dispatcher::new(Arc::new(registry)))
}

fn auth_mode(cfg: &BridgeConfig) -> &'static str {
    if cfg.token.as_deref().is_some_and(|t| !t.trim().is_empty()) {
        "token"
    } else {
        "basic"
    }
}
