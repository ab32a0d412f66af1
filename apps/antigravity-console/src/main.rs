use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use runtime::{AppConfig, CliArgs, TracedClient};
use session_sync::{SessionSync, SessionSyncConfig};
use std::path::{Path, PathBuf};
use workflow_webhook::{WorkflowWebhook, WorkflowWebhookConfig};

mod commands;
mod console;

const SESSION_SYNC: &str = "session_sync";
const WORKFLOW_WEBHOOK: &str = "workflow_webhook";

/// Antigravity Console - operator shell for session sync and workflow triggers
#[derive(Parser)]
#[command(name = "antigravity-console")]
#[command(about = "Antigravity Console - operator shell for session sync and workflow triggers")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive console
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    let home_dir = Path::new(&config.console.home_dir);
    runtime::logging::init_logging_from_config(&logging_config, home_dir);
    tracing::info!("Antigravity Console starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_console(config).await,
        Commands::Check => check_config(config),
    }
}

fn module_configs(config: &AppConfig) -> Result<(SessionSyncConfig, WorkflowWebhookConfig)> {
    let session: SessionSyncConfig = config.module_config(SESSION_SYNC)?;
    let webhook: WorkflowWebhookConfig = config.module_config(WORKFLOW_WEBHOOK)?;
    Ok((session, webhook))
}

async fn run_console(config: AppConfig) -> Result<()> {
    tracing::info!("Initializing modules...");
    let (session_cfg, webhook_cfg) = module_configs(&config)?;

    let webhook =
        WorkflowWebhook::from_config(&webhook_cfg).context("Invalid workflow_webhook config")?;
    let session = SessionSync::start(&session_cfg, TracedClient::default())
        .context("Failed to start session_sync")?;

    let console = console::Console::new(session.client(), webhook);
    let result = console.run().await;

    tracing::info!("Shutting down...");
    session.stop().await;
    result
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    let (session_cfg, webhook_cfg) = module_configs(&config)?;

    session_cfg
        .validate()
        .context("Invalid session_sync config")?;
    let webhook =
        WorkflowWebhook::from_config(&webhook_cfg).context("Invalid workflow_webhook config")?;
    if !webhook.is_configured() {
        println!("Warning: workflow_webhook.base_url is not set; triggers will fail");
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
