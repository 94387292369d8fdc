//! shipit CLI - publish a generated app and link its dashboard
//!
//! Usage:
//!   shipit deploy [--work-dir DIR]     Push DIR and activate dashboard links
//!   shipit wait-dashboard <group>      Probe a group's dashboard until it is up
//!   shipit config init [--path FILE]   Write the default configuration
//!   shipit config show                 Print the effective configuration
//!
//! The deployment result is printed to stdout as a single JSON line; logs go
//! to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shipit_apps::{DashboardPoller, PollOutcome, ReqwestClient, RetryPolicy};
use shipit_core::{DeploymentOutcome, DeploymentTarget, ShipConfig};
use shipit_deploy::DeployWorkflow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_CONFIG: &str = "shipit.toml";

#[derive(Parser)]
#[command(name = "shipit")]
#[command(author, version, about = "Publish a generated app and link its dashboard")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults are used when it does not exist)
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the working directory and activate dashboard links
    Deploy {
        /// Working directory to publish
        #[arg(short, long, default_value = ".")]
        work_dir: PathBuf,
    },

    /// Wait until the dashboard of an app group responds
    WaitDashboard {
        /// App group identifier
        group_id: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write the default configuration
    Init {
        /// Where to write the file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging; stdout is reserved for the JSON result
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Deploy { work_dir } => cmd_deploy(&cli.config, work_dir).await,
        Commands::WaitDashboard { group_id } => cmd_wait_dashboard(&cli.config, &group_id).await,
        Commands::Config { action } => cmd_config(&cli.config, action),
    }
}

fn load_config(path: &Path) -> Result<ShipConfig> {
    ShipConfig::load_or_default(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

async fn cmd_deploy(config_path: &Path, work_dir: PathBuf) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let work_dir = std::fs::canonicalize(&work_dir)
        .with_context(|| format!("Working directory {} not found", work_dir.display()))?;

    let outcome = match DeploymentTarget::from_env(&work_dir, &config.env) {
        Ok(target) => {
            info!("Deploying {}", work_dir.display());
            let workflow = DeployWorkflow::new(config, target.work_dir());
            workflow.run(&target).await.outcome
        }
        Err(e) => DeploymentOutcome::failure(format!("Deployment failed: {}", e)),
    };

    print_result(&outcome)?;
    Ok(exit_code(&outcome))
}

async fn cmd_wait_dashboard(config_path: &Path, group_id: &str) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let url = config.apps.dashboard_url(group_id);

    let poller = DashboardPoller::new(ReqwestClient::new(), RetryPolicy::from(&config.poll));
    let outcome = match poller.wait_until_ready(&url).await {
        PollOutcome::Ready { attempts } => DeploymentOutcome::success(format!(
            "Dashboard {} is available (after {} probe(s))",
            url, attempts
        )),
        PollOutcome::TimedOut { attempts } => DeploymentOutcome::failure(format!(
            "Dashboard {} not reachable after {} probes",
            url, attempts
        )),
    };

    print_result(&outcome)?;
    Ok(exit_code(&outcome))
}

fn cmd_config(config_path: &Path, action: ConfigCommands) -> Result<ExitCode> {
    match action {
        ConfigCommands::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            ShipConfig::write_default(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        ConfigCommands::Show => {
            let config = load_config(config_path)?;
            print!("{}", config.to_toml()?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// `{"type":"result", ...outcome}` on a single line
fn result_line(outcome: &DeploymentOutcome) -> Result<String> {
    let mut value = serde_json::to_value(outcome)?;
    if let Some(map) = value.as_object_mut() {
        map.insert("type".to_string(), serde_json::json!("result"));
    }
    Ok(serde_json::to_string(&value)?)
}

fn print_result(outcome: &DeploymentOutcome) -> Result<()> {
    println!("{}", result_line(outcome)?);
    Ok(())
}

fn exit_code(outcome: &DeploymentOutcome) -> ExitCode {
    if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
