mod config;
mod logging;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use compute_nodes::{BackendRegistry, ComputeNodesLocalClient, Service};
use compute_nodes_sdk::{ComputeNodesClient, CreateNodeRequest, NodeTarget};
use serde_json::Value;

use crate::config::{AppConfig, CliOverrides};

/// Compute nodes - uniform lifecycle management over cloud backends
#[derive(Parser)]
#[command(name = "compute-nodes")]
#[command(about = "Create, inspect and drive compute nodes through a normalized backend")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Backend provider name (overrides config)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Group to operate in (overrides the configured default group)
    #[arg(long, global = true)]
    group: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TargetArgs {
    /// Node name; the configured default node when omitted
    name: Option<String>,
}

impl TargetArgs {
    fn into_target(self) -> NodeTarget {
        NodeTarget {
            group: None,
            name: self.name,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List nodes across all groups
    List,
    /// List nodes of the selected group
    Info,
    /// Provision a node and wait until it runs
    Create {
        name: String,
        /// Image alias or full image reference
        #[arg(long)]
        image: Option<String>,
        /// Size / SKU
        #[arg(long)]
        size: Option<String>,
        /// Wait bound, e.g. "90s" or "10m"
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,
        /// Backend-specific option as key=value; values are parsed as JSON
        /// when possible
        #[arg(long = "option", value_parser = parse_option)]
        options: Vec<(String, Value)>,
    },
    /// Start a node and wait until it runs
    Start(TargetArgs),
    /// Stop a node and wait until it is stopped
    Stop(TargetArgs),
    /// Restart a running node
    Restart(TargetArgs),
    /// Destroy a node (succeeds if it is already gone)
    Destroy(TargetArgs),
    /// Suspend a node
    Suspend(TargetArgs),
    /// Resume a suspended node
    Resume(TargetArgs),
    /// Rename a node; derives a free name when DESTINATION is omitted
    Rename {
        name: String,
        destination: Option<String>,
    },
    /// Print the effective configuration and exit
    PrintConfig,
}

fn parse_option(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty option key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((key.trim().to_owned(), value))
}

fn build_client(config: &AppConfig) -> Result<Arc<dyn ComputeNodesClient>> {
    let mut registry = BackendRegistry::new();
    let inmemory = inmemory_compute_plugin::build(config.inmemory.clone())
        .context("failed to seed in-memory backend")?;
    registry.register(Arc::new(inmemory))?;

    let svc = Service::new(&registry, config.manager.clone())?;
    Ok(Arc::new(ComputeNodesLocalClient::new(Arc::new(svc))))
}

async fn execute(client: &dyn ComputeNodesClient, command: Commands) -> Result<Value> {
    let value = match command {
        Commands::List => serde_json::to_value(client.list().await?)?,
        Commands::Info => serde_json::to_value(client.info(None).await?)?,
        Commands::Create {
            name,
            image,
            size,
            timeout,
            options,
        } => {
            let mut request = CreateNodeRequest::new(name);
            request.image = image;
            request.size = size;
            request.timeout = timeout;
            request.options.extend(options);
            serde_json::to_value(client.create(request).await?)?
        }
        Commands::Start(target) => serde_json::to_value(client.start(&target.into_target()).await?)?,
        Commands::Stop(target) => serde_json::to_value(client.stop(&target.into_target()).await?)?,
        Commands::Restart(target) => {
            serde_json::to_value(client.restart(&target.into_target()).await?)?
        }
        Commands::Destroy(target) => {
            serde_json::to_value(client.destroy(&target.into_target()).await?)?
        }
        Commands::Suspend(target) => {
            serde_json::to_value(client.suspend(&target.into_target()).await?)?
        }
        Commands::Resume(target) => {
            serde_json::to_value(client.resume(&target.into_target()).await?)?
        }
        Commands::Rename { name, destination } => serde_json::to_value(
            client
                .rename(&NodeTarget::named(name), destination.as_deref())
                .await?,
        )?,
        Commands::PrintConfig => Value::Null,
    };
    Ok(value)
}

fn emit(value: &Value) -> Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(&CliOverrides {
        provider: cli.provider,
        group: cli.group,
        json_logs: cli.json_logs,
    });
    logging::init(&config.logging, cli.verbose)?;

    if matches!(cli.command, Commands::PrintConfig) {
        return emit(&serde_json::to_value(&config)?);
    }

    let client = build_client(&config)?;
    tracing::debug!(provider = %config.manager.provider, "compute nodes client ready");

    let value = execute(client.as_ref(), cli.command).await?;
    emit(&value)
}
