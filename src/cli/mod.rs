use crate::config::{Config, Transport, load_config};
use crate::server::ServerState;
use crate::tools::Registry;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "rangekit")]
#[command(about = "MCP server for lab-scoped security assessment tools")]
#[command(version)]
pub struct Cli {
    /// Configuration file (YAML or JSON); defaults come from the
    /// environment when omitted.
    #[arg(long, env = "RANGEKIT_CONFIG")]
    config: Option<PathBuf>,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config);
    tracing::debug!("effective configuration: {}", config.redacted_echo());

    let prometheus = if config.metrics.enabled {
        crate::metrics::init()
    } else {
        None
    };

    let registry = Arc::new(Registry::from_config(&config));
    let state = Arc::new(ServerState::new(
        Arc::clone(&registry),
        config.server.transport,
    ));

    info!(
        transport = %config.server.transport,
        tools = registry.len(),
        include = %config.tool.include.join(","),
        exclude = %config.tool.exclude.join(","),
        shutdown_grace_secs = config.server.shutdown_grace_secs,
        "starting rangekit v{}",
        crate::VERSION
    );

    let _gateway = if config.server.transport == Transport::Http {
        Some(
            crate::gateway::start(
                &config.server.host,
                config.server.port,
                Arc::clone(&state),
                prometheus,
            )
            .await
            .context("failed to start HTTP surface")?,
        )
    } else {
        None
    };

    crate::server::serve(&config, state).await?;
    Ok(())
}

/// Logs go to stderr: stdout carries the MCP wire protocol.
fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| config.logging.level.parse())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
