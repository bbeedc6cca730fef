// src/main.rs
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use zeroconf_proxy::{
    app,
    config::{self, Overrides},
    shutdown::{shutdown_signal, Shutdown},
};

/// Local OpenAI-compatible reverse proxy for AI inference services found on the network.
#[derive(Debug, Parser)]
#[command(name = "zeroconf-proxy", version, about)]
struct Cli {
    /// Configuration file (YAML, JSON or TOML)
    #[arg(long, default_value = "zeroconf-proxy.yaml")]
    config: PathBuf,

    /// Proxy listen port [default: 8080]
    #[arg(long)]
    port: Option<u16>,

    /// Proxy listen host [default: 127.0.0.1]
    #[arg(long)]
    host: Option<String>,

    /// Disable verbose logging
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config(&cli.config)?;
    config.apply(Overrides {
        host: cli.host,
        port: cli.port,
        quiet: cli.quiet,
    });

    // Initialize tracing
    let level = if config.logging.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("zeroconf_proxy={}", level).parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    info!("Loaded configuration from: {}", cli.config.display());

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    app::run(config, shutdown).await
}
