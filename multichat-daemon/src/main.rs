//! Multichat Daemon - live chat from Twitch, YouTube and TikTok in one stream
//!
//! Connects to each configured platform, normalizes every message and serves
//! the combined feed to overlay viewers over WebSocket (ws://127.0.0.1:8080).

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use multichat_daemon::cli::{Cli, Command};
use multichat_daemon::version::version_long;
use multichat_daemon::{viewer, Daemon, MultichatConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::from(cli.log_level).into())
                .from_env_lossy(),
        )
        .init();

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(&cli).await,
        Command::Watch { url } => viewer::watch(&url).await,
        Command::Version => {
            print!("{}", version_long());
            Ok(())
        }
    }
}

async fn serve(cli: &Cli) -> Result<()> {
    info!("💬 Starting Multichat Daemon v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => MultichatConfig::load_from(path),
        None => MultichatConfig::load(),
    }
    .context("Failed to load configuration")?;
    info!("📋 Configuration loaded from {}", config.config_path.display());

    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }

    let daemon = Daemon::start(&config, |key| std::env::var(key).ok())
        .await
        .context("Failed to start daemon")?;

    info!("🚀 Multichat ready! Viewers connect to ws://{}", daemon.local_addr());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("🛑 Received shutdown signal");

    info!("🧹 Shutting down...");
    daemon.shutdown().await?;
    info!("👋 Multichat daemon stopped");

    Ok(())
}
