//! ticketsync binary entry point.
//!
//! Usage:
//! ```bash
//! ticketsync --config ticketsync.toml
//! ticketsync --config ticketsync.toml --once
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use ticketsync_worker::config::Config;
use ticketsync_worker::http::{build_router, health};
use ticketsync_worker::schedule::spawn_sync_task;
use ticketsync_worker::service::SyncService;
use tracing_subscriber::EnvFilter;

/// Sync Tito registrations into the local ticket store.
#[derive(Parser, Debug)]
#[command(name = "ticketsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, default_value = "ticketsync.toml")]
    config: PathBuf,

    /// Run a single sync and exit instead of serving
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    let service = SyncService::from_config(config.clone())
        .await
        .context("Failed to start sync service")?;
    let service = Arc::new(service);

    if cli.once {
        return match service.run_scheduled(Utc::now()).await? {
            Some(report) => {
                println!("{}", serde_json::to_string_pretty(&report)?);
                Ok(())
            }
            None => {
                println!("Sync cut-off has passed; nothing to do");
                Ok(())
            }
        };
    }

    health::init_start_time();
    let sync_task = spawn_sync_task(service.clone());

    let listener = tokio::net::TcpListener::bind(&config.http.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.http.bind_address))?;
    tracing::info!("HTTP endpoints listening on {}", config.http.bind_address);

    axum::serve(listener, build_router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    sync_task.abort();
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
