//! EVM Bridge Relayer
//!
//! Confirms bridge events on EVM chains and votes on them.
//!
//! # Architecture Overview
//!
//! ```text
//!     poll notifications (NDJSON, stdin)
//!          │
//!          ▼
//!   ┌──────────────────────┐     ┌──────────────────────┐
//!   │ ConfirmationManager  │────▶│   ClientRegistry     │───▶ EVM JSON-RPC
//!   │ (one task per poll)  │     │ (finality variants)  │
//!   └──────────┬───────────┘     └──────────────────────┘
//!              │        ▲
//!              │        └── FinalizedBlockCache
//!              ▼
//!   ┌──────────────────────┐
//!   │     Broadcaster      │───▶ votes (NDJSON, stdout)
//!   └──────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use evm_relayer::config::load_config;
use evm_relayer::evm::{ConfirmationManager, JsonLineBroadcaster, Notification, ValidatorAddress};
use evm_relayer::observability::{logging, metrics};
use evm_relayer::rpc::ClientRegistry;

#[derive(Parser)]
#[command(name = "evm-relayer")]
#[command(about = "Confirms bridge events on EVM chains and broadcasts votes", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "relayer.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability);
    tracing::info!("evm-relayer v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let registry = ClientRegistry::connect(&config.chains).await?;
    tracing::info!(chains = ?registry.chains(), "Chain clients ready");

    let mgr = Arc::new(ConfirmationManager::new(
        registry,
        Arc::new(JsonLineBroadcaster::stdout()),
        ValidatorAddress(config.validator.address.clone()),
        config.validator.proxy.clone(),
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = Vec::new();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        };
        let Some(line) = line else {
            tracing::info!("Notification stream closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let notification: Notification = match serde_json::from_str(&line) {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed notification");
                continue;
            }
        };

        let mgr = mgr.clone();
        tasks.retain(|task: &tokio::task::JoinHandle<()>| !task.is_finished());
        tasks.push(tokio::spawn(async move {
            let kind = notification.kind();
            if let Err(e) = mgr.handle(notification).await {
                tracing::error!(kind, error = %e, "Confirmation failed");
            }
        }));
    }

    tracing::info!(in_flight = tasks.len(), "Waiting for in-flight confirmations");
    futures_util::future::join_all(tasks).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
