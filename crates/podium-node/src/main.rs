//! # Podium Node
//!
//! Binary entry point. Pass `--clean` to start a new iteration of the live
//! network instead of resuming it.

use anyhow::{Context, Result};
use podium_node::{Node, NodeConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = NodeConfig::from_env().context("Failed to load configuration")?;

    // Initialize logging
    let fallback = if config.ledger.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let clean = std::env::args().skip(1).any(|arg| arg == "--clean");

    // Launch
    let node = Node::in_memory(config);
    let running = node
        .launch(clean)
        .await
        .context("Failed to launch Podium node")?;

    info!(network = %running.network().id, "Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // Graceful shutdown
    running.shutdown();

    Ok(())
}
