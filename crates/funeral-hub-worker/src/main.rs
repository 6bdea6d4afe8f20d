use anyhow::{Context, Result};
use funeral_hub_worker::{logging::init_logging, WorkerConfig};
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment variables
    let config = WorkerConfig::load();

    init_logging(&config.logging).context("Failed to initialize logging")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(err) => warn!(error = %err, "Failed to listen for ctrl-c, shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });

    funeral_hub_worker::run(config, shutdown_rx)
        .await
        .context("Worker error")?;

    Ok(())
}
