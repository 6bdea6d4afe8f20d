//! Funeral Hub housekeeping worker
//!
//! Connects to PostgreSQL and runs the housekeeping scheduler until shutdown.

pub mod config;
pub mod logging;

use anyhow::Context;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use funeral_hub_core::{Housekeeping, HousekeepingScheduler, TracingNotificationDispatcher};
use funeral_hub_state_postgres::{PostgresConnection, PostgresProtocolStore, PostgresUserDirectory};

pub use config::{LoggingConfig, WorkerConfig};

/// Run housekeeping until `shutdown` flips to `true`
pub async fn run(config: WorkerConfig, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
    let conn = PostgresConnection::new(&config.database)
        .await
        .context("Failed to connect to the protocol database")?;

    let store = PostgresProtocolStore::new(conn.clone(), config.database.lock_timeout_ms);
    let users = PostgresUserDirectory::new(conn);

    let housekeeping = Arc::new(Housekeeping::new(
        Arc::new(store),
        Arc::new(TracingNotificationDispatcher),
        Arc::new(users),
        config.housekeeping.clone(),
    ));

    info!(
        interval_secs = config.housekeeping.interval_secs,
        batch_size = config.housekeeping.batch_size,
        "Starting housekeeping worker"
    );
    HousekeepingScheduler::new(housekeeping)
        .spawn(shutdown)
        .await
        .context("Housekeeping scheduler panicked")?;

    info!("Housekeeping worker stopped");
    Ok(())
}
