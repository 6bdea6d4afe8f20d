//! Configuration for the housekeeping worker

use funeral_hub_core::{config::override_from_env, HousekeepingConfig};
use funeral_hub_state_postgres::PostgresConfig;
use serde::{Deserialize, Serialize};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Service name attached to the startup record
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// JSON lines instead of pretty output
    #[serde(default)]
    pub json: bool,
}

fn default_service_name() -> String {
    "funeral-hub-worker".to_string()
}

fn default_log_filter() -> String {
    "info,funeral_hub_core=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_filter: default_log_filter(),
            json: false,
        }
    }
}

/// Worker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub database: PostgresConfig,
    #[serde(default)]
    pub housekeeping: HousekeepingConfig,
}

impl WorkerConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        let mut logging = LoggingConfig::default();
        override_from_env("FUNERAL_HUB_LOG_FILTER", &mut logging.log_filter);
        override_from_env("FUNERAL_HUB_LOG_JSON", &mut logging.json);

        Self {
            logging,
            database: PostgresConfig::load(),
            housekeeping: HousekeepingConfig::load(),
        }
    }
}
