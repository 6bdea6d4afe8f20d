//! Configuration for the Funeral Hub core
//!
//! Engine and housekeeping settings, loaded from `FUNERAL_HUB_*` environment
//! variables on top of the defaults.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::warn;

/// Workflow engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Draft rejections allowed per protocol
    #[serde(default = "default_rejection_cap")]
    pub rejection_cap: u32,

    /// Attempts made by `transition_with_retry`, including the first one
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Base backoff between contended attempts; attempt `n` waits `n * base`
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_rejection_cap() -> u32 {
    1
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    50
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rejection_cap: default_rejection_cap(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        let mut config = Self::default();
        override_from_env("FUNERAL_HUB_REJECTION_CAP", &mut config.rejection_cap);
        override_from_env("FUNERAL_HUB_RETRY_MAX_ATTEMPTS", &mut config.retry_max_attempts);
        override_from_env("FUNERAL_HUB_RETRY_BACKOFF_MS", &mut config.retry_backoff_ms);
        config
    }

    pub fn retry_backoff(&self, attempt: u32) -> std::time::Duration {
        std::time::Duration::from_millis(self.retry_backoff_ms.saturating_mul(attempt as u64))
    }
}

/// Housekeeping job configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HousekeepingConfig {
    /// Finalized protocols older than this are closed
    #[serde(default = "default_close_after_hours")]
    pub close_after_hours: i64,

    /// Closed protocols older than this lose their documents
    #[serde(default = "default_purge_after_hours")]
    pub purge_after_hours: i64,

    /// Closed protocols older than this revoke their declarant's access
    #[serde(default = "default_revoke_after_days")]
    pub revoke_after_days: i64,

    /// Documentation idle longer than this on the notary's side raises an alert
    #[serde(default = "default_notary_inaction_hours")]
    pub notary_inaction_hours: i64,

    /// Seconds between scheduler runs
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Upper bound of protocols handled per job and run
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
}

fn default_close_after_hours() -> i64 {
    72
}

fn default_purge_after_hours() -> i64 {
    72
}

fn default_revoke_after_days() -> i64 {
    30
}

fn default_notary_inaction_hours() -> i64 {
    96
}

fn default_interval_secs() -> u64 {
    3600 // 1 hour
}

fn default_batch_size() -> i64 {
    500
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            close_after_hours: default_close_after_hours(),
            purge_after_hours: default_purge_after_hours(),
            revoke_after_days: default_revoke_after_days(),
            notary_inaction_hours: default_notary_inaction_hours(),
            interval_secs: default_interval_secs(),
            batch_size: default_batch_size(),
        }
    }
}

impl HousekeepingConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        let mut config = Self::default();
        override_from_env("FUNERAL_HUB_CLOSE_AFTER_HOURS", &mut config.close_after_hours);
        override_from_env("FUNERAL_HUB_PURGE_AFTER_HOURS", &mut config.purge_after_hours);
        override_from_env("FUNERAL_HUB_REVOKE_AFTER_DAYS", &mut config.revoke_after_days);
        override_from_env(
            "FUNERAL_HUB_NOTARY_INACTION_HOURS",
            &mut config.notary_inaction_hours,
        );
        override_from_env("FUNERAL_HUB_HOUSEKEEPING_INTERVAL_SECS", &mut config.interval_secs);
        override_from_env("FUNERAL_HUB_HOUSEKEEPING_BATCH_SIZE", &mut config.batch_size);
        config
    }

    pub fn close_after(&self) -> Duration {
        Duration::hours(self.close_after_hours)
    }

    pub fn purge_after(&self) -> Duration {
        Duration::hours(self.purge_after_hours)
    }

    pub fn revoke_after(&self) -> Duration {
        Duration::days(self.revoke_after_days)
    }

    pub fn notary_inaction_after(&self) -> Duration {
        Duration::hours(self.notary_inaction_hours)
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Replace `target` with the parsed value of `var`, warning when it does not parse
pub fn override_from_env<T: FromStr>(var: &str, target: &mut T) {
    if let Ok(raw) = env::var(var) {
        match raw.parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!("Invalid {} value: {}", var, raw),
        }
    }
}
