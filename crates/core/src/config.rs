use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Scheduler configuration, read from environment variables.
///
/// The repeat interval is deliberately absent: it is set only via
/// `SCHEDULED` entries in the schedule log, never via config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the append-only schedule log file.
    pub schedule_file: PathBuf,
    /// Fixed-delay reconciliation poll period in seconds.
    pub poll_secs: u64,
    /// How many days of historical rows to retain in computed state.
    pub history_days: u32,
    /// Expected device chain, used to cross-check the chain named by the
    /// active `SCHEDULED` entry. Empty = no cross-check.
    pub devices: Vec<String>,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            schedule_file: PathBuf::from(env_or("SCHEDULE_FILE", "data/schedule/schedule.log")),
            poll_secs: env_u64("SCHEDULE_POLL_SECS", 10),
            history_days: env_u32("SCHEDULE_HISTORY_DAYS", 7),
            devices: env_or("SCHEDULE_DEVICES", "")
                .split_whitespace()
                .map(String::from)
                .collect(),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  schedule_file: {}", self.schedule_file.display());
        tracing::info!("  poll_secs:     {}", self.poll_secs);
        tracing::info!("  history_days:  {}", self.history_days);
        tracing::info!(
            "  devices:       {}",
            if self.devices.is_empty() {
                "(from schedule log)".to_string()
            } else {
                self.devices.join(" ")
            }
        );
    }
}
