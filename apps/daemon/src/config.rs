//! Daemon configuration from environment variables.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use dealsync_core::constants::DEFAULT_POLL_INTERVAL_SECS;

/// Seconds between reconciliation passes.
const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 15 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub bank_api_url: String,
    pub bank_api_token: String,
    pub exchange_api_url: String,
    pub exchange_api_key: String,
    pub poll_interval: Duration,
    pub reconcile_interval: Duration,
    /// Reference fiat-per-crypto rate for deal classification. Sourced
    /// externally; when unset, reconciliation passes are skipped.
    pub reference_rate: Option<Decimal>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

impl Config {
    pub fn from_env() -> Self {
        let reference_rate = std::env::var("DS_REFERENCE_RATE")
            .ok()
            .and_then(|raw| Decimal::from_str(&raw).ok());

        Self {
            db_path: env_or("DS_DB_PATH", "dealsync.db"),
            bank_api_url: env_or("DS_BANK_API_URL", "https://api.monobank.ua"),
            bank_api_token: env_or("DS_BANK_API_TOKEN", ""),
            exchange_api_url: env_or("DS_EXCHANGE_API_URL", "https://api.exchange.example"),
            exchange_api_key: env_or("DS_EXCHANGE_API_KEY", ""),
            poll_interval: env_secs("DS_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS),
            reconcile_interval: env_secs(
                "DS_RECONCILE_INTERVAL_SECS",
                DEFAULT_RECONCILE_INTERVAL_SECS,
            ),
            reference_rate,
        }
    }
}
