//! Balance snapshot domain model.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;

use crate::constants::{DEFAULT_BALANCE_FRESHNESS_SECS, DEFAULT_SETTLE_DELAY_SECS};

/// Latest-known balance for one `(account, provider account)` pair.
///
/// One logical "current" row per key - continuously overwritten by upserts,
/// with `fetched_at` monotonically non-decreasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    pub account_id: String,
    pub provider_account_id: String,
    pub balance: Decimal,
    pub currency: String,
    pub fetched_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    /// True when the snapshot is younger than the freshness window.
    pub fn is_fresh(&self, window: Duration, now: DateTime<Utc>) -> bool {
        now - self.fetched_at <= window
    }
}

/// A balance as reported by the upstream, before it becomes a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBalance {
    pub provider_account_id: String,
    pub balance: Decimal,
    pub currency: String,
}

/// Tuning knobs for the balance cache.
#[derive(Debug, Clone)]
pub struct BalanceConfig {
    /// Maximum snapshot age before a read triggers a refresh.
    pub freshness_window: Duration,
    /// Fixed wait after triggering the upstream's asynchronous sync before
    /// fetching the balance. A documented approximation; see DESIGN.md.
    pub settle_delay: StdDuration,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            freshness_window: Duration::seconds(DEFAULT_BALANCE_FRESHNESS_SECS),
            settle_delay: StdDuration::from_secs(DEFAULT_SETTLE_DELAY_SECS),
        }
    }
}
