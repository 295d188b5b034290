//! Poller domain model.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use crate::constants::DEFAULT_POLL_INTERVAL_SECS;

/// Which upstream a poller reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Upstream {
    Bank,
    Exchange,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Exchange => "exchange",
        }
    }
}

/// Identity of one poller: at most one may run per (account, upstream).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollerKey {
    pub account_id: String,
    pub upstream: Upstream,
}

/// Result of asking the registry to start a poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A poller for this (account, upstream) is already running; the
    /// request was a no-op.
    AlreadyRunning,
}

/// Counters from one completed poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Rows the upstream returned.
    pub fetched: usize,
    /// Rows that were new to the ledger.
    pub inserted: usize,
}

/// Stop signal visible from inside a running cycle.
///
/// A task checks this between fetching and persisting so that results
/// arriving after a stop request are discarded rather than written.
#[derive(Debug, Clone)]
pub struct CycleControl {
    stop: watch::Receiver<bool>,
}

impl CycleControl {
    pub fn new(stop: watch::Receiver<bool>) -> Self {
        Self { stop }
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }
}

/// Registry-level tuning.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Fixed delay between the end of one cycle and the start of the next.
    /// Not a fixed rate: a slow cycle pushes the next one out.
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}
