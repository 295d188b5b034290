//! Per-account poller lifecycle.
//!
//! One background loop per (account, upstream), started on demand and
//! stopped cooperatively. Cycles are spaced by a fixed delay measured from
//! cycle completion, so a slow upstream cannot stack overlapping cycles.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::pollers_model::{
    CycleControl, PollerConfig, PollerKey, StartOutcome, Upstream,
};
use super::pollers_traits::PollTask;
use crate::accounts::Account;

struct PollerHandle {
    stop: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Tracks and drives all running pollers.
pub struct PollerRegistry {
    interval: Duration,
    pollers: Mutex<HashMap<PollerKey, PollerHandle>>,
}

impl PollerRegistry {
    pub fn new(config: PollerConfig) -> Self {
        Self {
            interval: config.interval,
            pollers: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a poll loop for the account against the task's upstream.
    ///
    /// If a live poller already exists for the same key this is an
    /// observable no-op. A previously stopped or crashed entry is reaped
    /// and replaced.
    pub async fn start(&self, account: Account, task: Arc<dyn PollTask>) -> StartOutcome {
        let key = PollerKey {
            account_id: account.id.clone(),
            upstream: task.upstream(),
        };

        let mut pollers = self.pollers.lock().await;
        if let Some(handle) = pollers.get(&key) {
            if !handle.join.is_finished() {
                warn!(
                    "{} poller for account {} already running; ignoring start",
                    key.upstream.as_str(),
                    key.account_id
                );
                return StartOutcome::AlreadyRunning;
            }
            pollers.remove(&key);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let interval = self.interval;
        let join = tokio::spawn(poll_loop(account, task, stop_rx, interval));
        pollers.insert(
            key,
            PollerHandle {
                stop: stop_tx,
                join,
            },
        );
        StartOutcome::Started
    }

    /// Stops one poller and waits for its loop to exit. Returns false when
    /// no poller was registered for the key.
    pub async fn stop(&self, account_id: &str, upstream: Upstream) -> bool {
        let key = PollerKey {
            account_id: account_id.to_string(),
            upstream,
        };
        let handle = { self.pollers.lock().await.remove(&key) };
        let Some(handle) = handle else {
            return false;
        };

        let _ = handle.stop.send(true);
        if let Err(e) = handle.join.await {
            error!(
                "{} poller for account {} panicked: {}",
                upstream.as_str(),
                account_id,
                e
            );
        }
        true
    }

    /// Signals every poller to stop, then waits for all loops to exit.
    pub async fn stop_all(&self) {
        let drained: Vec<(PollerKey, PollerHandle)> =
            { self.pollers.lock().await.drain().collect() };

        for (_, handle) in &drained {
            let _ = handle.stop.send(true);
        }
        for (key, handle) in drained {
            if let Err(e) = handle.join.await {
                error!(
                    "{} poller for account {} panicked: {}",
                    key.upstream.as_str(),
                    key.account_id,
                    e
                );
            }
        }
    }

    /// Number of pollers whose loops have not exited.
    pub async fn running_count(&self) -> usize {
        self.pollers
            .lock()
            .await
            .values()
            .filter(|h| !h.join.is_finished())
            .count()
    }
}

async fn poll_loop(
    account: Account,
    task: Arc<dyn PollTask>,
    mut stop_rx: watch::Receiver<bool>,
    interval: Duration,
) {
    let ctl = CycleControl::new(stop_rx.clone());
    debug!(
        "Starting {} poller for account {}",
        task.upstream().as_str(),
        account.id
    );

    loop {
        if *stop_rx.borrow() {
            break;
        }

        match task.run_cycle(&account, &ctl).await {
            Ok(report) => {
                if report.inserted > 0 {
                    debug!(
                        "{} poll for account {}: {} fetched, {} new",
                        task.upstream().as_str(),
                        account.id,
                        report.fetched,
                        report.inserted
                    );
                }
            }
            Err(e) => {
                warn!(
                    "{} poll cycle failed for account {}: {}",
                    task.upstream().as_str(),
                    account.id,
                    e
                );
            }
        }

        tokio::select! {
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    debug!(
        "Stopped {} poller for account {}",
        task.upstream().as_str(),
        account.id
    );
}
