//! Tests for the poller registry lifecycle.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::pollers_model::{
    CycleControl, CycleReport, PollerConfig, StartOutcome, Upstream,
};
use super::pollers_registry::PollerRegistry;
use super::pollers_traits::PollTask;
use crate::accounts::Account;
use crate::errors::{Error, Result};

fn account(id: &str) -> Account {
    Account {
        id: id.to_string(),
        name: format!("Account {id}"),
        currency: "NGN".to_string(),
        bank_account_ref: Some("bank-ref".to_string()),
        exchange_account_ref: Some("exch-ref".to_string()),
        is_active: true,
        last_synced_at: None,
        created_at: Utc::now(),
    }
}

fn registry(interval: Duration) -> PollerRegistry {
    PollerRegistry::new(PollerConfig { interval })
}

/// Counts cycles and tracks whether two cycles ever ran concurrently.
struct ProbeTask {
    upstream: Upstream,
    cycle_time: Duration,
    cycles: AtomicUsize,
    active: AtomicUsize,
    overlapped: AtomicBool,
    fail: AtomicBool,
}

impl ProbeTask {
    fn new(upstream: Upstream, cycle_time: Duration) -> Arc<Self> {
        Arc::new(Self {
            upstream,
            cycle_time,
            cycles: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            overlapped: AtomicBool::new(false),
            fail: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl PollTask for ProbeTask {
    fn upstream(&self) -> Upstream {
        self.upstream
    }

    async fn run_cycle(&self, _account: &Account, _ctl: &CycleControl) -> Result<CycleReport> {
        if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        tokio::time::sleep(self.cycle_time).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.cycles.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Upstream("simulated outage".to_string()));
        }
        Ok(CycleReport {
            fetched: 0,
            inserted: 0,
        })
    }
}

#[tokio::test]
async fn test_second_start_is_observable_noop() {
    let reg = registry(Duration::from_millis(10));
    let task = ProbeTask::new(Upstream::Bank, Duration::from_millis(1));

    let first = reg.start(account("a1"), task.clone()).await;
    let second = reg.start(account("a1"), task.clone()).await;

    assert_eq!(first, StartOutcome::Started);
    assert_eq!(second, StartOutcome::AlreadyRunning);
    assert_eq!(reg.running_count().await, 1);

    reg.stop_all().await;
}

#[tokio::test]
async fn test_same_account_different_upstreams_coexist() {
    let reg = registry(Duration::from_millis(10));
    let bank = ProbeTask::new(Upstream::Bank, Duration::from_millis(1));
    let exchange = ProbeTask::new(Upstream::Exchange, Duration::from_millis(1));

    assert_eq!(
        reg.start(account("a1"), bank).await,
        StartOutcome::Started
    );
    assert_eq!(
        reg.start(account("a1"), exchange).await,
        StartOutcome::Started
    );
    assert_eq!(reg.running_count().await, 2);

    reg.stop_all().await;
}

#[tokio::test]
async fn test_cycles_never_overlap() {
    // Cycle time far above the interval: a fixed-rate schedule would stack
    // cycles, a fixed-delay schedule must not.
    let reg = registry(Duration::from_millis(5));
    let task = ProbeTask::new(Upstream::Bank, Duration::from_millis(30));

    reg.start(account("a1"), task.clone()).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    reg.stop_all().await;

    assert!(task.cycles.load(Ordering::SeqCst) >= 2);
    assert!(!task.overlapped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_stop_halts_cycles_and_waits_for_exit() {
    let reg = registry(Duration::from_millis(5));
    let task = ProbeTask::new(Upstream::Bank, Duration::from_millis(1));

    reg.start(account("a1"), task.clone()).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert!(reg.stop("a1", Upstream::Bank).await);
    let after_stop = task.cycles.load(Ordering::SeqCst);
    assert!(after_stop >= 1);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(task.cycles.load(Ordering::SeqCst), after_stop);
    assert_eq!(reg.running_count().await, 0);
}

#[tokio::test]
async fn test_stop_unknown_poller_returns_false() {
    let reg = registry(Duration::from_millis(5));
    assert!(!reg.stop("nobody", Upstream::Bank).await);
}

#[tokio::test]
async fn test_restart_after_stop() {
    let reg = registry(Duration::from_millis(5));
    let task = ProbeTask::new(Upstream::Bank, Duration::from_millis(1));

    reg.start(account("a1"), task.clone()).await;
    reg.stop("a1", Upstream::Bank).await;

    assert_eq!(
        reg.start(account("a1"), task).await,
        StartOutcome::Started
    );
    reg.stop_all().await;
}

#[tokio::test]
async fn test_cycle_failure_does_not_kill_the_loop() {
    let reg = registry(Duration::from_millis(5));
    let task = ProbeTask::new(Upstream::Bank, Duration::from_millis(1));
    task.fail.store(true, Ordering::SeqCst);

    reg.start(account("a1"), task.clone()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    reg.stop_all().await;

    assert!(task.cycles.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_stop_all_drains_every_poller() {
    let reg = registry(Duration::from_millis(5));
    for i in 0..3 {
        let task = ProbeTask::new(Upstream::Bank, Duration::from_millis(1));
        reg.start(account(&format!("a{i}")), task).await;
    }
    assert_eq!(reg.running_count().await, 3);

    reg.stop_all().await;
    assert_eq!(reg.running_count().await, 0);
}
