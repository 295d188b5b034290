//! Tests for the balance cache.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use super::balances_model::{BalanceConfig, BalanceSnapshot, RemoteBalance};
use super::balances_service::BalanceService;
use super::balances_traits::{BalanceGatewayTrait, BalanceRepositoryTrait, BalanceServiceTrait};
use crate::accounts::{Account, AccountRepositoryTrait};
use crate::errors::{DatabaseError, Error, Result};

struct FixedAccountRepo {
    account: Account,
}

#[async_trait]
impl AccountRepositoryTrait for FixedAccountRepo {
    fn get_by_id(&self, account_id: &str) -> Result<Account> {
        if account_id == self.account.id {
            Ok(self.account.clone())
        } else {
            Err(Error::Database(DatabaseError::NotFound(
                account_id.to_string(),
            )))
        }
    }

    fn list_active(&self) -> Result<Vec<Account>> {
        Ok(vec![self.account.clone()])
    }

    async fn touch_last_synced(&self, _account_id: &str, _at: DateTime<Utc>) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryBalanceRepo {
    snapshot: Mutex<Option<BalanceSnapshot>>,
}

#[async_trait]
impl BalanceRepositoryTrait for InMemoryBalanceRepo {
    fn latest(&self, _account_id: &str) -> Result<Option<BalanceSnapshot>> {
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn upsert(&self, snapshot: BalanceSnapshot) -> Result<BalanceSnapshot> {
        let mut current = self.snapshot.lock().unwrap();
        // fetched_at monotone per key
        if let Some(existing) = current.as_ref() {
            if existing.fetched_at > snapshot.fetched_at {
                return Ok(existing.clone());
            }
        }
        *current = Some(snapshot.clone());
        Ok(snapshot)
    }
}

#[derive(Default)]
struct StubGateway {
    sync_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    fail: AtomicBool,
}

#[async_trait]
impl BalanceGatewayTrait for StubGateway {
    async fn trigger_sync(&self, _provider_account_id: &str) -> Result<()> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Upstream("sync endpoint unavailable".to_string()));
        }
        Ok(())
    }

    async fn fetch_balance(&self, provider_account_id: &str) -> Result<RemoteBalance> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Upstream("balance endpoint unavailable".to_string()));
        }
        Ok(RemoteBalance {
            provider_account_id: provider_account_id.to_string(),
            balance: dec!(2500.00),
            currency: "NGN".to_string(),
        })
    }
}

fn linked_account() -> Account {
    Account {
        id: "acct-1".to_string(),
        name: "Test".to_string(),
        currency: "NGN".to_string(),
        bank_account_ref: Some("prov-1".to_string()),
        exchange_account_ref: None,
        is_active: true,
        last_synced_at: None,
        created_at: Utc::now(),
    }
}

fn config() -> BalanceConfig {
    BalanceConfig {
        freshness_window: Duration::minutes(5),
        settle_delay: StdDuration::ZERO,
    }
}

fn stale_snapshot() -> BalanceSnapshot {
    BalanceSnapshot {
        account_id: "acct-1".to_string(),
        provider_account_id: "prov-1".to_string(),
        balance: dec!(1000.00),
        currency: "NGN".to_string(),
        fetched_at: Utc::now() - Duration::minutes(30),
    }
}

#[tokio::test]
async fn test_fresh_snapshot_served_without_refresh() {
    let repo = Arc::new(InMemoryBalanceRepo::default());
    let gateway = Arc::new(StubGateway::default());
    let mut snapshot = stale_snapshot();
    snapshot.fetched_at = Utc::now();
    *repo.snapshot.lock().unwrap() = Some(snapshot.clone());

    let svc = BalanceService::new(
        Arc::new(FixedAccountRepo {
            account: linked_account(),
        }),
        repo,
        gateway.clone(),
        config(),
    );

    let got = svc.get_balance("acct-1").await.unwrap();
    assert_eq!(got, snapshot);
    assert_eq!(gateway.sync_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stale_snapshot_triggers_refresh() {
    let repo = Arc::new(InMemoryBalanceRepo::default());
    let gateway = Arc::new(StubGateway::default());
    *repo.snapshot.lock().unwrap() = Some(stale_snapshot());

    let svc = BalanceService::new(
        Arc::new(FixedAccountRepo {
            account: linked_account(),
        }),
        repo,
        gateway.clone(),
        config(),
    );

    let got = svc.get_balance("acct-1").await.unwrap();
    assert_eq!(got.balance, dec!(2500.00));
    assert_eq!(gateway.sync_calls.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.fetch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stale_read_fallback_when_refresh_fails() {
    let repo = Arc::new(InMemoryBalanceRepo::default());
    let gateway = Arc::new(StubGateway::default());
    gateway.fail.store(true, Ordering::SeqCst);
    *repo.snapshot.lock().unwrap() = Some(stale_snapshot());

    let svc = BalanceService::new(
        Arc::new(FixedAccountRepo {
            account: linked_account(),
        }),
        repo,
        gateway,
        config(),
    );

    // Refresh path fails entirely; the prior snapshot is returned.
    let got = svc.get_balance("acct-1").await.unwrap();
    assert_eq!(got.balance, dec!(1000.00));
}

#[tokio::test]
async fn test_error_when_no_snapshot_ever_recorded() {
    let repo = Arc::new(InMemoryBalanceRepo::default());
    let gateway = Arc::new(StubGateway::default());
    gateway.fail.store(true, Ordering::SeqCst);

    let svc = BalanceService::new(
        Arc::new(FixedAccountRepo {
            account: linked_account(),
        }),
        repo,
        gateway,
        config(),
    );

    assert!(svc.get_balance("acct-1").await.is_err());
}

#[tokio::test]
async fn test_missing_bank_link_rejected_before_upstream_call() {
    let repo = Arc::new(InMemoryBalanceRepo::default());
    let gateway = Arc::new(StubGateway::default());
    let mut account = linked_account();
    account.bank_account_ref = None;

    let svc = BalanceService::new(
        Arc::new(FixedAccountRepo { account }),
        repo,
        gateway.clone(),
        config(),
    );

    assert!(svc.get_balance("acct-1").await.is_err());
    assert_eq!(gateway.sync_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_stale_readers_collapse_to_one_refresh() {
    let repo = Arc::new(InMemoryBalanceRepo::default());
    let gateway = Arc::new(StubGateway::default());
    *repo.snapshot.lock().unwrap() = Some(stale_snapshot());

    let svc = Arc::new(BalanceService::new(
        Arc::new(FixedAccountRepo {
            account: linked_account(),
        }),
        repo,
        gateway.clone(),
        config(),
    ));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            svc.get_balance("acct-1").await.unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().balance, dec!(2500.00));
    }

    // Late readers re-read the fresh snapshot instead of refreshing again.
    assert_eq!(gateway.sync_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_webhook_update_goes_through_same_upsert() {
    let repo = Arc::new(InMemoryBalanceRepo::default());
    let gateway = Arc::new(StubGateway::default());

    let svc = BalanceService::new(
        Arc::new(FixedAccountRepo {
            account: linked_account(),
        }),
        repo,
        gateway.clone(),
        config(),
    );

    let snapshot = svc
        .apply_remote_balance(
            "acct-1",
            RemoteBalance {
                provider_account_id: "prov-1".to_string(),
                balance: dec!(3200.00),
                currency: "NGN".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(snapshot.balance, dec!(3200.00));

    // The pushed snapshot now serves reads without touching the upstream.
    let got = svc.get_balance("acct-1").await.unwrap();
    assert_eq!(got.balance, dec!(3200.00));
    assert_eq!(gateway.sync_calls.load(Ordering::SeqCst), 0);
}
