//! Staleness-aware balance cache.

use chrono::Utc;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::balances_model::{BalanceConfig, BalanceSnapshot, RemoteBalance};
use super::balances_traits::{BalanceGatewayTrait, BalanceRepositoryTrait, BalanceServiceTrait};
use crate::accounts::AccountRepositoryTrait;
use crate::errors::{Error, Result, ValidationError};

/// Balance cache over the snapshot store and the upstream gateway.
///
/// Reads serve the cached snapshot while it is fresh. On staleness the
/// service triggers an upstream sync, waits a fixed settle delay, fetches
/// and upserts the new balance. Concurrent stale readers for one account are
/// collapsed behind a per-account lock; a refresh that fails falls back to
/// the last-known snapshot (stale-but-available) when one exists.
pub struct BalanceService {
    accounts: Arc<dyn AccountRepositoryTrait>,
    repository: Arc<dyn BalanceRepositoryTrait>,
    gateway: Arc<dyn BalanceGatewayTrait>,
    config: BalanceConfig,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl BalanceService {
    pub fn new(
        accounts: Arc<dyn AccountRepositoryTrait>,
        repository: Arc<dyn BalanceRepositoryTrait>,
        gateway: Arc<dyn BalanceGatewayTrait>,
        config: BalanceConfig,
    ) -> Self {
        Self {
            accounts,
            repository,
            gateway,
            config,
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn account_lock(&self, account_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        locks
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Trigger sync, wait for the upstream to settle, fetch, upsert.
    async fn refresh(&self, account_id: &str, provider_account_id: &str) -> Result<BalanceSnapshot> {
        self.gateway.trigger_sync(provider_account_id).await?;
        tokio::time::sleep(self.config.settle_delay).await;
        let remote = self.gateway.fetch_balance(provider_account_id).await?;

        let snapshot = BalanceSnapshot {
            account_id: account_id.to_string(),
            provider_account_id: remote.provider_account_id,
            balance: remote.balance,
            currency: remote.currency,
            fetched_at: Utc::now(),
        };
        self.repository.upsert(snapshot).await
    }
}

#[async_trait::async_trait]
impl BalanceServiceTrait for BalanceService {
    async fn get_balance(&self, account_id: &str) -> Result<BalanceSnapshot> {
        let now = Utc::now();
        if let Some(snapshot) = self.repository.latest(account_id)? {
            if snapshot.is_fresh(self.config.freshness_window, now) {
                return Ok(snapshot);
            }
        }

        // Stale or absent. Collapse concurrent readers into one in-flight
        // refresh per account; late arrivals re-read after the lock and
        // usually find a fresh snapshot.
        let lock = self.account_lock(account_id).await;
        let _guard = lock.lock().await;

        if let Some(snapshot) = self.repository.latest(account_id)? {
            if snapshot.is_fresh(self.config.freshness_window, Utc::now()) {
                return Ok(snapshot);
            }
        }

        let account = self.accounts.get_by_id(account_id)?;
        let provider_account_id = account.bank_account_ref.as_deref().ok_or_else(|| {
            Error::Validation(ValidationError::InvalidInput(format!(
                "account {} has no linked bank account",
                account_id
            )))
        })?;

        match self.refresh(account_id, provider_account_id).await {
            Ok(snapshot) => {
                debug!(
                    "Refreshed balance for account {}: {} {}",
                    account_id, snapshot.balance, snapshot.currency
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!(
                    "Balance refresh failed for account {}: {}; serving last-known snapshot",
                    account_id, e
                );
                match self.repository.latest(account_id)? {
                    Some(stale) => Ok(stale),
                    None => Err(e),
                }
            }
        }
    }

    async fn apply_remote_balance(
        &self,
        account_id: &str,
        remote: RemoteBalance,
    ) -> Result<BalanceSnapshot> {
        let snapshot = BalanceSnapshot {
            account_id: account_id.to_string(),
            provider_account_id: remote.provider_account_id,
            balance: remote.balance,
            currency: remote.currency,
            fetched_at: Utc::now(),
        };
        self.repository.upsert(snapshot).await
    }
}
