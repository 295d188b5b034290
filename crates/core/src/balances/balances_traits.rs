//! Balance repository, gateway, and service traits.

use async_trait::async_trait;

use super::balances_model::{BalanceSnapshot, RemoteBalance};
use crate::errors::Result;

/// Contract for the snapshot store (upsert, not append).
#[async_trait]
pub trait BalanceRepositoryTrait: Send + Sync {
    /// Current snapshot for an account, newest `fetched_at` across its
    /// provider accounts.
    fn latest(&self, account_id: &str) -> Result<Option<BalanceSnapshot>>;

    /// Upserts the snapshot for `(account_id, provider_account_id)`.
    /// `fetched_at` must never move backwards for a key; implementations
    /// drop updates that would.
    async fn upsert(&self, snapshot: BalanceSnapshot) -> Result<BalanceSnapshot>;
}

/// Upstream operations the balance cache needs. Implemented by an adapter
/// over the bank API client; mocked in tests.
#[async_trait]
pub trait BalanceGatewayTrait: Send + Sync {
    /// Asks the upstream to refresh its view of the account. Completes when
    /// the request is accepted, not when the sync finishes.
    async fn trigger_sync(&self, provider_account_id: &str) -> Result<()>;

    /// Fetches the current balance for the account.
    async fn fetch_balance(&self, provider_account_id: &str) -> Result<RemoteBalance>;
}

/// Contract for balance reads.
#[async_trait]
pub trait BalanceServiceTrait: Send + Sync {
    /// Returns the account's balance, refreshing from upstream when the
    /// cached snapshot is stale or absent. Falls back to the last-known
    /// snapshot if the refresh path fails; errors only when no snapshot has
    /// ever been recorded.
    async fn get_balance(&self, account_id: &str) -> Result<BalanceSnapshot>;

    /// Applies a balance update delivered out-of-band (webhook push) through
    /// the same snapshot upsert as polling.
    async fn apply_remote_balance(
        &self,
        account_id: &str,
        remote: RemoteBalance,
    ) -> Result<BalanceSnapshot>;
}
