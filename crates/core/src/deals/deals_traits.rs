//! Deal repository and matching service traits.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::deals_model::InferredDeal;
use crate::errors::Result;

/// Contract for the inferred-deal store.
#[async_trait]
pub trait DealRepositoryTrait: Send + Sync {
    /// Looks up a deal by its group hash within an account.
    fn find_by_group_hash(&self, account_id: &str, hash: &str) -> Result<Option<InferredDeal>>;

    /// Inserts a new deal; a duplicate `(account_id, group_hash)` surfaces
    /// as `DatabaseError::UniqueViolation`.
    async fn insert(&self, deal: InferredDeal) -> Result<InferredDeal>;

    /// Lists an account's deals, most recent first.
    fn list_for_account(&self, account_id: &str) -> Result<Vec<InferredDeal>>;
}

/// Contract for reconciliation.
#[async_trait]
pub trait MatchingServiceTrait: Send + Sync {
    /// Groups the account's recent fiat inflows and crypto outflows into
    /// deals classified against `reference_rate`. Idempotent over an
    /// unchanged transaction set; rejects a non-positive rate synchronously.
    async fn reconcile(
        &self,
        account_id: &str,
        reference_rate: Decimal,
    ) -> Result<Vec<InferredDeal>>;
}
