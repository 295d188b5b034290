//! Account repository trait.
//!
//! The core never creates or deletes accounts; registration lives in the
//! excluded user-management layer. This trait covers the reads the pollers
//! and services need, plus the single field the core mutates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::accounts_model::Account;
use crate::errors::Result;

/// Contract for account lookups and the `last_synced_at` touch.
#[async_trait]
pub trait AccountRepositoryTrait: Send + Sync {
    /// Retrieves an account by its ID.
    fn get_by_id(&self, account_id: &str) -> Result<Account>;

    /// Lists active accounts (candidates for polling and reconciliation).
    fn list_active(&self) -> Result<Vec<Account>>;

    /// Records the time of the last successful poll cycle for an account.
    async fn touch_last_synced(&self, account_id: &str, at: DateTime<Utc>) -> Result<()>;
}
