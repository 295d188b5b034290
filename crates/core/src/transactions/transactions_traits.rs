//! Transaction repository, feed, and ingest service traits.
//!
//! Repository traits are implemented by the storage layer; feed traits are
//! implemented by adapters over the upstream API clients, so the services
//! and pollers stay testable without HTTP.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::transactions_model::{
    BankTransaction, CryptoTransaction, IngestOutcome, NewBankTransaction, NewCryptoTransaction,
};
use crate::errors::Result;

/// Contract for the append-only bank transaction ledger.
#[async_trait]
pub trait BankTransactionRepositoryTrait: Send + Sync {
    /// Looks up a record by its upstream identifier.
    fn find_by_external_id(&self, external_id: &str) -> Result<Option<BankTransaction>>;

    /// Inserts a new record. The unique index on `external_id` is the final
    /// race-safety backstop; implementations surface violations as
    /// `DatabaseError::UniqueViolation`.
    async fn insert(&self, tx: BankTransaction) -> Result<BankTransaction>;

    /// Lists an account's transactions with `occurred_at >= since`, most
    /// recent first.
    fn list_recent(&self, account_id: &str, since: DateTime<Utc>) -> Result<Vec<BankTransaction>>;

    /// Newest `occurred_at` stored for an account, used as the poll cursor.
    fn latest_occurred_at(&self, account_id: &str) -> Result<Option<DateTime<Utc>>>;
}

/// Contract for the append-only crypto transaction ledger.
#[async_trait]
pub trait CryptoTransactionRepositoryTrait: Send + Sync {
    /// Looks up a record by its exchange-internal identifier. The on-chain
    /// id is deliberately not a lookup key.
    fn find_by_external_id(&self, external_id: &str) -> Result<Option<CryptoTransaction>>;

    /// Inserts a new record; violations surface as `UniqueViolation`.
    async fn insert(&self, tx: CryptoTransaction) -> Result<CryptoTransaction>;

    /// Lists an account's completed withdrawals with `applied_at >= since`,
    /// most recent first.
    fn list_recent_completed(
        &self,
        account_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CryptoTransaction>>;
}

/// Fetches bank transactions from the aggregator for one linked account.
#[async_trait]
pub trait BankFeedTrait: Send + Sync {
    /// Fetches transactions for the given provider account, optionally
    /// bounded to those after `since`. Amounts are already normalized to
    /// major units by the adapter.
    async fn fetch_transactions(
        &self,
        provider_account_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<NewBankTransaction>>;
}

/// Fetches completed withdrawals from the exchange for one linked account.
#[async_trait]
pub trait ExchangeFeedTrait: Send + Sync {
    async fn fetch_withdrawals(
        &self,
        provider_account_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<NewCryptoTransaction>>;
}

/// Contract for idempotent, at-least-once-safe ingestion.
#[async_trait]
pub trait IngestServiceTrait: Send + Sync {
    /// Persists a bank transaction if its external id has not been seen.
    async fn ingest_bank(
        &self,
        account_id: &str,
        raw: NewBankTransaction,
    ) -> Result<IngestOutcome>;

    /// Persists a crypto withdrawal if its external id has not been seen.
    async fn ingest_crypto(
        &self,
        account_id: &str,
        raw: NewCryptoTransaction,
    ) -> Result<IngestOutcome>;
}
