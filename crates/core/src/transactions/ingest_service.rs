//! Idempotent transaction ingestion (the dedup store front-end).

use log::{debug, warn};
use std::sync::Arc;

use super::transactions_model::{
    IngestOutcome, NewBankTransaction, NewCryptoTransaction, WithdrawalStatus,
};
use super::transactions_traits::{
    BankTransactionRepositoryTrait, CryptoTransactionRepositoryTrait, IngestServiceTrait,
};
use crate::errors::Result;

/// Service persisting raw upstream transactions exactly once per external id.
///
/// The flow is look-up-then-insert; the unique index on `external_id` is the
/// final backstop when two overlapping polls (or a webhook racing a poll)
/// hand in the same transaction concurrently. First-insert-wins is the
/// contract: the stored record is never updated from a re-observation.
pub struct IngestService {
    bank_repository: Arc<dyn BankTransactionRepositoryTrait>,
    crypto_repository: Arc<dyn CryptoTransactionRepositoryTrait>,
}

impl IngestService {
    pub fn new(
        bank_repository: Arc<dyn BankTransactionRepositoryTrait>,
        crypto_repository: Arc<dyn CryptoTransactionRepositoryTrait>,
    ) -> Self {
        Self {
            bank_repository,
            crypto_repository,
        }
    }
}

#[async_trait::async_trait]
impl IngestServiceTrait for IngestService {
    async fn ingest_bank(
        &self,
        account_id: &str,
        raw: NewBankTransaction,
    ) -> Result<IngestOutcome> {
        if self
            .bank_repository
            .find_by_external_id(&raw.external_id)?
            .is_some()
        {
            debug!(
                "Bank tx {} already stored for account {}; skipping",
                raw.external_id, account_id
            );
            return Ok(IngestOutcome { inserted: false });
        }

        let external_id = raw.external_id.clone();
        let record = raw.into_record(account_id)?;
        match self.bank_repository.insert(record).await {
            Ok(stored) => {
                debug!(
                    "Stored bank tx {} for account {}",
                    stored.external_id, account_id
                );
                Ok(IngestOutcome { inserted: true })
            }
            Err(e) if e.is_unique_violation() => {
                // Lost the race against a concurrent poll or webhook.
                debug!(
                    "Bank tx {} inserted concurrently for account {}; skipping",
                    external_id, account_id
                );
                Ok(IngestOutcome { inserted: false })
            }
            Err(e) => Err(e),
        }
    }

    async fn ingest_crypto(
        &self,
        account_id: &str,
        raw: NewCryptoTransaction,
    ) -> Result<IngestOutcome> {
        if raw.status != WithdrawalStatus::Completed {
            warn!(
                "Withdrawal {} for account {} is {}; only completed withdrawals are ingested",
                raw.external_id,
                account_id,
                raw.status.as_str()
            );
            return Ok(IngestOutcome { inserted: false });
        }

        if self
            .crypto_repository
            .find_by_external_id(&raw.external_id)?
            .is_some()
        {
            debug!(
                "Withdrawal {} already stored for account {}; skipping",
                raw.external_id, account_id
            );
            return Ok(IngestOutcome { inserted: false });
        }

        let external_id = raw.external_id.clone();
        let record = raw.into_record(account_id)?;
        match self.crypto_repository.insert(record).await {
            Ok(stored) => {
                debug!(
                    "Stored withdrawal {} for account {}",
                    stored.external_id, account_id
                );
                Ok(IngestOutcome { inserted: true })
            }
            Err(e) if e.is_unique_violation() => {
                debug!(
                    "Withdrawal {} inserted concurrently for account {}; skipping",
                    external_id, account_id
                );
                Ok(IngestOutcome { inserted: false })
            }
            Err(e) => Err(e),
        }
    }
}
