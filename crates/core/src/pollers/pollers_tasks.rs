//! Concrete poll tasks for the two upstreams.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;

use super::pollers_model::{CycleControl, CycleReport, Upstream};
use super::pollers_traits::PollTask;
use crate::accounts::{Account, AccountRepositoryTrait};
use crate::constants::DEFAULT_MATCH_LOOKBACK_HOURS;
use crate::errors::{Error, Result, ValidationError};
use crate::transactions::{
    BankFeedTrait, BankTransactionRepositoryTrait, ExchangeFeedTrait, IngestServiceTrait,
};

/// Polls the bank aggregator for new transactions on one account.
///
/// Uses the newest stored `occurred_at` as a cursor so repeat cycles only
/// ask the upstream for the tail; dedup in the ingest service still covers
/// the overlap a coarse upstream cursor can produce.
pub struct BankPollTask {
    accounts: Arc<dyn AccountRepositoryTrait>,
    bank_repository: Arc<dyn BankTransactionRepositoryTrait>,
    feed: Arc<dyn BankFeedTrait>,
    ingest: Arc<dyn IngestServiceTrait>,
}

impl BankPollTask {
    pub fn new(
        accounts: Arc<dyn AccountRepositoryTrait>,
        bank_repository: Arc<dyn BankTransactionRepositoryTrait>,
        feed: Arc<dyn BankFeedTrait>,
        ingest: Arc<dyn IngestServiceTrait>,
    ) -> Self {
        Self {
            accounts,
            bank_repository,
            feed,
            ingest,
        }
    }
}

#[async_trait]
impl PollTask for BankPollTask {
    fn upstream(&self) -> Upstream {
        Upstream::Bank
    }

    async fn run_cycle(&self, account: &Account, ctl: &CycleControl) -> Result<CycleReport> {
        let provider_id = account.bank_account_ref.as_deref().ok_or_else(|| {
            Error::Validation(ValidationError::MissingField("bankAccountRef".to_string()))
        })?;

        let since = self.bank_repository.latest_occurred_at(&account.id)?;
        let rows = self.feed.fetch_transactions(provider_id, since).await?;
        let fetched = rows.len();

        // Stop requested while the fetch was in flight: drop the results.
        if ctl.is_stopped() {
            return Ok(CycleReport {
                fetched,
                inserted: 0,
            });
        }

        let mut inserted = 0;
        for raw in rows {
            if self.ingest.ingest_bank(&account.id, raw).await?.inserted {
                inserted += 1;
            }
        }

        self.accounts
            .touch_last_synced(&account.id, Utc::now())
            .await?;
        Ok(CycleReport { fetched, inserted })
    }
}

/// Polls the exchange for completed withdrawals on one account.
///
/// The exchange API is queried over a sliding time window rather than a
/// cursor; the window is wide enough to re-observe withdrawals that
/// completed late, and dedup makes the re-observation harmless.
pub struct ExchangePollTask {
    accounts: Arc<dyn AccountRepositoryTrait>,
    feed: Arc<dyn ExchangeFeedTrait>,
    ingest: Arc<dyn IngestServiceTrait>,
    lookback: Duration,
}

impl ExchangePollTask {
    pub fn new(
        accounts: Arc<dyn AccountRepositoryTrait>,
        feed: Arc<dyn ExchangeFeedTrait>,
        ingest: Arc<dyn IngestServiceTrait>,
    ) -> Self {
        Self {
            accounts,
            feed,
            ingest,
            lookback: Duration::hours(DEFAULT_MATCH_LOOKBACK_HOURS),
        }
    }

    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }
}

#[async_trait]
impl PollTask for ExchangePollTask {
    fn upstream(&self) -> Upstream {
        Upstream::Exchange
    }

    async fn run_cycle(&self, account: &Account, ctl: &CycleControl) -> Result<CycleReport> {
        let provider_id = account.exchange_account_ref.as_deref().ok_or_else(|| {
            Error::Validation(ValidationError::MissingField(
                "exchangeAccountRef".to_string(),
            ))
        })?;

        let end = Utc::now();
        let start = end - self.lookback;
        let rows = self.feed.fetch_withdrawals(provider_id, start, end).await?;
        let fetched = rows.len();

        if ctl.is_stopped() {
            return Ok(CycleReport {
                fetched,
                inserted: 0,
            });
        }

        let mut inserted = 0;
        for raw in rows {
            if self.ingest.ingest_crypto(&account.id, raw).await?.inserted {
                inserted += 1;
            }
        }

        self.accounts
            .touch_last_synced(&account.id, Utc::now())
            .await?;
        Ok(CycleReport { fetched, inserted })
    }
}
