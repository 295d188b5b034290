//! Deterministic transaction matching.
//!
//! Replaces the upstream project's delegation of the matching decision to an
//! opaque inference call: the grouping window and rate tolerance are
//! configuration, the decision procedure is reproducible and testable.

use chrono::{DateTime, Utc};
use log::{debug, info};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::deals_model::{group_hash, DealStatus, InferredDeal, MatchConfig};
use super::deals_traits::{DealRepositoryTrait, MatchingServiceTrait};
use crate::errors::{Error, Result, ValidationError};
use crate::transactions::{
    BankTransaction, BankTransactionRepositoryTrait, CryptoTransaction,
    CryptoTransactionRepositoryTrait, TxDirection,
};

/// One transaction in the merged, time-sorted candidate stream.
enum Member<'a> {
    Bank(&'a BankTransaction),
    Crypto(&'a CryptoTransaction),
}

impl Member<'_> {
    fn at(&self) -> DateTime<Utc> {
        match self {
            Member::Bank(tx) => tx.occurred_at,
            Member::Crypto(tx) => tx.applied_at,
        }
    }
}

/// Matching engine over the two transaction ledgers and the deal store.
pub struct MatchingService {
    bank_repository: Arc<dyn BankTransactionRepositoryTrait>,
    crypto_repository: Arc<dyn CryptoTransactionRepositoryTrait>,
    deal_repository: Arc<dyn DealRepositoryTrait>,
    config: MatchConfig,
}

impl MatchingService {
    pub fn new(
        bank_repository: Arc<dyn BankTransactionRepositoryTrait>,
        crypto_repository: Arc<dyn CryptoTransactionRepositoryTrait>,
        deal_repository: Arc<dyn DealRepositoryTrait>,
        config: MatchConfig,
    ) -> Self {
        Self {
            bank_repository,
            crypto_repository,
            deal_repository,
            config,
        }
    }

    /// Clusters the merged stream by time: a transaction joins the running
    /// group while its gap to the group's latest member is within the
    /// matching window.
    fn cluster<'a>(&self, mut members: Vec<Member<'a>>) -> Vec<Vec<Member<'a>>> {
        members.sort_by_key(Member::at);

        let mut groups: Vec<Vec<Member<'a>>> = Vec::new();
        for member in members {
            if let Some(group) = groups.last_mut() {
                if let Some(latest) = group.last() {
                    if member.at() - latest.at() <= self.config.window {
                        group.push(member);
                        continue;
                    }
                }
            }
            groups.push(vec![member]);
        }
        groups
    }

    /// Evaluates one time group; returns None when it is not a candidate
    /// deal (missing a side, or undefined rate).
    fn evaluate(
        &self,
        account_id: &str,
        group: &[Member<'_>],
        reference_rate: Decimal,
    ) -> Option<InferredDeal> {
        let mut bank_ids = Vec::new();
        let mut crypto_ids = Vec::new();
        let mut total_fiat = Decimal::ZERO;
        let mut total_crypto = Decimal::ZERO;

        for member in group {
            match member {
                Member::Bank(tx) => {
                    bank_ids.push(tx.id.clone());
                    total_fiat += tx.amount;
                }
                Member::Crypto(tx) => {
                    crypto_ids.push(tx.id.clone());
                    total_crypto += tx.amount;
                }
            }
        }

        if bank_ids.is_empty() || crypto_ids.is_empty() {
            return None;
        }
        if total_crypto.is_zero() {
            debug!(
                "Skipping candidate group for account {}: zero crypto amount",
                account_id
            );
            return None;
        }

        let effective_rate = total_fiat / total_crypto;
        let error_percent = (effective_rate - reference_rate) / reference_rate * Decimal::ONE_HUNDRED;
        let status = DealStatus::classify(error_percent, self.config.tolerance_percent);

        Some(InferredDeal::new(
            account_id,
            bank_ids,
            crypto_ids,
            effective_rate,
            error_percent,
            status,
        ))
    }
}

#[async_trait::async_trait]
impl MatchingServiceTrait for MatchingService {
    async fn reconcile(
        &self,
        account_id: &str,
        reference_rate: Decimal,
    ) -> Result<Vec<InferredDeal>> {
        if reference_rate <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "reference rate must be positive, got {}",
                reference_rate
            ))));
        }

        let since = Utc::now() - self.config.lookback;
        let bank: Vec<BankTransaction> = self
            .bank_repository
            .list_recent(account_id, since)?
            .into_iter()
            .filter(|tx| tx.direction == TxDirection::Credit)
            .collect();

        // No fiat inflows means nothing to match; an empty result, not an
        // error.
        if bank.is_empty() {
            return Ok(Vec::new());
        }

        let crypto: Vec<CryptoTransaction> = self
            .crypto_repository
            .list_recent_completed(account_id, since)?;

        // Unchanged candidate set: if the whole set already produced a deal,
        // return it without regrouping.
        let bank_ids: Vec<String> = bank.iter().map(|tx| tx.id.clone()).collect();
        let crypto_ids: Vec<String> = crypto.iter().map(|tx| tx.id.clone()).collect();
        let candidate_hash = group_hash(account_id, &bank_ids, &crypto_ids);
        if let Some(existing) = self
            .deal_repository
            .find_by_group_hash(account_id, &candidate_hash)?
        {
            debug!(
                "Candidate set unchanged for account {}; returning existing deal {}",
                account_id, existing.id
            );
            return Ok(vec![existing]);
        }

        let members: Vec<Member<'_>> = bank
            .iter()
            .map(Member::Bank)
            .chain(crypto.iter().map(Member::Crypto))
            .collect();

        let mut deals = Vec::new();
        for group in self.cluster(members) {
            let Some(deal) = self.evaluate(account_id, &group, reference_rate) else {
                continue;
            };

            let hash = deal.group_hash.clone();
            if let Some(existing) = self.deal_repository.find_by_group_hash(account_id, &hash)? {
                deals.push(existing);
                continue;
            }

            match self.deal_repository.insert(deal).await {
                Ok(stored) => {
                    info!(
                        "Inferred {} deal {} for account {} (rate {}, error {}%)",
                        stored.status.as_str(),
                        stored.id,
                        account_id,
                        stored.effective_rate,
                        stored.error_percent
                    );
                    deals.push(stored);
                }
                Err(e) if e.is_unique_violation() => {
                    // A concurrent reconcile run persisted the same grouping.
                    if let Some(existing) =
                        self.deal_repository.find_by_group_hash(account_id, &hash)?
                    {
                        deals.push(existing);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Ok(deals)
    }
}
