//! Tests for the deterministic matcher.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::deals_model::{InferredDeal, MatchConfig};
use super::deals_traits::{DealRepositoryTrait, MatchingServiceTrait};
use super::matching_service::MatchingService;
use crate::errors::{DatabaseError, Error, Result};
use crate::transactions::{
    BankTransaction, BankTransactionRepositoryTrait, CryptoTransaction,
    CryptoTransactionRepositoryTrait, TxDirection, WithdrawalStatus,
};

#[derive(Default)]
struct Ledger {
    bank: Mutex<Vec<BankTransaction>>,
    crypto: Mutex<Vec<CryptoTransaction>>,
}

#[async_trait]
impl BankTransactionRepositoryTrait for Ledger {
    fn find_by_external_id(&self, external_id: &str) -> Result<Option<BankTransaction>> {
        Ok(self
            .bank
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.external_id == external_id)
            .cloned())
    }

    async fn insert(&self, tx: BankTransaction) -> Result<BankTransaction> {
        self.bank.lock().unwrap().push(tx.clone());
        Ok(tx)
    }

    fn list_recent(
        &self,
        account_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<BankTransaction>> {
        let mut out: Vec<_> = self
            .bank
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.account_id == account_id && t.occurred_at >= since)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(out)
    }

    fn latest_occurred_at(&self, account_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .bank
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.account_id == account_id)
            .map(|t| t.occurred_at)
            .max())
    }
}

#[async_trait]
impl CryptoTransactionRepositoryTrait for Ledger {
    fn find_by_external_id(&self, external_id: &str) -> Result<Option<CryptoTransaction>> {
        Ok(self
            .crypto
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.external_id == external_id)
            .cloned())
    }

    async fn insert(&self, tx: CryptoTransaction) -> Result<CryptoTransaction> {
        self.crypto.lock().unwrap().push(tx.clone());
        Ok(tx)
    }

    fn list_recent_completed(
        &self,
        account_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CryptoTransaction>> {
        let mut out: Vec<_> = self
            .crypto
            .lock()
            .unwrap()
            .iter()
            .filter(|t| {
                t.account_id == account_id
                    && t.applied_at >= since
                    && t.status == WithdrawalStatus::Completed
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(out)
    }
}

#[derive(Default)]
struct InMemoryDealRepo {
    rows: Mutex<Vec<InferredDeal>>,
}

#[async_trait]
impl DealRepositoryTrait for InMemoryDealRepo {
    fn find_by_group_hash(&self, account_id: &str, hash: &str) -> Result<Option<InferredDeal>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.account_id == account_id && d.group_hash == hash)
            .cloned())
    }

    async fn insert(&self, deal: InferredDeal) -> Result<InferredDeal> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|d| d.account_id == deal.account_id && d.group_hash == deal.group_hash)
        {
            return Err(Error::Database(DatabaseError::UniqueViolation(
                "inferred_deals.group_hash".to_string(),
            )));
        }
        rows.push(deal.clone());
        Ok(deal)
    }

    fn list_for_account(&self, account_id: &str) -> Result<Vec<InferredDeal>> {
        let mut out: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.account_id == account_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}

const ACCOUNT: &str = "acct-1";

fn credit(amount: Decimal, at: DateTime<Utc>) -> BankTransaction {
    BankTransaction {
        id: Uuid::new_v4().to_string(),
        source: "mono".to_string(),
        external_id: Uuid::new_v4().to_string(),
        account_id: ACCOUNT.to_string(),
        amount,
        narration: None,
        direction: TxDirection::Credit,
        balance_after: None,
        category: None,
        occurred_at: at,
        created_at: at,
    }
}

fn debit(amount: Decimal, at: DateTime<Utc>) -> BankTransaction {
    let mut tx = credit(amount, at);
    tx.direction = TxDirection::Debit;
    tx
}

fn withdrawal(amount: Decimal, at: DateTime<Utc>) -> CryptoTransaction {
    CryptoTransaction {
        id: Uuid::new_v4().to_string(),
        account_id: ACCOUNT.to_string(),
        external_id: Uuid::new_v4().to_string(),
        chain_tx_id: None,
        amount,
        fee: dec!(0.001),
        asset: "USDT".to_string(),
        network_address: None,
        applied_at: at,
        completed_at: Some(at),
        conversion_rate: None,
        status: WithdrawalStatus::Completed,
        created_at: at,
    }
}

struct Fixture {
    ledger: Arc<Ledger>,
    deals: Arc<InMemoryDealRepo>,
    service: MatchingService,
}

fn fixture() -> Fixture {
    let ledger = Arc::new(Ledger::default());
    let deals = Arc::new(InMemoryDealRepo::default());
    let service = MatchingService::new(
        ledger.clone(),
        ledger.clone(),
        deals.clone(),
        MatchConfig::default(),
    );
    Fixture {
        ledger,
        deals,
        service,
    }
}

#[tokio::test]
async fn test_rejects_non_positive_reference_rate() {
    let f = fixture();
    assert!(f.service.reconcile(ACCOUNT, dec!(0)).await.is_err());
    assert!(f.service.reconcile(ACCOUNT, dec!(-10)).await.is_err());
}

#[tokio::test]
async fn test_no_bank_transactions_yields_empty_result() {
    let f = fixture();
    let now = Utc::now();
    f.ledger
        .crypto
        .lock()
        .unwrap()
        .push(withdrawal(dec!(1), now - Duration::hours(1)));

    let deals = f.service.reconcile(ACCOUNT, dec!(1000)).await.unwrap();
    assert!(deals.is_empty());
}

#[tokio::test]
async fn test_debits_never_match() {
    let f = fixture();
    let now = Utc::now();
    f.ledger
        .bank
        .lock()
        .unwrap()
        .push(debit(dec!(1000), now - Duration::hours(2)));
    f.ledger
        .crypto
        .lock()
        .unwrap()
        .push(withdrawal(dec!(1), now - Duration::hours(1)));

    let deals = f.service.reconcile(ACCOUNT, dec!(1000)).await.unwrap();
    assert!(deals.is_empty());
}

#[tokio::test]
async fn test_rate_classification_boundary() {
    // tolerance 2%, reference 1000: 1020 and 980 are exactly on the
    // boundary and valid; 1021 and 979 are outside.
    let cases = [
        (dec!(1020), "valid"),
        (dec!(1021), "overpayment"),
        (dec!(980), "valid"),
        (dec!(979), "underpayment"),
    ];

    for (fiat, expected) in cases {
        let f = fixture();
        let now = Utc::now();
        f.ledger
            .bank
            .lock()
            .unwrap()
            .push(credit(fiat, now - Duration::hours(2)));
        f.ledger
            .crypto
            .lock()
            .unwrap()
            .push(withdrawal(dec!(1), now - Duration::hours(1)));

        let deals = f.service.reconcile(ACCOUNT, dec!(1000)).await.unwrap();
        assert_eq!(deals.len(), 1, "fiat {}", fiat);
        assert_eq!(deals[0].status.as_str(), expected, "fiat {}", fiat);
        assert_eq!(deals[0].effective_rate, fiat);
    }
}

#[tokio::test]
async fn test_window_grouping_chains_within_window() {
    // Two credits 11 hours apart with an outflow between them: one group,
    // one deal spanning all three.
    let f = fixture();
    let base = Utc::now() - Duration::hours(20);
    f.ledger.bank.lock().unwrap().extend([
        credit(dec!(500), base),
        credit(dec!(520), base + Duration::hours(11)),
    ]);
    f.ledger
        .crypto
        .lock()
        .unwrap()
        .push(withdrawal(dec!(1), base + Duration::hours(5)));

    let deals = f.service.reconcile(ACCOUNT, dec!(1000)).await.unwrap();
    assert_eq!(deals.len(), 1);
    assert_eq!(deals[0].bank_transaction_ids.len(), 2);
    assert_eq!(deals[0].crypto_transaction_ids.len(), 1);
    assert_eq!(deals[0].effective_rate, dec!(1020));
}

#[tokio::test]
async fn test_window_grouping_splits_on_gap() {
    // A credit 13 hours after the outflow starts a new group; neither group
    // then has both sides, so no deal forms.
    let f = fixture();
    let base = Utc::now() - Duration::hours(20);
    f.ledger
        .crypto
        .lock()
        .unwrap()
        .push(withdrawal(dec!(1), base));
    f.ledger
        .bank
        .lock()
        .unwrap()
        .push(credit(dec!(1000), base + Duration::hours(13)));

    let deals = f.service.reconcile(ACCOUNT, dec!(1000)).await.unwrap();
    assert!(deals.is_empty());
}

#[tokio::test]
async fn test_zero_crypto_amount_group_skipped() {
    let f = fixture();
    let now = Utc::now();
    f.ledger
        .bank
        .lock()
        .unwrap()
        .push(credit(dec!(1000), now - Duration::hours(2)));
    // Constructed directly: ingestion would reject a zero amount, but the
    // matcher must still guard the division.
    f.ledger
        .crypto
        .lock()
        .unwrap()
        .push(withdrawal(dec!(0), now - Duration::hours(1)));

    let deals = f.service.reconcile(ACCOUNT, dec!(1000)).await.unwrap();
    assert!(deals.is_empty());
}

#[tokio::test]
async fn test_reconcile_idempotence() {
    let f = fixture();
    let now = Utc::now();
    f.ledger
        .bank
        .lock()
        .unwrap()
        .push(credit(dec!(1020), now - Duration::hours(2)));
    f.ledger
        .crypto
        .lock()
        .unwrap()
        .push(withdrawal(dec!(1), now - Duration::hours(1)));

    let first = f.service.reconcile(ACCOUNT, dec!(1000)).await.unwrap();
    let second = f.service.reconcile(ACCOUNT, dec!(1000)).await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0].id, second[0].id);
    assert_eq!(first[0].group_hash, second[0].group_hash);
    assert_eq!(f.deals.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_new_transaction_extends_candidate_set() {
    // A deal exists; a later inflow/outflow pair outside the first window
    // produces a second deal without disturbing the first.
    let f = fixture();
    let base = Utc::now() - Duration::hours(40);
    f.ledger
        .bank
        .lock()
        .unwrap()
        .push(credit(dec!(1000), base));
    f.ledger
        .crypto
        .lock()
        .unwrap()
        .push(withdrawal(dec!(1), base + Duration::hours(1)));

    let first = f.service.reconcile(ACCOUNT, dec!(1000)).await.unwrap();
    assert_eq!(first.len(), 1);

    f.ledger
        .bank
        .lock()
        .unwrap()
        .push(credit(dec!(950), base + Duration::hours(20)));
    f.ledger
        .crypto
        .lock()
        .unwrap()
        .push(withdrawal(dec!(1), base + Duration::hours(21)));

    let second = f.service.reconcile(ACCOUNT, dec!(1000)).await.unwrap();
    assert_eq!(second.len(), 2);
    assert!(second.iter().any(|d| d.id == first[0].id));
    assert_eq!(f.deals.rows.lock().unwrap().len(), 2);
}
