//! Bank and crypto transaction domain models.
//!
//! Both ledgers are append-only: records are created on first sight of a
//! given `external_id` for an account and never mutated afterwards.
//! `external_id` uniqueness is the sole correctness anchor against duplicate
//! ingestion from retried or overlapping polls.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MINOR_UNITS_SCALE;
use crate::errors::{Error, Result, ValidationError};

/// Direction of a bank transaction as reported by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TxDirection {
    Credit,
    Debit,
    #[default]
    Unknown,
}

impl TxDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "credit" => Self::Credit,
            "debit" => Self::Debit,
            _ => Self::Unknown,
        }
    }
}

/// Status of an exchange withdrawal.
///
/// Only completed withdrawals are eligible for ingestion; the poller filters
/// before handing rows to the ingest service, and the matcher only reads
/// completed rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Completed,
    #[default]
    Pending,
    Failed,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// A stored fiat bank transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransaction {
    pub id: String,
    /// Aggregator the record came from (e.g. "mono").
    pub source: String,
    /// Upstream transaction identifier; unique across the ledger.
    pub external_id: String,
    pub account_id: String,
    /// Amount in major currency units.
    pub amount: Decimal,
    pub narration: Option<String>,
    pub direction: TxDirection,
    /// Account balance after this transaction, if the upstream reported it.
    pub balance_after: Option<Decimal>,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An incoming bank transaction, normalized but not yet persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBankTransaction {
    pub source: String,
    pub external_id: String,
    pub amount: Decimal,
    pub narration: Option<String>,
    pub direction: TxDirection,
    pub balance_after: Option<Decimal>,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl NewBankTransaction {
    /// Validates the payload and builds the immutable ledger record.
    pub fn into_record(self, account_id: &str) -> Result<BankTransaction> {
        if self.external_id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "externalId".to_string(),
            )));
        }
        if self.amount <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "bank transaction {} has non-positive amount {}",
                self.external_id, self.amount
            ))));
        }
        Ok(BankTransaction {
            id: Uuid::new_v4().to_string(),
            source: self.source,
            external_id: self.external_id,
            account_id: account_id.to_string(),
            amount: self.amount,
            narration: self.narration,
            direction: self.direction,
            balance_after: self.balance_after,
            category: self.category,
            occurred_at: self.occurred_at,
            created_at: Utc::now(),
        })
    }
}

/// A stored crypto withdrawal.
///
/// `chain_tx_id` (on-chain id) and `external_id` (exchange-internal id) are
/// distinct identifiers; only `external_id` participates in deduplication,
/// since a withdrawal may be re-observed under one id before the other is
/// known.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoTransaction {
    pub id: String,
    pub account_id: String,
    /// Exchange-internal withdrawal identifier; unique across the ledger.
    pub external_id: String,
    pub chain_tx_id: Option<String>,
    pub amount: Decimal,
    pub fee: Decimal,
    pub asset: String,
    pub network_address: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Reference market rate observed when the record was ingested.
    pub conversion_rate: Option<Decimal>,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
}

/// An incoming crypto withdrawal, not yet persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCryptoTransaction {
    pub external_id: String,
    pub chain_tx_id: Option<String>,
    pub amount: Decimal,
    pub fee: Decimal,
    pub asset: String,
    pub network_address: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub conversion_rate: Option<Decimal>,
    pub status: WithdrawalStatus,
}

impl NewCryptoTransaction {
    /// Validates the payload and builds the immutable ledger record.
    pub fn into_record(self, account_id: &str) -> Result<CryptoTransaction> {
        if self.external_id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "externalId".to_string(),
            )));
        }
        if self.asset.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "asset".to_string(),
            )));
        }
        if self.amount <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "withdrawal {} has non-positive amount {}",
                self.external_id, self.amount
            ))));
        }
        Ok(CryptoTransaction {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            external_id: self.external_id,
            chain_tx_id: self.chain_tx_id,
            amount: self.amount,
            fee: self.fee,
            asset: self.asset,
            network_address: self.network_address,
            applied_at: self.applied_at,
            completed_at: self.completed_at,
            conversion_rate: self.conversion_rate,
            status: self.status,
            created_at: Utc::now(),
        })
    }
}

/// Result of an ingest call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    /// True when a new record was stored; false when the external id was
    /// already present.
    pub inserted: bool,
}

/// Converts an amount reported in minor units (kobo, cents) to major units.
///
/// Invoked explicitly by the gateway adapter before a record is handed to
/// ingestion; downstream rate calculations assume major units everywhere.
pub fn normalize_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, MINOR_UNITS_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalize_minor_units() {
        assert_eq!(normalize_minor_units(150_000), dec!(1500.00));
        assert_eq!(normalize_minor_units(1), dec!(0.01));
        assert_eq!(normalize_minor_units(0), dec!(0.00));
    }

    #[test]
    fn test_bank_record_requires_external_id() {
        let raw = NewBankTransaction {
            source: "mono".to_string(),
            external_id: "  ".to_string(),
            amount: dec!(10),
            narration: None,
            direction: TxDirection::Credit,
            balance_after: None,
            category: None,
            occurred_at: Utc::now(),
        };
        assert!(raw.into_record("acct-1").is_err());
    }

    #[test]
    fn test_bank_record_rejects_non_positive_amount() {
        let raw = NewBankTransaction {
            source: "mono".to_string(),
            external_id: "tx-1".to_string(),
            amount: dec!(0),
            narration: None,
            direction: TxDirection::Credit,
            balance_after: None,
            category: None,
            occurred_at: Utc::now(),
        };
        assert!(raw.into_record("acct-1").is_err());
    }

    #[test]
    fn test_direction_round_trip() {
        for d in [TxDirection::Credit, TxDirection::Debit, TxDirection::Unknown] {
            assert_eq!(TxDirection::parse(d.as_str()), d);
        }
        assert_eq!(TxDirection::parse("something-else"), TxDirection::Unknown);
    }
}
