//! Inferred deal domain model.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use uuid::Uuid;

use crate::constants::{
    DEFAULT_MATCH_LOOKBACK_HOURS, DEFAULT_MATCH_WINDOW_HOURS, DEFAULT_RATE_TOLERANCE_PERCENT,
};

/// Classification of a deal's effective rate against the reference rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Valid,
    Overpayment,
    Underpayment,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Overpayment => "overpayment",
            Self::Underpayment => "underpayment",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "overpayment" => Self::Overpayment,
            "underpayment" => Self::Underpayment,
            _ => Self::Valid,
        }
    }

    /// Classifies an error percentage against a tolerance. The boundary is
    /// inclusive: exactly `tolerance` percent off is still valid.
    pub fn classify(error_percent: Decimal, tolerance_percent: Decimal) -> Self {
        if error_percent.abs() <= tolerance_percent {
            Self::Valid
        } else if error_percent > tolerance_percent {
            Self::Overpayment
        } else {
            Self::Underpayment
        }
    }
}

/// An inferred pairing of fiat inflow(s) and crypto outflow(s) believed to
/// represent one real-world exchange.
///
/// Created once per unique transaction grouping (enforced by `group_hash`)
/// and immutable afterwards; re-running the matcher over an unchanged
/// transaction set is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferredDeal {
    pub id: String,
    pub account_id: String,
    pub bank_transaction_ids: Vec<String>,
    pub crypto_transaction_ids: Vec<String>,
    /// Stable hash of the sorted member transaction ids; unique per account.
    pub group_hash: String,
    /// Total fiat amount divided by total crypto amount within the group.
    pub effective_rate: Decimal,
    /// Percentage difference between effective and reference rate.
    pub error_percent: Decimal,
    pub status: DealStatus,
    pub created_at: DateTime<Utc>,
}

impl InferredDeal {
    pub fn new(
        account_id: &str,
        bank_transaction_ids: Vec<String>,
        crypto_transaction_ids: Vec<String>,
        effective_rate: Decimal,
        error_percent: Decimal,
        status: DealStatus,
    ) -> Self {
        let hash = group_hash(account_id, &bank_transaction_ids, &crypto_transaction_ids);
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            bank_transaction_ids,
            crypto_transaction_ids,
            group_hash: hash,
            effective_rate,
            error_percent,
            status,
            created_at: Utc::now(),
        }
    }
}

/// Stable identifier of a specific set of transactions considered together.
///
/// SHA-256 over the account id and the sorted, namespaced member ids, so the
/// hash is independent of observation order and wall-clock re-runs.
pub fn group_hash(account_id: &str, bank_ids: &[String], crypto_ids: &[String]) -> String {
    let mut members: Vec<String> = bank_ids
        .iter()
        .map(|id| format!("bank:{id}"))
        .chain(crypto_ids.iter().map(|id| format!("crypto:{id}")))
        .collect();
    members.sort();

    let mut hasher = Sha256::new();
    hasher.update(account_id.as_bytes());
    for member in &members {
        hasher.update([0u8]);
        hasher.update(member.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Tuning knobs for the matching engine.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Transactions whose gap to the group's latest member is within this
    /// window join the same candidate deal.
    pub window: Duration,
    /// Classification tolerance, in percent.
    pub tolerance_percent: Decimal,
    /// How far back reconciliation reads the ledgers.
    pub lookback: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            window: Duration::hours(DEFAULT_MATCH_WINDOW_HOURS),
            tolerance_percent: Decimal::from_str(DEFAULT_RATE_TOLERANCE_PERCENT)
                .unwrap_or(Decimal::TWO),
            lookback: Duration::hours(DEFAULT_MATCH_LOOKBACK_HOURS),
        }
    }
}
