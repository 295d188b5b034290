//! Account domain model.
//!
//! Accounts are owned by the (excluded) user-management layer; the core only
//! reads their upstream linkage and touches `last_synced_at` after a
//! successful poll cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A linked account as the pipeline sees it.
///
/// Holds zero or one bank-account reference and zero or one
/// exchange-account reference. A poller is only started for the upstreams
/// an account is actually linked to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    /// Fiat currency of the linked bank account.
    pub currency: String,
    /// Bank-aggregator account id, if a bank account is linked.
    pub bank_account_ref: Option<String>,
    /// Exchange-internal account id, if exchange credentials are linked.
    pub exchange_account_ref: Option<String>,
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn has_bank_link(&self) -> bool {
        self.bank_account_ref.is_some()
    }

    pub fn has_exchange_link(&self) -> bool {
        self.exchange_account_ref.is_some()
    }
}
