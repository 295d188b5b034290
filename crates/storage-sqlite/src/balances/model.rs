//! Database model for balance snapshots.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::{format_datetime, parse_datetime_tolerant, parse_decimal_tolerant};
use dealsync_core::balances::BalanceSnapshot;

/// Database model for the balance snapshot. One row per
/// `(account, provider account)` pair, overwritten in place.
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::balance_snapshots)]
#[diesel(primary_key(account_id, provider_account_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BalanceSnapshotDB {
    pub account_id: String,
    pub provider_account_id: String,
    pub balance: String,
    pub currency: String,
    pub fetched_at: String,
}

impl From<BalanceSnapshotDB> for BalanceSnapshot {
    fn from(db: BalanceSnapshotDB) -> Self {
        Self {
            account_id: db.account_id,
            provider_account_id: db.provider_account_id,
            balance: parse_decimal_tolerant(&db.balance, "balance"),
            currency: db.currency,
            fetched_at: parse_datetime_tolerant(&db.fetched_at, "fetched_at"),
        }
    }
}

impl From<BalanceSnapshot> for BalanceSnapshotDB {
    fn from(domain: BalanceSnapshot) -> Self {
        Self {
            account_id: domain.account_id,
            provider_account_id: domain.provider_account_id,
            balance: domain.balance.to_string(),
            currency: domain.currency,
            fetched_at: format_datetime(domain.fetched_at),
        }
    }
}
