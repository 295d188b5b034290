//! Database models for bank and crypto transactions.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::{
    format_datetime, format_datetime_opt, parse_datetime_opt_tolerant, parse_datetime_tolerant,
    parse_decimal_opt_tolerant, parse_decimal_tolerant,
};
use dealsync_core::transactions::{
    BankTransaction, CryptoTransaction, TxDirection, WithdrawalStatus,
};

/// Database model for bank transactions.
#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::bank_transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BankTransactionDB {
    pub id: String,
    pub source: String,
    pub external_id: String,
    pub account_id: String,
    pub amount: String,
    pub narration: Option<String>,
    pub direction: String,
    pub balance_after: Option<String>,
    pub category: Option<String>,
    pub occurred_at: String,
    pub created_at: String,
}

impl From<BankTransactionDB> for BankTransaction {
    fn from(db: BankTransactionDB) -> Self {
        Self {
            id: db.id,
            source: db.source,
            external_id: db.external_id,
            account_id: db.account_id,
            amount: parse_decimal_tolerant(&db.amount, "amount"),
            narration: db.narration,
            direction: TxDirection::parse(&db.direction),
            balance_after: parse_decimal_opt_tolerant(db.balance_after.as_deref(), "balance_after"),
            category: db.category,
            occurred_at: parse_datetime_tolerant(&db.occurred_at, "occurred_at"),
            created_at: parse_datetime_tolerant(&db.created_at, "created_at"),
        }
    }
}

impl From<BankTransaction> for BankTransactionDB {
    fn from(domain: BankTransaction) -> Self {
        Self {
            id: domain.id,
            source: domain.source,
            external_id: domain.external_id,
            account_id: domain.account_id,
            amount: domain.amount.to_string(),
            narration: domain.narration,
            direction: domain.direction.as_str().to_string(),
            balance_after: domain.balance_after.map(|d| d.to_string()),
            category: domain.category,
            occurred_at: format_datetime(domain.occurred_at),
            created_at: format_datetime(domain.created_at),
        }
    }
}

/// Database model for crypto withdrawals.
#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::crypto_transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CryptoTransactionDB {
    pub id: String,
    pub account_id: String,
    pub external_id: String,
    pub chain_tx_id: Option<String>,
    pub amount: String,
    pub fee: String,
    pub asset: String,
    pub network_address: Option<String>,
    pub applied_at: String,
    pub completed_at: Option<String>,
    pub conversion_rate: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl From<CryptoTransactionDB> for CryptoTransaction {
    fn from(db: CryptoTransactionDB) -> Self {
        Self {
            id: db.id,
            account_id: db.account_id,
            external_id: db.external_id,
            chain_tx_id: db.chain_tx_id,
            amount: parse_decimal_tolerant(&db.amount, "amount"),
            fee: parse_decimal_tolerant(&db.fee, "fee"),
            asset: db.asset,
            network_address: db.network_address,
            applied_at: parse_datetime_tolerant(&db.applied_at, "applied_at"),
            completed_at: parse_datetime_opt_tolerant(db.completed_at.as_deref(), "completed_at"),
            conversion_rate: parse_decimal_opt_tolerant(
                db.conversion_rate.as_deref(),
                "conversion_rate",
            ),
            status: WithdrawalStatus::parse(&db.status),
            created_at: parse_datetime_tolerant(&db.created_at, "created_at"),
        }
    }
}

impl From<CryptoTransaction> for CryptoTransactionDB {
    fn from(domain: CryptoTransaction) -> Self {
        Self {
            id: domain.id,
            account_id: domain.account_id,
            external_id: domain.external_id,
            chain_tx_id: domain.chain_tx_id,
            amount: domain.amount.to_string(),
            fee: domain.fee.to_string(),
            asset: domain.asset,
            network_address: domain.network_address,
            applied_at: format_datetime(domain.applied_at),
            completed_at: format_datetime_opt(domain.completed_at),
            conversion_rate: domain.conversion_rate.map(|d| d.to_string()),
            status: domain.status.as_str().to_string(),
            created_at: format_datetime(domain.created_at),
        }
    }
}
