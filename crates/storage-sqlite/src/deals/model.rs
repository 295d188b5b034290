//! Database model for inferred deals.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::{format_datetime, parse_datetime_tolerant, parse_decimal_tolerant};
use dealsync_core::deals::{DealStatus, InferredDeal};

/// Database model for inferred deals. Member id lists are stored as JSON
/// arrays in text columns.
#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::inferred_deals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InferredDealDB {
    pub id: String,
    pub account_id: String,
    pub bank_transaction_ids: String,
    pub crypto_transaction_ids: String,
    pub group_hash: String,
    pub effective_rate: String,
    pub error_percent: String,
    pub status: String,
    pub created_at: String,
}

fn parse_id_list(raw: &str, field_name: &str) -> Vec<String> {
    match serde_json::from_str(raw) {
        Ok(ids) => ids,
        Err(e) => {
            log::error!("Failed to parse {} '{}': {}", field_name, raw, e);
            Vec::new()
        }
    }
}

fn encode_id_list(ids: &[String]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

impl From<InferredDealDB> for InferredDeal {
    fn from(db: InferredDealDB) -> Self {
        Self {
            id: db.id,
            account_id: db.account_id,
            bank_transaction_ids: parse_id_list(&db.bank_transaction_ids, "bank_transaction_ids"),
            crypto_transaction_ids: parse_id_list(
                &db.crypto_transaction_ids,
                "crypto_transaction_ids",
            ),
            group_hash: db.group_hash,
            effective_rate: parse_decimal_tolerant(&db.effective_rate, "effective_rate"),
            error_percent: parse_decimal_tolerant(&db.error_percent, "error_percent"),
            status: DealStatus::parse(&db.status),
            created_at: parse_datetime_tolerant(&db.created_at, "created_at"),
        }
    }
}

impl From<InferredDeal> for InferredDealDB {
    fn from(domain: InferredDeal) -> Self {
        Self {
            id: domain.id,
            account_id: domain.account_id,
            bank_transaction_ids: encode_id_list(&domain.bank_transaction_ids),
            crypto_transaction_ids: encode_id_list(&domain.crypto_transaction_ids),
            group_hash: domain.group_hash,
            effective_rate: domain.effective_rate.to_string(),
            error_percent: domain.error_percent.to_string(),
            status: domain.status.as_str().to_string(),
            created_at: format_datetime(domain.created_at),
        }
    }
}
