//! Database model for accounts.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::{
    format_datetime, format_datetime_opt, parse_datetime_opt_tolerant, parse_datetime_tolerant,
};
use dealsync_core::accounts::Account;

/// Database model for accounts.
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
#[diesel(table_name = crate::schema::accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountDB {
    pub id: String,
    pub name: String,
    pub currency: String,
    pub bank_account_ref: Option<String>,
    pub exchange_account_ref: Option<String>,
    pub is_active: bool,
    pub last_synced_at: Option<String>,
    pub created_at: String,
}

impl From<AccountDB> for Account {
    fn from(db: AccountDB) -> Self {
        Self {
            id: db.id,
            name: db.name,
            currency: db.currency,
            bank_account_ref: db.bank_account_ref,
            exchange_account_ref: db.exchange_account_ref,
            is_active: db.is_active,
            last_synced_at: parse_datetime_opt_tolerant(
                db.last_synced_at.as_deref(),
                "last_synced_at",
            ),
            created_at: parse_datetime_tolerant(&db.created_at, "created_at"),
        }
    }
}

impl From<Account> for AccountDB {
    fn from(domain: Account) -> Self {
        Self {
            id: domain.id,
            name: domain.name,
            currency: domain.currency,
            bank_account_ref: domain.bank_account_ref,
            exchange_account_ref: domain.exchange_account_ref,
            is_active: domain.is_active,
            last_synced_at: format_datetime_opt(domain.last_synced_at),
            created_at: format_datetime(domain.created_at),
        }
    }
}
