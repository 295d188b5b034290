use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::OptionalExtension;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::bank_transactions;
use crate::schema::bank_transactions::dsl::*;
use crate::utils::{format_datetime, parse_datetime_tolerant};

use super::model::BankTransactionDB;
use dealsync_core::transactions::{BankTransaction, BankTransactionRepositoryTrait};
use dealsync_core::Result;

/// Repository for the append-only bank transaction ledger.
pub struct BankTransactionRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl BankTransactionRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl BankTransactionRepositoryTrait for BankTransactionRepository {
    fn find_by_external_id(&self, ext_id: &str) -> Result<Option<BankTransaction>> {
        let mut conn = get_connection(&self.pool)?;

        let row = bank_transactions
            .select(BankTransactionDB::as_select())
            .filter(external_id.eq(ext_id))
            .first::<BankTransactionDB>(&mut conn)
            .optional()
            .into_core()?;

        Ok(row.map(BankTransaction::from))
    }

    async fn insert(&self, tx: BankTransaction) -> Result<BankTransaction> {
        self.writer
            .exec(move |conn| {
                let tx_db: BankTransactionDB = tx.into();
                diesel::insert_into(bank_transactions::table)
                    .values(&tx_db)
                    .execute(conn)
                    .into_core()?;
                Ok(tx_db.into())
            })
            .await
    }

    fn list_recent(
        &self,
        acct_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<BankTransaction>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = bank_transactions
            .select(BankTransactionDB::as_select())
            .filter(account_id.eq(acct_id))
            .filter(occurred_at.ge(format_datetime(since)))
            .order(occurred_at.desc())
            .load::<BankTransactionDB>(&mut conn)
            .into_core()?;

        Ok(rows.into_iter().map(BankTransaction::from).collect())
    }

    fn latest_occurred_at(&self, acct_id: &str) -> Result<Option<DateTime<Utc>>> {
        let mut conn = get_connection(&self.pool)?;

        let latest: Option<String> = bank_transactions
            .filter(account_id.eq(acct_id))
            .select(diesel::dsl::max(occurred_at))
            .first(&mut conn)
            .into_core()?;

        Ok(latest.map(|raw| parse_datetime_tolerant(&raw, "occurred_at")))
    }
}
