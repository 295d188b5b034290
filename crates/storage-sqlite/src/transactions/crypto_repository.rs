use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::OptionalExtension;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::crypto_transactions;
use crate::schema::crypto_transactions::dsl::*;
use crate::utils::format_datetime;

use super::model::CryptoTransactionDB;
use dealsync_core::transactions::{
    CryptoTransaction, CryptoTransactionRepositoryTrait, WithdrawalStatus,
};
use dealsync_core::Result;

/// Repository for the append-only crypto withdrawal ledger.
pub struct CryptoTransactionRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CryptoTransactionRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl CryptoTransactionRepositoryTrait for CryptoTransactionRepository {
    fn find_by_external_id(&self, ext_id: &str) -> Result<Option<CryptoTransaction>> {
        let mut conn = get_connection(&self.pool)?;

        let row = crypto_transactions
            .select(CryptoTransactionDB::as_select())
            .filter(external_id.eq(ext_id))
            .first::<CryptoTransactionDB>(&mut conn)
            .optional()
            .into_core()?;

        Ok(row.map(CryptoTransaction::from))
    }

    async fn insert(&self, tx: CryptoTransaction) -> Result<CryptoTransaction> {
        self.writer
            .exec(move |conn| {
                let tx_db: CryptoTransactionDB = tx.into();
                diesel::insert_into(crypto_transactions::table)
                    .values(&tx_db)
                    .execute(conn)
                    .into_core()?;
                Ok(tx_db.into())
            })
            .await
    }

    fn list_recent_completed(
        &self,
        acct_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CryptoTransaction>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = crypto_transactions
            .select(CryptoTransactionDB::as_select())
            .filter(account_id.eq(acct_id))
            .filter(status.eq(WithdrawalStatus::Completed.as_str()))
            .filter(applied_at.ge(format_datetime(since)))
            .order(applied_at.desc())
            .load::<CryptoTransactionDB>(&mut conn)
            .into_core()?;

        Ok(rows.into_iter().map(CryptoTransaction::from).collect())
    }
}
