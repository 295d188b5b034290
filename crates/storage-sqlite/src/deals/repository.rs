use async_trait::async_trait;
use diesel::prelude::*;
use diesel::OptionalExtension;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::inferred_deals;
use crate::schema::inferred_deals::dsl::*;

use super::model::InferredDealDB;
use dealsync_core::deals::{DealRepositoryTrait, InferredDeal};
use dealsync_core::Result;

/// Repository for the inferred-deal store.
///
/// The unique index on `(account_id, group_hash)` is what makes concurrent
/// reconcile runs converge on one row per grouping; inserts surface its
/// violation as `DatabaseError::UniqueViolation`.
pub struct DealRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl DealRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl DealRepositoryTrait for DealRepository {
    fn find_by_group_hash(&self, acct_id: &str, hash: &str) -> Result<Option<InferredDeal>> {
        let mut conn = get_connection(&self.pool)?;

        let row = inferred_deals
            .select(InferredDealDB::as_select())
            .filter(account_id.eq(acct_id))
            .filter(group_hash.eq(hash))
            .first::<InferredDealDB>(&mut conn)
            .optional()
            .into_core()?;

        Ok(row.map(InferredDeal::from))
    }

    async fn insert(&self, deal: InferredDeal) -> Result<InferredDeal> {
        self.writer
            .exec(move |conn| {
                let deal_db: InferredDealDB = deal.into();
                diesel::insert_into(inferred_deals::table)
                    .values(&deal_db)
                    .execute(conn)
                    .into_core()?;
                Ok(deal_db.into())
            })
            .await
    }

    fn list_for_account(&self, acct_id: &str) -> Result<Vec<InferredDeal>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = inferred_deals
            .select(InferredDealDB::as_select())
            .filter(account_id.eq(acct_id))
            .order(created_at.desc())
            .load::<InferredDealDB>(&mut conn)
            .into_core()?;

        Ok(rows.into_iter().map(InferredDeal::from).collect())
    }
}
