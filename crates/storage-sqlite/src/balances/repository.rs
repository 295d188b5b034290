use async_trait::async_trait;
use diesel::prelude::*;
use diesel::OptionalExtension;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::balance_snapshots;
use crate::schema::balance_snapshots::dsl::*;

use super::model::BalanceSnapshotDB;
use dealsync_core::balances::{BalanceRepositoryTrait, BalanceSnapshot};
use dealsync_core::Result;

/// Repository for balance snapshots, one row per
/// `(account, provider account)` pair.
pub struct BalanceRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl BalanceRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl BalanceRepositoryTrait for BalanceRepository {
    fn latest(&self, acct_id: &str) -> Result<Option<BalanceSnapshot>> {
        let mut conn = get_connection(&self.pool)?;

        // Newest snapshot across the account's provider accounts; the
        // fixed-width timestamp format sorts chronologically.
        let row = balance_snapshots
            .filter(account_id.eq(acct_id))
            .select(BalanceSnapshotDB::as_select())
            .order(fetched_at.desc())
            .first::<BalanceSnapshotDB>(&mut conn)
            .optional()
            .into_core()?;

        Ok(row.map(BalanceSnapshot::from))
    }

    async fn upsert(&self, snapshot: BalanceSnapshot) -> Result<BalanceSnapshot> {
        self.writer
            .exec(move |conn| {
                let snapshot_db: BalanceSnapshotDB = snapshot.into();

                // An older fetch must never overwrite a newer snapshot for
                // the same pair; concurrent refreshes and webhook pushes
                // race here.
                let existing = balance_snapshots
                    .select(BalanceSnapshotDB::as_select())
                    .find((&snapshot_db.account_id, &snapshot_db.provider_account_id))
                    .first::<BalanceSnapshotDB>(conn)
                    .optional()
                    .into_core()?;

                if let Some(current) = existing {
                    if current.fetched_at >= snapshot_db.fetched_at {
                        return Ok(current.into());
                    }
                }

                diesel::insert_into(balance_snapshots::table)
                    .values(&snapshot_db)
                    .on_conflict((account_id, provider_account_id))
                    .do_update()
                    .set(&snapshot_db)
                    .execute(conn)
                    .into_core()?;

                Ok(snapshot_db.into())
            })
            .await
    }
}
