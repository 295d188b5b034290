use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::accounts;
use crate::schema::accounts::dsl::*;
use crate::utils::format_datetime;

use super::model::AccountDB;
use dealsync_core::accounts::{Account, AccountRepositoryTrait};
use dealsync_core::Result;

/// Repository for account reads and the `last_synced_at` touch.
pub struct AccountRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl AccountRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    /// Inserts an account row. Account provisioning lives outside the
    /// pipeline; this exists for bootstrap tooling and tests.
    pub async fn create(&self, account: Account) -> Result<Account> {
        self.writer
            .exec(move |conn| {
                let account_db: AccountDB = account.into();
                diesel::insert_into(accounts::table)
                    .values(&account_db)
                    .execute(conn)
                    .into_core()?;
                Ok(account_db.into())
            })
            .await
    }
}

#[async_trait]
impl AccountRepositoryTrait for AccountRepository {
    fn get_by_id(&self, account_id: &str) -> Result<Account> {
        let mut conn = get_connection(&self.pool)?;

        let account = accounts
            .select(AccountDB::as_select())
            .find(account_id)
            .first::<AccountDB>(&mut conn)
            .into_core()?;

        Ok(account.into())
    }

    fn list_active(&self) -> Result<Vec<Account>> {
        let mut conn = get_connection(&self.pool)?;

        let results = accounts
            .select(AccountDB::as_select())
            .filter(is_active.eq(true))
            .order(name.asc())
            .load::<AccountDB>(&mut conn)
            .into_core()?;

        Ok(results.into_iter().map(Account::from).collect())
    }

    async fn touch_last_synced(&self, account_id: &str, at: DateTime<Utc>) -> Result<()> {
        let id_owned = account_id.to_string();
        self.writer
            .exec(move |conn| {
                diesel::update(accounts.find(&id_owned))
                    .set(last_synced_at.eq(Some(format_datetime(at))))
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }
}
