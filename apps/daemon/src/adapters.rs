//! Adapters from the upstream HTTP clients to the core traits.
//!
//! The core stays HTTP-free: it sees `BankFeedTrait`, `ExchangeFeedTrait`
//! and `BalanceGatewayTrait`, and these adapters translate wire rows into
//! domain payloads. Minor-unit conversion happens here, once, before any
//! amount reaches ingestion or the balance cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use dealsync_core::balances::{BalanceGatewayTrait, RemoteBalance};
use dealsync_core::errors::{Error, Result};
use dealsync_core::transactions::{
    normalize_minor_units, BankFeedTrait, ExchangeFeedTrait, NewBankTransaction,
    NewCryptoTransaction, TxDirection, WithdrawalStatus,
};
use dealsync_upstream::bank::BankApiClient;
use dealsync_upstream::exchange::ExchangeApiClient;
use dealsync_upstream::UpstreamError;

const BANK_SOURCE: &str = "mono";

fn upstream_err(e: UpstreamError) -> Error {
    Error::Upstream(e.to_string())
}

/// Bank statement feed over the aggregator client.
pub struct BankFeedAdapter {
    client: Arc<BankApiClient>,
}

impl BankFeedAdapter {
    pub fn new(client: Arc<BankApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BankFeedTrait for BankFeedAdapter {
    async fn fetch_transactions(
        &self,
        provider_account_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<NewBankTransaction>> {
        let rows = self
            .client
            .list_transactions(provider_account_id, since)
            .await
            .map_err(upstream_err)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let direction = if row.amount_minor >= 0 {
                    TxDirection::Credit
                } else {
                    TxDirection::Debit
                };
                NewBankTransaction {
                    source: BANK_SOURCE.to_string(),
                    external_id: row.external_id,
                    amount: normalize_minor_units(row.amount_minor.abs()),
                    narration: row.narration,
                    direction,
                    balance_after: row.balance_minor.map(normalize_minor_units),
                    category: row.category,
                    occurred_at: row.occurred_at,
                }
            })
            .collect())
    }
}

/// Balance sync and fetch over the aggregator client.
pub struct BankBalanceGateway {
    client: Arc<BankApiClient>,
}

impl BankBalanceGateway {
    pub fn new(client: Arc<BankApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BalanceGatewayTrait for BankBalanceGateway {
    async fn trigger_sync(&self, provider_account_id: &str) -> Result<()> {
        self.client
            .trigger_sync(provider_account_id)
            .await
            .map_err(upstream_err)
    }

    async fn fetch_balance(&self, provider_account_id: &str) -> Result<RemoteBalance> {
        let row = self
            .client
            .get_balance(provider_account_id)
            .await
            .map_err(upstream_err)?;
        Ok(RemoteBalance {
            provider_account_id: provider_account_id.to_string(),
            balance: normalize_minor_units(row.balance_minor),
            currency: row.currency,
        })
    }
}

/// Withdrawal feed over the exchange client.
pub struct ExchangeFeedAdapter {
    client: Arc<ExchangeApiClient>,
}

impl ExchangeFeedAdapter {
    pub fn new(client: Arc<ExchangeApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExchangeFeedTrait for ExchangeFeedAdapter {
    async fn fetch_withdrawals(
        &self,
        provider_account_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<NewCryptoTransaction>> {
        let rows = self
            .client
            .list_withdrawals(provider_account_id, start, end)
            .await
            .map_err(upstream_err)?;

        // Only completed withdrawals move on; pending ones will reappear in
        // a later window once they settle.
        Ok(rows
            .into_iter()
            .filter(|row| row.completed)
            .map(|row| NewCryptoTransaction {
                external_id: row.external_id,
                chain_tx_id: row.chain_tx_id,
                amount: row.amount,
                fee: row.fee,
                asset: row.asset,
                network_address: row.network_address,
                applied_at: row.applied_at,
                completed_at: row.completed_at,
                conversion_rate: None,
                status: WithdrawalStatus::Completed,
            })
            .collect())
    }
}
