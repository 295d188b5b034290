//! Exchange API client.
//!
//! Only the withdrawal history endpoint is used. Withdrawal amounts arrive
//! as decimal strings and are parsed exactly; a row that fails to parse
//! fails the whole fetch rather than being silently dropped.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::{Result, UpstreamError};
use crate::throttle::RequestGate;

const PROVIDER_ID: &str = "exchange";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Withdrawal status code on the wire; 6 is completed.
const STATUS_COMPLETED: i32 = 6;

/// One withdrawal as reported by the exchange.
#[derive(Debug, Clone)]
pub struct WithdrawalRow {
    /// Exchange-internal withdrawal id.
    pub external_id: String,
    /// On-chain transaction id, once known.
    pub chain_tx_id: Option<String>,
    pub amount: Decimal,
    pub fee: Decimal,
    pub asset: String,
    pub network_address: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WithdrawalWire {
    id: String,
    #[serde(default)]
    tx_id: Option<String>,
    amount: String,
    #[serde(default)]
    transaction_fee: Option<String>,
    coin: String,
    #[serde(default)]
    address: Option<String>,
    /// Unix milliseconds.
    apply_time: i64,
    #[serde(default)]
    complete_time: Option<i64>,
    status: i32,
}

/// Client for the exchange withdrawal API.
pub struct ExchangeApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    gate: Arc<RequestGate>,
}

impl ExchangeApiClient {
    pub fn new(base_url: String, api_key: String, gate: Arc<RequestGate>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            gate,
        }
    }

    /// Fetches withdrawals for an account within a time window, with
    /// bounded linear retry on transient failures.
    pub async fn list_withdrawals(
        &self,
        account_ref: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WithdrawalRow>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.list_withdrawals_once(account_ref, start, end).await {
                Ok(rows) => return Ok(rows),
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        "Exchange withdrawal fetch for {} failed (attempt {}/{}): {}",
                        account_ref, attempt, MAX_ATTEMPTS, e
                    );
                    tokio::time::sleep(RETRY_DELAY * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn list_withdrawals_once(
        &self,
        account_ref: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WithdrawalRow>> {
        let url = format!("{}/withdrawals", self.base_url);
        let request = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .query(&[
                ("account", account_ref.to_string()),
                ("startTime", start.timestamp_millis().to_string()),
                ("endTime", end.timestamp_millis().to_string()),
            ]);

        debug!("Exchange request: /withdrawals for {}", account_ref);
        let response = self
            .gate
            .run(request.send())
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(UpstreamError::Unauthorized {
                provider: PROVIDER_ID.to_string(),
            });
        }
        if status.is_server_error() {
            return Err(UpstreamError::ServerError {
                provider: PROVIDER_ID.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Api {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {} - {}", status, body),
            });
        }

        let wires: Vec<WithdrawalWire> =
            response.json().await.map_err(|e| UpstreamError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })?;
        wires.into_iter().map(withdrawal_row).collect()
    }
}

fn transport_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout {
            provider: PROVIDER_ID.to_string(),
        }
    } else {
        UpstreamError::Transport {
            provider: PROVIDER_ID.to_string(),
            message: e.to_string(),
        }
    }
}

fn withdrawal_row(wire: WithdrawalWire) -> Result<WithdrawalRow> {
    let amount = parse_decimal(&wire.id, "amount", &wire.amount)?;
    let fee = match &wire.transaction_fee {
        Some(raw) => parse_decimal(&wire.id, "transactionFee", raw)?,
        None => Decimal::ZERO,
    };
    let applied_at = millis_to_utc(&wire.id, wire.apply_time)?;
    let completed_at = match wire.complete_time {
        Some(ms) => Some(millis_to_utc(&wire.id, ms)?),
        None => None,
    };

    Ok(WithdrawalRow {
        external_id: wire.id,
        chain_tx_id: wire.tx_id,
        amount,
        fee,
        asset: wire.coin,
        network_address: wire.address,
        applied_at,
        completed_at,
        completed: wire.status == STATUS_COMPLETED,
    })
}

fn parse_decimal(id: &str, field: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| UpstreamError::Malformed {
        provider: PROVIDER_ID.to_string(),
        message: format!("withdrawal {} has invalid {}: {} ({})", id, field, raw, e),
    })
}

fn millis_to_utc(id: &str, ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| UpstreamError::Malformed {
            provider: PROVIDER_ID.to_string(),
            message: format!("withdrawal {} has invalid timestamp {}", id, ms),
        })
}
