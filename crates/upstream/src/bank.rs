//! Bank aggregator API client.
//!
//! Covers the three calls the pipeline needs: the account statement, the
//! sync trigger, and the balance read. Amounts on this wire are integers in
//! minor currency units; conversion to major units is the caller's job.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::{Result, UpstreamError};
use crate::throttle::RequestGate;

const PROVIDER_ID: &str = "bank";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// One statement row as reported by the aggregator.
#[derive(Debug, Clone)]
pub struct StatementRow {
    pub external_id: String,
    /// Signed amount in minor units; positive is a credit.
    pub amount_minor: i64,
    /// Account balance after the transaction, in minor units.
    pub balance_minor: Option<i64>,
    pub narration: Option<String>,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Current account balance as reported by the aggregator.
#[derive(Debug, Clone)]
pub struct BalanceRow {
    /// Balance in minor units.
    pub balance_minor: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct StatementItemWire {
    id: String,
    /// Unix seconds.
    time: i64,
    #[serde(default)]
    description: Option<String>,
    amount: i64,
    #[serde(default)]
    balance: Option<i64>,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BalanceWire {
    balance: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct ErrorWire {
    #[serde(default, rename = "errorDescription")]
    error_description: Option<String>,
}

/// Client for the bank aggregation API.
pub struct BankApiClient {
    client: Client,
    base_url: String,
    token: String,
    gate: Arc<RequestGate>,
}

impl BankApiClient {
    pub fn new(base_url: String, token: String, gate: Arc<RequestGate>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            gate,
        }
    }

    /// Fetches statement rows for an account, newest first. When `since`
    /// is set only rows after it are requested; the upstream cursor is
    /// coarse, so callers must still deduplicate.
    pub async fn list_transactions(
        &self,
        account_ref: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StatementRow>> {
        let path = format!("/accounts/{account_ref}/statement");
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(since) = since {
            query.push(("from", since.timestamp().to_string()));
        }

        let items: Vec<StatementItemWire> = self.get_json(&path, &query).await?;
        items.into_iter().map(statement_row).collect()
    }

    /// Asks the aggregator to refresh its copy of the account. The refresh
    /// is asynchronous upstream; a success here only means it was accepted.
    pub async fn trigger_sync(&self, account_ref: &str) -> Result<()> {
        let path = format!("/accounts/{account_ref}/sync");
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.post(&url).bearer_auth(&self.token);

        let response = self
            .gate
            .run(request.send())
            .await
            .map_err(transport_error)?;
        check_status(response).await.map(|_| ())
    }

    /// Reads the current account balance from the aggregator.
    pub async fn get_balance(&self, account_ref: &str) -> Result<BalanceRow> {
        let path = format!("/accounts/{account_ref}/balance");
        let wire: BalanceWire = self.get_json(&path, &[]).await?;
        Ok(BalanceRow {
            balance_minor: wire.balance,
            currency: wire.currency,
        })
    }

    /// GET with bounded linear retry on transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.get_json_once(path, query).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        "Bank request {} failed (attempt {}/{}): {}",
                        path, attempt, MAX_ATTEMPTS, e
                    );
                    tokio::time::sleep(RETRY_DELAY * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_json_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url).bearer_auth(&self.token);
        for (key, value) in query {
            request = request.query(&[(key, value)]);
        }

        debug!("Bank request: {}", path);
        let response = self
            .gate
            .run(request.send())
            .await
            .map_err(transport_error)?;
        let body = check_status(response).await?;

        serde_json::from_str(&body).map_err(|e| UpstreamError::Malformed {
            provider: PROVIDER_ID.to_string(),
            message: e.to_string(),
        })
    }
}

fn statement_row(wire: StatementItemWire) -> Result<StatementRow> {
    let occurred_at = Utc
        .timestamp_opt(wire.time, 0)
        .single()
        .ok_or_else(|| UpstreamError::Malformed {
            provider: PROVIDER_ID.to_string(),
            message: format!("statement item {} has invalid time {}", wire.id, wire.time),
        })?;
    Ok(StatementRow {
        external_id: wire.id,
        amount_minor: wire.amount,
        balance_minor: wire.balance,
        narration: wire.description,
        category: wire.category,
        occurred_at,
    })
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

async fn check_status(response: reqwest::Response) -> Result<String> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(UpstreamError::RateLimited {
            provider: PROVIDER_ID.to_string(),
        });
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
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
        if let Ok(wire) = serde_json::from_str::<ErrorWire>(&body) {
            if let Some(message) = wire.error_description {
                return Err(UpstreamError::Api {
                    provider: PROVIDER_ID.to_string(),
                    message,
                });
            }
        }
        return Err(UpstreamError::Api {
            provider: PROVIDER_ID.to_string(),
            message: format!("HTTP {} - {}", status, body),
        });
    }

    response.text().await.map_err(|e| UpstreamError::Malformed {
        provider: PROVIDER_ID.to_string(),
        message: format!("failed to read response: {}", e),
    })
}
