//! Background scheduler for periodic reconciliation.

use std::sync::Arc;

use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::main_lib::AppState;
use dealsync_core::balances::BalanceServiceTrait;
use dealsync_core::deals::MatchingServiceTrait;

/// Delay before the first pass, so pollers get a cycle in first.
const INITIAL_DELAY_SECS: u64 = 60;

/// Starts the background reconciliation scheduler.
pub fn start_reconcile_scheduler(state: Arc<AppState>) {
    tokio::spawn(async move {
        info!(
            "Reconciliation scheduler started ({}s interval)",
            state.reconcile_interval.as_secs()
        );

        tokio::time::sleep(Duration::from_secs(INITIAL_DELAY_SECS)).await;

        let mut pass_interval = interval(state.reconcile_interval);
        loop {
            pass_interval.tick().await;
            run_reconcile_pass(&state).await;
        }
    });
}

/// Runs one reconciliation pass over all active accounts. A failure for
/// one account never blocks the others.
async fn run_reconcile_pass(state: &Arc<AppState>) {
    let Some(rate) = state.reference_rate else {
        debug!("Reconciliation pass skipped: no reference rate configured");
        return;
    };

    let accounts = match state.accounts.list_active() {
        Ok(accounts) => accounts,
        Err(e) => {
            warn!("Reconciliation pass aborted: {}", e);
            return;
        }
    };

    for account in accounts {
        if !account.has_bank_link() || !account.has_exchange_link() {
            continue;
        }

        // Keep the balance snapshot warm alongside the matching pass; a
        // failed refresh falls back to the last-known snapshot internally.
        match state.balances.get_balance(&account.id).await {
            Ok(snapshot) => debug!(
                "Balance for account {}: {} {}",
                account.id, snapshot.balance, snapshot.currency
            ),
            Err(e) => debug!("Balance unavailable for account {}: {}", account.id, e),
        }

        match state.matching.reconcile(&account.id, rate).await {
            Ok(deals) => {
                if !deals.is_empty() {
                    info!(
                        "Reconciled account {}: {} deal(s) in candidate window",
                        account.id,
                        deals.len()
                    );
                }
            }
            Err(e) => {
                warn!("Reconciliation failed for account {}: {}", account.id, e);
            }
        }
    }
}
