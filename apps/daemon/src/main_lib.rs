//! State construction and tracing setup for the daemon.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::adapters::{BankBalanceGateway, BankFeedAdapter, ExchangeFeedAdapter};
use crate::config::Config;
use dealsync_core::accounts::AccountRepositoryTrait;
use dealsync_core::balances::{BalanceConfig, BalanceService};
use dealsync_core::deals::{MatchConfig, MatchingService};
use dealsync_core::pollers::{
    BankPollTask, ExchangePollTask, PollTask, PollerConfig, PollerRegistry, StartOutcome,
};
use dealsync_core::transactions::IngestService;
use dealsync_storage_sqlite::accounts::AccountRepository;
use dealsync_storage_sqlite::balances::BalanceRepository;
use dealsync_storage_sqlite::deals::DealRepository;
use dealsync_storage_sqlite::transactions::{
    BankTransactionRepository, CryptoTransactionRepository,
};
use dealsync_storage_sqlite::{db, spawn_writer};
use dealsync_upstream::bank::BankApiClient;
use dealsync_upstream::exchange::ExchangeApiClient;
use dealsync_upstream::{GateConfig, RequestGate};

pub struct AppState {
    pub accounts: Arc<dyn AccountRepositoryTrait>,
    pub registry: Arc<PollerRegistry>,
    pub bank_task: Arc<dyn PollTask>,
    pub exchange_task: Arc<dyn PollTask>,
    pub matching: Arc<MatchingService>,
    pub balances: Arc<BalanceService>,
    pub reference_rate: Option<Decimal>,
    pub reconcile_interval: Duration,
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let pool = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", config.db_path);
    let writer = spawn_writer(pool.clone())?;

    let accounts: Arc<dyn AccountRepositoryTrait> =
        Arc::new(AccountRepository::new(pool.clone(), writer.clone()));
    let bank_repository = Arc::new(BankTransactionRepository::new(pool.clone(), writer.clone()));
    let crypto_repository = Arc::new(CryptoTransactionRepository::new(
        pool.clone(),
        writer.clone(),
    ));
    let balance_repository = Arc::new(BalanceRepository::new(pool.clone(), writer.clone()));
    let deal_repository = Arc::new(DealRepository::new(pool.clone(), writer.clone()));

    // One throttle gate per upstream, shared by every account's poller.
    let bank_client = Arc::new(BankApiClient::new(
        config.bank_api_url.clone(),
        config.bank_api_token.clone(),
        Arc::new(RequestGate::new(GateConfig::default())),
    ));
    let exchange_client = Arc::new(ExchangeApiClient::new(
        config.exchange_api_url.clone(),
        config.exchange_api_key.clone(),
        Arc::new(RequestGate::new(GateConfig::default())),
    ));

    let bank_feed = Arc::new(BankFeedAdapter::new(bank_client.clone()));
    let exchange_feed = Arc::new(ExchangeFeedAdapter::new(exchange_client));
    let balance_gateway = Arc::new(BankBalanceGateway::new(bank_client));

    let ingest = Arc::new(IngestService::new(
        bank_repository.clone(),
        crypto_repository.clone(),
    ));
    let balances = Arc::new(BalanceService::new(
        accounts.clone(),
        balance_repository,
        balance_gateway,
        BalanceConfig::default(),
    ));
    let matching = Arc::new(MatchingService::new(
        bank_repository.clone(),
        crypto_repository,
        deal_repository,
        MatchConfig::default(),
    ));

    let registry = Arc::new(PollerRegistry::new(PollerConfig {
        interval: config.poll_interval,
    }));
    let bank_task: Arc<dyn PollTask> = Arc::new(BankPollTask::new(
        accounts.clone(),
        bank_repository,
        bank_feed,
        ingest.clone(),
    ));
    let exchange_task: Arc<dyn PollTask> =
        Arc::new(ExchangePollTask::new(accounts.clone(), exchange_feed, ingest));

    Ok(Arc::new(AppState {
        accounts,
        registry,
        bank_task,
        exchange_task,
        matching,
        balances,
        reference_rate: config.reference_rate,
        reconcile_interval: config.reconcile_interval,
    }))
}

/// Starts a poller per linked upstream for every active account. Returns
/// the number of pollers started.
pub async fn start_pollers(state: &Arc<AppState>) -> anyhow::Result<usize> {
    let mut started = 0;
    for account in state.accounts.list_active()? {
        if account.has_bank_link()
            && state
                .registry
                .start(account.clone(), state.bank_task.clone())
                .await
                == StartOutcome::Started
        {
            started += 1;
        }
        if account.has_exchange_link()
            && state
                .registry
                .start(account.clone(), state.exchange_task.clone())
                .await
                == StartOutcome::Started
        {
            started += 1;
        }
    }
    Ok(started)
}
