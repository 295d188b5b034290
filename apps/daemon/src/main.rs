mod adapters;
mod config;
mod main_lib;
mod scheduler;

use config::Config;
use main_lib::{build_state, init_tracing, start_pollers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    init_tracing();

    let state = build_state(&config).await?;
    let started = start_pollers(&state).await?;
    tracing::info!("Started {} poller(s)", started);

    scheduler::start_reconcile_scheduler(state.clone());

    shutdown_signal().await;
    tracing::info!("Shutdown requested; draining pollers");
    state.registry.stop_all().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
