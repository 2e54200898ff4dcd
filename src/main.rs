//! Market Pulse - Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and background
//! sweep/refresh tasks.

use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use market_pulse::api::{self, spawn_refresh_task, spawn_sweep_task};
use market_pulse::config::ServiceConfig;
use market_pulse::metrics::Metrics;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("market_pulse=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = ServiceConfig::load()?;
    let metrics = Metrics::init(
        config.cache.item_ttl_secs * 1000,
        config.cache.batch_ttl_secs * 1000,
    );

    let state = api::AppState::from_config(&config);
    if let Some(snapshot) = state.snapshot.load() {
        tracing::info!(
            articles = snapshot.articles.len(),
            saved_at_ms = snapshot.saved_at_ms,
            "loaded last-known snapshot"
        );
    }

    spawn_sweep_task(
        state.clone(),
        Duration::from_secs(config.cache.sweep_interval_secs),
    );
    spawn_refresh_task(
        state.clone(),
        Duration::from_secs(config.snapshot.refresh_interval_secs),
    );

    let router = api::create_router(state).merge(metrics.router());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!(%addr, "market-pulse listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
