//! Tally server binary.

use std::sync::Arc;

use anyhow::Context;
use tally_server::{AppState, MemoryRecords, Settings, metrics::init_metrics, run_server_with_state};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env().context("failed to load server settings")?;
    let addr = settings.server.addr()?;

    tracing::info!(
        "Starting Tally server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!(
        backend = ?settings.server.cache_backend,
        ttl_secs = settings.server.cache_ttl_secs,
        "Cache configured"
    );

    let prometheus = init_metrics().context("failed to install metrics recorder")?;

    // The connection is opened lazily by the first cache operation
    let cache = settings.build_cache();
    let state = AppState::new(cache.clone(), Arc::new(MemoryRecords::new()));
    tracing::info!(
        source = state.records().name(),
        backend = state.cache().backend(),
        "Application state ready"
    );

    run_server_with_state(addr, state, prometheus)
        .await
        .context("server error")?;

    cache.shutdown(settings.server.shutdown_grace()).await;
    tracing::info!("Shutdown complete");

    Ok(())
}
