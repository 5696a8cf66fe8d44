//! Application fixtures over in-memory backends.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tally_cache::{Cache, MemoryStore};
use tally_server::{AppState, MemoryRecords, create_router_with_state};

use super::client::TestClient;

/// A router plus handles on its backends.
pub struct TestApp {
    pub client: TestClient,
    pub cache: Cache,
    pub store: Arc<MemoryStore>,
    pub records: Arc<MemoryRecords>,
}

/// Builds an app over a fresh memory store and record source.
pub fn app() -> TestApp {
    app_with_store(Arc::new(MemoryStore::new()))
}

pub fn app_with_store(store: Arc<MemoryStore>) -> TestApp {
    let cache = Cache::new(store.clone());
    let records = Arc::new(MemoryRecords::new());
    let state = AppState::new(cache.clone(), records.clone());

    // Recorder local: no se instala globalmente
    let prometheus = PrometheusBuilder::new().build_recorder().handle();

    TestApp {
        client: TestClient::new(create_router_with_state(state, prometheus)),
        cache,
        store,
        records,
    }
}
