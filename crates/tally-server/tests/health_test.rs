mod helpers;

use std::sync::Arc;

use axum::http::StatusCode;
use helpers::{app, app_with_store};
use tally_cache::{Cache, DisabledStore, MemoryStore};
use tally_server::HealthResponse;

#[tokio::test]
async fn health_check_returns_200_json() {
    let response = app().client.get("/health").await;

    response.assert_status(StatusCode::OK);
    assert!(
        response
            .header("content-type")
            .unwrap()
            .contains("application/json")
    );
}

#[tokio::test]
async fn health_check_reports_cache_block() {
    let health: serde_json::Value = app().client.get("/health").await.json();

    assert_eq!(health["status"], "UP");
    assert_eq!(health["cache"]["backend"], "memory");
    assert_eq!(health["cache"]["state"], "ready");
}

#[tokio::test]
async fn health_stays_up_when_cache_is_down() {
    let store = Arc::new(MemoryStore::new());
    store.set_available(false);

    let health: serde_json::Value = app_with_store(store).client.get("/health").await.json();

    assert_eq!(health["status"], "UP");
    assert_eq!(health["cache"]["state"], "failed");
}

#[test]
fn health_response_serializes_correctly() {
    let cache = Cache::new(Arc::new(DisabledStore::new("off")));
    let json = serde_json::to_string(&HealthResponse::from_cache(&cache)).unwrap();

    assert_eq!(
        json,
        r#"{"status":"UP","cache":{"backend":"disabled","state":"disconnected"}}"#
    );
}

#[tokio::test]
async fn metrics_endpoint_is_served() {
    let response = app().client.get("/metrics").await;

    response.assert_status(StatusCode::OK);
}
