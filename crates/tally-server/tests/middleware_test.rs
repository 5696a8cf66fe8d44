//! Tests de middleware.

mod helpers;

use helpers::app;
use serde_json::json;
use uuid::Uuid;

// === Request ID ===

#[tokio::test]
async fn response_includes_request_id() {
    app()
        .client
        .get("/health")
        .await
        .assert_header_exists("x-request-id");
}

#[tokio::test]
async fn request_id_is_uuid_v7() {
    let response = app().client.get("/health").await;

    let id = response.header("x-request-id").unwrap();
    let parsed = Uuid::parse_str(id).unwrap();

    assert_eq!(parsed.get_version_num(), 7);
}

#[tokio::test]
async fn propagates_incoming_request_id() {
    let custom_id = "my-custom-request-id-12345";

    let response = app()
        .client
        .get_with_headers("/health", vec![("x-request-id", custom_id)])
        .await;

    response.assert_header("x-request-id", custom_id);
}

#[tokio::test]
async fn generates_different_ids_for_each_request() {
    let app = app();
    let first = app.client.get("/health").await;
    let second = app.client.get("/health").await;

    assert_ne!(
        first.header("x-request-id").unwrap(),
        second.header("x-request-id").unwrap()
    );
}

#[tokio::test]
async fn request_id_present_on_errors_and_writes() {
    let app = app();

    app.client
        .get("/companies/acme/invoices/missing")
        .await
        .assert_header_exists("x-request-id");
    app.client
        .put_json("/companies/acme/invoices/1", json!({"v": 1}))
        .await
        .assert_header_exists("x-request-id");
}
