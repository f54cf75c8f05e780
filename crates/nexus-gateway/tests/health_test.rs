mod helpers;

use axum::http::StatusCode;
use helpers::{client, gateway};
use nexus_gateway::handlers::health::HealthResponse;

#[tokio::test]
async fn health_check_returns_200() {
    client().get("/health").await.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn health_check_returns_json() {
    let response = client().get("/health").await;

    let content_type = response.header("content-type").unwrap();
    assert!(content_type.contains("application/json"));
}

#[tokio::test]
async fn health_check_body_contains_status_up() {
    let health: serde_json::Value = client().get("/health").await.json();
    assert_eq!(health["status"], "UP");
}

#[tokio::test]
async fn health_without_consumer_omits_broker_state() {
    let gw = gateway().await;

    let health: serde_json::Value = gw.client.get("/health").await.json();

    assert_eq!(health["status"], "UP");
    assert!(health.get("broker").is_none());
}

#[tokio::test]
async fn metrics_endpoint_renders_text() {
    let gw = gateway().await;

    let response = gw.client.get("/metrics").await;

    response.assert_status(StatusCode::OK);
    assert!(response.header("content-type").unwrap().starts_with("text/plain"));
}

#[test]
fn health_response_serializes_correctly() {
    let json = serde_json::to_string(&HealthResponse::default()).unwrap();
    assert_eq!(json, r#"{"status":"UP"}"#);
}
