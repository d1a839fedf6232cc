//! HTTP routing over a fully wired gateway with a static provider.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use finintel_core::{ManualClock, MemoryAuditSink};
use finintel_provider::StaticSource;
use finintel_server::{AppConfig, Application};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn router(source: StaticSource) -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.store.path = dir.path().join("gateway.db");
    config.watchlist.tickers = vec!["COIN".into()];

    let app = Application::with_parts(
        config,
        Arc::new(source),
        Arc::new(ManualClock::new(1_700_000_000_000)),
        Arc::new(MemoryAuditSink::new()),
    )
    .unwrap();
    (app.router(), dir)
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_is_ok() {
    let (router, _dir) = router(StaticSource::new());
    let (status, body) = send(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn market_data_round_trip() {
    let (router, _dir) = router(StaticSource::new().with_listed("AAPL", "Apple Inc."));

    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/market-data",
        Some(json!({ "ticker": "AAPL", "session_id": "http" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], false);
    assert_eq!(body["entity_information"]["entity_name"], "Apple Inc.");

    let (status, stats) = send(&router, "GET", "/api/v1/cache/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_entries"], 1);
}

#[tokio::test]
async fn denied_and_invalid_map_to_client_errors() {
    let (router, _dir) = router(StaticSource::new());

    let (status, body) = send(&router, "POST", "/api/v1/suitability", Some(json!({ "ticker": "TSLA" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "COMPLIANCE_DENIED");

    let (status, body) = send(&router, "POST", "/api/v1/market-data", Some(json!({ "ticker": "12345678" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn watchlisted_ticker_suspends_then_resolves() {
    let (router, _dir) = router(StaticSource::new().with_listed("COIN", "Coinbase"));

    let (status, body) = send(&router, "POST", "/api/v1/market-data", Some(json!({ "ticker": "COIN" }))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let correlation_id = body["correlation_id"].as_str().unwrap().to_string();

    let (status, pending) = send(&router, "GET", "/api/v1/hitl/pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["pending"].as_array().unwrap().len(), 1);

    let uri = format!("/api/v1/hitl/{correlation_id}");
    let decision = json!({ "approved": true, "approver": "officer@bank.test" });
    let (status, body) = send(&router, "POST", &uri, Some(decision.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entity_information"]["entity_name"], "Coinbase");

    let (status, body) = send(&router, "POST", &uri, Some(decision)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "ALREADY_RESOLVED");
}

#[tokio::test]
async fn metrics_are_exposed() {
    let (router, _dir) = router(StaticSource::new());
    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
