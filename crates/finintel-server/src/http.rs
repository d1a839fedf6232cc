//! HTTP surface over the gateway operations using axum.
//!
//! Handlers are thin: each forwards to [`GatewayService`] and maps the
//! response's `error_code` onto an HTTP status. The JSON body is the
//! gateway response unchanged.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use finintel_compliance::HitlDecision;
use finintel_pipeline::{GatewayResponse, GatewayService, CODE_HITL_PENDING};
use finintel_telemetry::Metrics;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<GatewayService>,
    metrics_enabled: bool,
}

impl AppState {
    pub fn new(service: Arc<GatewayService>, metrics_enabled: bool) -> Self {
        Self {
            service,
            metrics_enabled,
        }
    }
}

/// Body of the ticker endpoints.
#[derive(Debug, Deserialize)]
pub struct TickerRequest {
    pub ticker: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/v1/suitability", post(check_suitability))
        .route("/api/v1/market-data", post(get_market_data))
        .route("/api/v1/hitl/pending", get(pending_approvals))
        .route("/api/v1/hitl/{correlation_id}", post(submit_hitl_decision))
        .route("/api/v1/cache/stats", get(cache_stats))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    if !state.metrics_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }
    match Metrics::render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Metrics render failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn check_suitability(State(state): State<AppState>, Json(req): Json<TickerRequest>) -> Response {
    let response = state
        .service
        .check_suitability(&req.ticker, req.session_id.as_deref())
        .await;
    into_http(response)
}

async fn get_market_data(State(state): State<AppState>, Json(req): Json<TickerRequest>) -> Response {
    let response = state
        .service
        .get_market_data(&req.ticker, req.session_id.as_deref())
        .await;
    into_http(response)
}

async fn pending_approvals(State(state): State<AppState>) -> Response {
    into_http(state.service.pending_approvals())
}

async fn submit_hitl_decision(
    State(state): State<AppState>,
    Path(correlation_id): Path<String>,
    Json(decision): Json<HitlDecision>,
) -> Response {
    debug!(correlation_id = %correlation_id, approved = decision.approved, "HITL decision received");
    into_http(state.service.submit_hitl_decision(&correlation_id, decision).await)
}

async fn cache_stats(State(state): State<AppState>) -> Response {
    into_http(state.service.cache_stats())
}

/// HTTP status for a gateway `error_code`.
pub fn status_for(code: Option<&str>) -> StatusCode {
    match code {
        None => StatusCode::OK,
        Some(CODE_HITL_PENDING) => StatusCode::ACCEPTED,
        Some("VALIDATION_ERROR" | "INJECTION_DETECTED") => StatusCode::BAD_REQUEST,
        Some("COMPLIANCE_DENIED" | "HITL_DENIED") => StatusCode::FORBIDDEN,
        Some("NOT_FOUND" | "INVALID_TICKER") => StatusCode::NOT_FOUND,
        Some("ALREADY_RESOLVED" | "DECISION_IN_PROGRESS") => StatusCode::CONFLICT,
        Some("RATE_LIMIT_EXCEEDED") => StatusCode::TOO_MANY_REQUESTS,
        Some("INSUFFICIENT_DATA") => StatusCode::UNPROCESSABLE_ENTITY,
        Some("API_THROTTLE" | "NETWORK_ERROR" | "UNKNOWN_ERROR") => StatusCode::BAD_GATEWAY,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn into_http(response: GatewayResponse) -> Response {
    let status = status_for(response.error_code());
    let body = response.to_json();
    let retry_after = body["retry_after_seconds"].as_u64();

    let mut http = (status, Json(body)).into_response();
    if let Some(secs) = retry_after {
        if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
            http.headers_mut().insert(header::RETRY_AFTER, value);
        }
    }
    http
}
