//! HTTP gateway (Axum) for bill validation.
//!
//! This module is primarily used by the `cashguard` server binary.

pub mod error;
pub mod handler;
pub mod payload;
pub mod state;


use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::validate_handler;
pub use payload::{ValidateRequest, ValidateResponse};
pub use state::HandlerState;

use crate::constants::{
    CASHGUARD_STATUS_HEADER, CASHGUARD_STATUS_HEALTHY, CASHGUARD_STATUS_NOT_READY,
    CASHGUARD_STATUS_READY, MAX_REQUEST_BODY_BYTES, SERVICE_NAME,
};

pub fn create_router_with_state(state: HandlerState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/api/validate", post(validate_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: String,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    pub primary: &'static str,
    pub secondary: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        CASHGUARD_STATUS_HEADER,
        HeaderValue::from_static(CASHGUARD_STATUS_HEALTHY),
    );

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse {
            status: CASHGUARD_STATUS_HEALTHY,
            service: SERVICE_NAME,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
        .into_response()
}

/// 503 until the primary predictor has a credential. A disabled classifier is a supported
/// degraded mode and does not affect readiness.
#[tracing::instrument(skip(state))]
pub async fn ready_handler(State(state): State<HandlerState>) -> Response {
    let is_ready = state.reconciler.primary().is_configured();

    let components = ComponentStatus {
        http: CASHGUARD_STATUS_READY,
        primary: if is_ready {
            "configured"
        } else {
            "missing_credential"
        },
        secondary: if state.reconciler.secondary().is_enabled() {
            "enabled"
        } else {
            "disabled"
        },
    };

    let (status_code, status_msg) = if is_ready {
        (StatusCode::OK, CASHGUARD_STATUS_READY)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, CASHGUARD_STATUS_NOT_READY)
    };

    let mut headers = HeaderMap::new();
    headers.insert(CASHGUARD_STATUS_HEADER, HeaderValue::from_static(status_msg));

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg,
            components,
        }),
    )
        .into_response()
}
