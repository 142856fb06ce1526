//! The read-only health/status HTTP surface (§4.7), built on `axum`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;

use rrdns_core::status::SharedStatus;

/// Build the router for the three health endpoints, sharing the engine's status handle.
pub fn router(status: SharedStatus) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .route("/health/live", get(live))
        .with_state(status)
}

async fn health(State(status): State<SharedStatus>) -> impl IntoResponse {
    let status = status.read().await;
    let code = if status.ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status.clone()))
}

async fn ready(State(status): State<SharedStatus>) -> impl IntoResponse {
    let ready = status.read().await.ready();
    if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn live() -> impl IntoResponse {
    if rrdns_core::status::Status::live() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
