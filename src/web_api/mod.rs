//! WebAPI - HTTP and WebSocket Endpoints
//!
//! ## Responsibilities
//!
//! - Liveness and health endpoints
//! - WebSocket upgrade for gate, lot and signaling sockets
//! - Per-connection receive loops

mod routes;
mod socket;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::{HealthResponse, RootResponse};
use crate::state::AppState;

/// Root endpoint
pub async fn root() -> impl IntoResponse {
    Json(RootResponse {
        message: "Smart Parking API is running".to_string(),
    })
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let inference_ok = state.inference.health_check().await.unwrap_or(false);

    let response = HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.uptime_sec(),
        inference_connected: inference_ok,
        active_streams: state.stream_hub.connection_count(),
        signaling_peers: state.signaling_hub.connection_count(),
    };

    Json(response)
}
