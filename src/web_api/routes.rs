//! API Routes

use axum::{routing::get, Router};

use super::socket;
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/", get(super::root))
        .route("/api/health", get(super::health_check))
        // Stream sessions
        .route("/ws/gate", get(socket::gate_handler))
        .route("/ws/lot", get(socket::lot_handler))
        // Signaling relay
        .route("/ws", get(socket::signaling_handler))
        .with_state(state)
}
