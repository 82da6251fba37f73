//! Shared response models

use serde::{Deserialize, Serialize};

/// Root endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_sec: u64,
    pub inference_connected: bool,
    /// Open gate/lot stream sockets
    pub active_streams: u64,
    /// Open signaling sockets
    pub signaling_peers: u64,
}
