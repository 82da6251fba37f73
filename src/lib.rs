//! Parking Stream Server Library
//!
//! Real-time plate and lot-capacity analysis over WebSocket streams.
//!
//! ## Architecture
//!
//! 1. FrameSkipper - Frame admission (fixed or latency-adaptive)
//! 2. PlateDedup - Time-windowed plate deduplication
//! 3. OccupancyTracker - Occupied-slot change detection
//! 4. AIClient - Inference service adapter
//! 5. StreamSession - Per-connection processing engine
//! 6. RealtimeHub - Connection registry and signaling relay
//! 7. StreamProtocol - Inbound message dispatch
//! 8. WebAPI - HTTP and WebSocket endpoints

pub mod ai_client;
pub mod error;
pub mod frame_skipper;
pub mod models;
pub mod occupancy_tracker;
pub mod plate_dedup;
pub mod realtime_hub;
pub mod state;
pub mod stream_protocol;
pub mod stream_session;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
