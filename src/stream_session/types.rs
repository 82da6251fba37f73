//! StreamSession types

use chrono::Utc;
use serde::Serialize;

/// Current time as fractional unix seconds
pub fn unix_timestamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Result envelope for a successfully processed frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameEnvelope<P> {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub timestamp: f64,
    pub frame_number: u64,
    pub processed_frame_number: u64,
    #[serde(flatten)]
    pub payload: P,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_skip_rate: Option<u32>,
}

/// Envelope for an admitted frame whose detection failed
#[derive(Debug, Clone, Serialize)]
pub struct FailureEnvelope {
    pub success: bool,
    pub error: String,
    pub frame_number: u64,
    pub timestamp: f64,
}

impl FailureEnvelope {
    pub fn new(error: impl Into<String>, frame_number: u64) -> Self {
        Self {
            success: false,
            error: error.into(),
            frame_number,
            timestamp: unix_timestamp(),
        }
    }
}

/// Outcome of an admitted frame
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FrameOutcome<P> {
    Processed(FrameEnvelope<P>),
    Failed(FailureEnvelope),
}

impl<P> FrameOutcome<P> {
    pub fn is_success(&self) -> bool {
        matches!(self, FrameOutcome::Processed(_))
    }

    pub fn frame_number(&self) -> u64 {
        match self {
            FrameOutcome::Processed(env) => env.frame_number,
            FrameOutcome::Failed(env) => env.frame_number,
        }
    }

    pub fn processed(&self) -> Option<&FrameEnvelope<P>> {
        match self {
            FrameOutcome::Processed(env) => Some(env),
            FrameOutcome::Failed(_) => None,
        }
    }
}

/// Mode-specific figure reported by stats
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeGauge {
    /// Plates currently held by the dedup cache
    TrackedPlates(usize),
    /// Last reported occupied count
    CurrentOccupancy(Option<u32>),
}

/// Session statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub total_frames: u64,
    pub processed_frames: u64,
    /// "1/N" with N the current skip interval
    pub skip_rate: String,
    #[serde(flatten)]
    pub gauge: ModeGauge,
}

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Connected, no frame seen yet
    Idle,
    /// Receiving frames
    Active,
    /// Connection gone; frames are ignored
    Closed,
}
