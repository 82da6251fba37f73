//! StreamSession - Per-connection Frame Processing
//!
//! ## Responsibilities
//!
//! - Admit frames through the session's `FrameAdmission` strategy
//! - Run detection on admitted frames and time it
//! - Mode post-processing (plate dedup / occupancy change)
//! - Periodic cache eviction, inline with frame processing
//! - Build the response envelope
//!
//! ## Design
//!
//! - One session per connection; frames are processed strictly in order
//! - The detection backend is shared; everything else is owned by the session
//! - Plate and capacity streams share this engine and differ only in `StreamMode`

mod capacity;
mod plate;
mod types;

pub use capacity::{CapacityMode, CapacityPayload, SlotStatus};
pub use plate::{PlateMode, PlatePayload, PlateRecord};
pub use types::*;

use crate::error::Result;
use crate::frame_skipper::FrameAdmission;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

/// Raw frames between two cache evictions
pub const EVICTION_INTERVAL_FRAMES: u64 = 50;

/// Mode-specific half of a stream session
#[async_trait]
pub trait StreamMode: Send + Sync {
    /// Raw detection result
    type Detection: Send;
    /// Mode fields merged into the result envelope
    type Payload: Serialize + Send;

    /// Envelope type tag
    fn kind(&self) -> &'static str;

    /// Run the shared detection backend on one frame
    async fn detect(&self, frame: Vec<u8>) -> Result<Self::Detection>;

    /// Turn a detection into the envelope payload, updating mode state
    fn post_process(&mut self, detection: Self::Detection, now: DateTime<Utc>) -> Self::Payload;

    /// Periodic eviction of stale mode state
    fn evict_stale(&mut self, _now: DateTime<Utc>) {}

    /// Best-effort release of spare memory
    fn reclaim(&mut self) {}

    /// Clear mode state
    fn reset(&mut self);

    /// Figure reported by stats
    fn gauge(&self) -> ModeGauge;
}

/// Stream session
pub struct StreamSession<M: StreamMode> {
    mode: M,
    skipper: Box<dyn FrameAdmission>,
    frame_count: u64,
    processed_count: u64,
    phase: SessionPhase,
}

impl<M: StreamMode> StreamSession<M> {
    /// Create new session
    pub fn new(mode: M, skipper: Box<dyn FrameAdmission>) -> Self {
        Self {
            mode,
            skipper,
            frame_count: 0,
            processed_count: 0,
            phase: SessionPhase::Idle,
        }
    }

    /// Process one incoming frame.
    ///
    /// Returns `None` when the frame was not admitted (or the session is closed).
    pub async fn process_frame(&mut self, frame: Vec<u8>) -> Option<FrameOutcome<M::Payload>> {
        if self.phase == SessionPhase::Closed {
            return None;
        }
        self.phase = SessionPhase::Active;

        let admitted = self.skipper.should_admit();
        self.frame_count = self.skipper.frames_seen();
        if !admitted {
            return None;
        }

        let started = Instant::now();
        let result = self.mode.detect(frame).await;
        let elapsed = started.elapsed();
        self.skipper.record_latency(elapsed);

        let detection = match result {
            Ok(detection) => detection,
            Err(e) => {
                tracing::warn!(
                    kind = self.mode.kind(),
                    frame_number = self.frame_count,
                    error = %e,
                    "Frame detection failed"
                );
                self.mode.reclaim();
                return Some(FrameOutcome::Failed(FailureEnvelope::new(
                    e.to_string(),
                    self.frame_count,
                )));
            }
        };

        let now = Utc::now();
        let payload = self.mode.post_process(detection, now);

        if self.frame_count % EVICTION_INTERVAL_FRAMES == 0 {
            self.mode.evict_stale(now);
            self.mode.reclaim();
        }

        self.processed_count += 1;

        tracing::trace!(
            kind = self.mode.kind(),
            frame_number = self.frame_count,
            processed = self.processed_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "Frame processed"
        );

        Some(FrameOutcome::Processed(FrameEnvelope {
            success: true,
            kind: self.mode.kind(),
            timestamp: unix_timestamp(),
            frame_number: self.frame_count,
            processed_frame_number: self.processed_count,
            payload,
            processing_time_ms: elapsed.as_millis() as u64,
            current_skip_rate: self
                .skipper
                .is_adaptive()
                .then(|| self.skipper.current()),
        }))
    }

    /// Zero counters and clear mode state; the skip interval is kept
    pub fn reset_state(&mut self) {
        self.frame_count = 0;
        self.processed_count = 0;
        self.mode.reset();
        self.skipper.reset();
        self.mode.reclaim();
        tracing::debug!(kind = self.mode.kind(), "Session state reset");
    }

    /// Statistics snapshot
    pub fn get_stats(&self) -> SessionStats {
        SessionStats {
            total_frames: self.frame_count,
            processed_frames: self.processed_count,
            skip_rate: format!("1/{}", self.skipper.current()),
            gauge: self.mode.gauge(),
        }
    }

    /// Mark the session closed; later frames are ignored
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn processed_count(&self) -> u64 {
        self.processed_count
    }

    /// Current skip interval
    pub fn current_skip(&self) -> u32 {
        self.skipper.current()
    }

    pub fn kind(&self) -> &'static str {
        self.mode.kind()
    }

    pub fn mode(&self) -> &M {
        &self.mode
    }
}
