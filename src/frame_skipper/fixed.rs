//! Fixed-cadence admission

use super::FrameAdmission;
use std::time::Duration;

/// Admits exactly one frame in every `skip_interval`, forever
#[derive(Debug, Clone)]
pub struct FixedSkipper {
    skip_interval: u32,
    frame_count: u64,
}

impl FixedSkipper {
    pub fn new(skip_interval: u32) -> Self {
        Self {
            skip_interval: skip_interval.max(1),
            frame_count: 0,
        }
    }
}

impl FrameAdmission for FixedSkipper {
    fn should_admit(&mut self) -> bool {
        self.frame_count += 1;
        self.frame_count % self.skip_interval as u64 == 0
    }

    fn record_latency(&mut self, _latency: Duration) {}

    fn reset(&mut self) {
        self.frame_count = 0;
    }

    fn current(&self) -> u32 {
        self.skip_interval
    }

    fn frames_seen(&self) -> u64 {
        self.frame_count
    }

    fn is_adaptive(&self) -> bool {
        false
    }
}
