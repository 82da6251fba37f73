//! Latency-driven adaptive admission
//!
//! The per-frame path is a counter increment and a modulo. The moving average
//! is only recomputed every `adjustment_interval` recorded latencies.

use super::types::{SkipAdjustment, SkipperConfig};
use super::FrameAdmission;
use std::collections::VecDeque;
use std::time::Duration;

/// Fraction of the available budget below which the interval shrinks
const FAST_RATIO: f64 = 0.6;
/// Fraction of the available budget above which the interval grows
const SLOW_RATIO: f64 = 0.9;
/// Step applied when processing has headroom
const DECREASE_STEP: u32 = 1;
/// Step applied when processing falls behind
const INCREASE_STEP: u32 = 2;

/// Adaptive skipper
#[derive(Debug, Clone)]
pub struct DynamicSkipper {
    config: SkipperConfig,
    skip_interval: u32,
    /// Recent processing latencies in seconds, oldest first
    recent_latencies: VecDeque<f64>,
    frame_count: u64,
    frames_since_adjustment: u32,
}

impl DynamicSkipper {
    pub fn new(config: SkipperConfig) -> Self {
        let min_skip = config.min_skip.max(1);
        let max_skip = config.max_skip.max(min_skip);
        let skip_interval = config.initial_skip.clamp(min_skip, max_skip);
        let history_len = config.history_len.max(1);
        Self {
            config: SkipperConfig {
                min_skip,
                max_skip,
                history_len,
                ..config
            },
            skip_interval,
            recent_latencies: VecDeque::with_capacity(history_len),
            frame_count: 0,
            frames_since_adjustment: 0,
        }
    }

    /// Record one latency sample; returns the recompute outcome when one was due
    pub fn record(&mut self, latency: Duration) -> Option<SkipAdjustment> {
        if self.recent_latencies.len() == self.config.history_len {
            self.recent_latencies.pop_front();
        }
        self.recent_latencies.push_back(latency.as_secs_f64());
        self.frames_since_adjustment += 1;

        if self.frames_since_adjustment < self.config.adjustment_interval {
            return None;
        }
        self.frames_since_adjustment = 0;
        Some(self.adjust())
    }

    /// Number of latency samples currently held
    pub fn sample_count(&self) -> usize {
        self.recent_latencies.len()
    }

    fn adjust(&mut self) -> SkipAdjustment {
        if self.recent_latencies.len() < self.config.min_samples {
            return SkipAdjustment::InsufficientSamples;
        }

        let avg = self.recent_latencies.iter().sum::<f64>() / self.recent_latencies.len() as f64;
        let available = self.config.target_frame_time() * self.skip_interval as f64;
        let from = self.skip_interval;

        let outcome = if avg < available * FAST_RATIO {
            let to = from.saturating_sub(DECREASE_STEP).max(self.config.min_skip);
            if to != from {
                SkipAdjustment::Decreased { from, to }
            } else {
                SkipAdjustment::Unchanged
            }
        } else if avg > available * SLOW_RATIO {
            let to = from.saturating_add(INCREASE_STEP).min(self.config.max_skip);
            if to != from {
                SkipAdjustment::Increased { from, to }
            } else {
                SkipAdjustment::Unchanged
            }
        } else {
            SkipAdjustment::Unchanged
        };

        match outcome {
            SkipAdjustment::Decreased { to, .. } | SkipAdjustment::Increased { to, .. } => {
                self.skip_interval = to;
                tracing::debug!(
                    from = from,
                    to = to,
                    avg_latency_ms = (avg * 1000.0) as u64,
                    available_ms = (available * 1000.0) as u64,
                    "Frame skip interval adjusted"
                );
            }
            _ => {}
        }

        outcome
    }
}

impl FrameAdmission for DynamicSkipper {
    fn should_admit(&mut self) -> bool {
        self.frame_count += 1;
        self.frame_count % self.skip_interval as u64 == 0
    }

    fn record_latency(&mut self, latency: Duration) {
        self.record(latency);
    }

    fn reset(&mut self) {
        self.recent_latencies.clear();
        self.frame_count = 0;
        self.frames_since_adjustment = 0;
    }

    fn current(&self) -> u32 {
        self.skip_interval
    }

    fn frames_seen(&self) -> u64 {
        self.frame_count
    }

    fn is_adaptive(&self) -> bool {
        true
    }
}
