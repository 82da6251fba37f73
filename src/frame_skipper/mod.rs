//! FrameSkipper - Frame Admission Control
//!
//! ## Responsibilities
//!
//! - Decide which incoming frames are worth a detection call
//! - Track processing latency and tune the admission cadence (dynamic mode)
//!
//! ## Design
//!
//! - One interface, two strategies: fixed cadence and latency-driven
//! - Strategy selected once per session from configuration
//! - Hysteresis: a dead band between 60% and 90% of the budget prevents flapping

mod dynamic;
mod fixed;
mod types;

pub use dynamic::DynamicSkipper;
pub use fixed::FixedSkipper;
pub use types::*;

use std::time::Duration;

/// Admission strategy owned by one session
pub trait FrameAdmission: Send + Sync {
    /// Count one incoming frame and report whether it should be processed
    fn should_admit(&mut self) -> bool;

    /// Feed back the wall-clock latency of a processed frame
    fn record_latency(&mut self, latency: Duration);

    /// Clear counters and latency history; the current interval is kept
    fn reset(&mut self);

    /// Current skip interval
    fn current(&self) -> u32;

    /// Raw frames counted since creation or the last reset
    fn frames_seen(&self) -> u64;

    /// Whether the interval can change at runtime
    fn is_adaptive(&self) -> bool;
}

/// Build the admission strategy described by `config`
pub fn build_skipper(config: &SkipperConfig) -> Box<dyn FrameAdmission> {
    if config.dynamic {
        Box::new(DynamicSkipper::new(config.clone()))
    } else {
        Box::new(FixedSkipper::new(config.initial_skip))
    }
}
