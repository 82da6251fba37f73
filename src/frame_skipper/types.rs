//! FrameSkipper types

use serde::Serialize;

/// Admission tuning for one stream kind
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkipperConfig {
    /// Starting skip interval (admit one frame in N)
    pub initial_skip: u32,
    /// Lower bound for the adaptive interval
    pub min_skip: u32,
    /// Upper bound for the adaptive interval
    pub max_skip: u32,
    /// Target processing rate in processed frames per second
    pub target_fps: f64,
    /// Admitted frames between two recomputations
    pub adjustment_interval: u32,
    /// Latency samples kept for the moving average
    pub history_len: usize,
    /// Samples required before any adjustment
    pub min_samples: usize,
    /// Adapt the interval to observed latency
    pub dynamic: bool,
}

impl SkipperConfig {
    /// Plate gate defaults (fast moving vehicles)
    pub fn gate(initial_skip: u32, dynamic: bool) -> Self {
        Self {
            initial_skip,
            min_skip: 1,
            max_skip: 30,
            target_fps: 10.0,
            dynamic,
            ..Self::default()
        }
    }

    /// Parking lot defaults (occupancy changes slowly)
    pub fn lot(initial_skip: u32, dynamic: bool) -> Self {
        Self {
            initial_skip,
            min_skip: 2,
            max_skip: 50,
            target_fps: 5.0,
            dynamic,
            ..Self::default()
        }
    }

    /// Target wall-clock budget for a single processed frame, in seconds
    pub fn target_frame_time(&self) -> f64 {
        1.0 / self.target_fps
    }
}

impl Default for SkipperConfig {
    fn default() -> Self {
        Self {
            initial_skip: 5,
            min_skip: 1,
            max_skip: 30,
            target_fps: 10.0,
            adjustment_interval: 20,
            history_len: 10,
            min_samples: 5,
            dynamic: false,
        }
    }
}

/// Outcome of a periodic recompute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipAdjustment {
    /// Processing has headroom, admit more frames
    Decreased { from: u32, to: u32 },
    /// Processing is falling behind, admit fewer frames
    Increased { from: u32, to: u32 },
    /// Inside the hysteresis band, or already at a bound
    Unchanged,
    /// Not enough latency samples yet
    InsufficientSamples,
}
