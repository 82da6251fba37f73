//! Occupancy Tracker
//!
//! Watches the occupied-slot count across processed frames of one lot stream.
//! Only changes are reported; the first observation just seeds the baseline.

use serde::{Deserialize, Serialize};

/// Smallest absolute change that is reported
pub const MIN_REPORTED_CHANGE: i64 = 1;

/// Direction of an occupancy change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Increased,
    Decreased,
}

/// Occupancy change event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyChange {
    pub previous: u32,
    pub current: u32,
    /// Signed difference `current - previous`
    pub change: i64,
    pub direction: ChangeDirection,
}

/// Tracks the last reported occupancy and detects transitions
#[derive(Debug, Default)]
pub struct OccupancyTracker {
    last_count: Option<u32>,
}

impl OccupancyTracker {
    /// Create new tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the occupied count of a processed frame
    ///
    /// Returns:
    /// - `None` on the first observation (baseline seeded)
    /// - `None` when the count did not move
    /// - `Some(change)` otherwise; the baseline moves to `current`
    pub fn observe(&mut self, current: u32) -> Option<OccupancyChange> {
        let previous = match self.last_count {
            Some(previous) => previous,
            None => {
                self.last_count = Some(current);
                return None;
            }
        };

        let change = current as i64 - previous as i64;
        if change.abs() < MIN_REPORTED_CHANGE {
            return None;
        }

        self.last_count = Some(current);
        tracing::debug!(
            previous = previous,
            current = current,
            change = change,
            "Occupancy changed"
        );

        Some(OccupancyChange {
            previous,
            current,
            change,
            direction: if change > 0 {
                ChangeDirection::Increased
            } else {
                ChangeDirection::Decreased
            },
        })
    }

    /// Last reported occupancy
    pub fn last_count(&self) -> Option<u32> {
        self.last_count
    }

    /// Forget the baseline
    pub fn reset(&mut self) {
        self.last_count = None;
    }
}
