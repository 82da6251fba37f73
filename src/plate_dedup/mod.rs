//! PlateDedupCache - Time-windowed Plate Deduplication
//!
//! ## Responsibilities
//!
//! - Flag plates sighted again within the dedup window
//! - Evict plates not seen for twice the window
//! - Hard cap on tracked plates (most recently seen survive)
//!
//! One cache per stream session; no locking.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Default number of plates tracked per session
pub const DEFAULT_MAX_TRACKED: usize = 100;

/// When a sighting restamps the plate's last-seen time
///
/// The two policies diverge on repeated sightings: with a 10s window, plates at
/// t=0, 5, 11 read new, duplicate, duplicate under `EverySighting` but new,
/// duplicate, new under `NewSightingOnly`, which restamps only on a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Every check restamps, so the window restarts at the latest sighting
    #[default]
    EverySighting,
    /// Only sightings reported as new restamp
    NewSightingOnly,
}

impl RefreshPolicy {
    /// Parse a configuration value ("every" / "new")
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "every" | "every_sighting" | "always" => Some(Self::EverySighting),
            "new" | "new_only" | "new_sighting_only" => Some(Self::NewSightingOnly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EverySighting => "every",
            Self::NewSightingOnly => "new",
        }
    }
}

/// PlateDedupCache configuration
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Suppression window
    pub window: std::time::Duration,
    /// Maximum plates kept after eviction
    pub max_tracked: usize,
    /// Restamp policy
    pub refresh: RefreshPolicy,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window: std::time::Duration::from_secs(10),
            max_tracked: DEFAULT_MAX_TRACKED,
            refresh: RefreshPolicy::EverySighting,
        }
    }
}

/// Per-session dedup map: plate number -> last seen
#[derive(Debug)]
pub struct PlateDedupCache {
    seen: HashMap<String, DateTime<Utc>>,
    window: Duration,
    max_tracked: usize,
    refresh: RefreshPolicy,
}

impl PlateDedupCache {
    /// Create new cache
    pub fn new(config: DedupConfig) -> Self {
        Self {
            seen: HashMap::new(),
            window: Duration::from_std(config.window).unwrap_or(Duration::MAX),
            max_tracked: config.max_tracked,
            refresh: config.refresh,
        }
    }

    /// Check a plate against the window using the current time
    pub fn is_duplicate(&mut self, plate: &str) -> bool {
        self.is_duplicate_at(plate, Utc::now())
    }

    /// Check a plate against the window at `now`, restamping per the refresh policy
    pub fn is_duplicate_at(&mut self, plate: &str, now: DateTime<Utc>) -> bool {
        let duplicate = self
            .seen
            .get(plate)
            .is_some_and(|last_seen| now.signed_duration_since(*last_seen) < self.window);

        if !duplicate || self.refresh == RefreshPolicy::EverySighting {
            self.seen.insert(plate.to_string(), now);
        }

        duplicate
    }

    /// Drop plates untouched for more than twice the window, then enforce the cap.
    ///
    /// Returns the number of plates removed.
    pub fn evict_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.seen.len();
        let stale_after = self.window.checked_mul(2).unwrap_or(Duration::MAX);
        self.seen
            .retain(|_, last_seen| now.signed_duration_since(*last_seen) <= stale_after);

        if self.seen.len() > self.max_tracked {
            let mut by_recency: Vec<(String, DateTime<Utc>)> = self.seen.drain().collect();
            by_recency.sort_by(|a, b| b.1.cmp(&a.1));
            by_recency.truncate(self.max_tracked);
            self.seen.extend(by_recency);
        }

        let removed = before - self.seen.len();
        if removed > 0 {
            tracing::debug!(
                removed = removed,
                tracked = self.seen.len(),
                "Evicted stale plates from dedup cache"
            );
        }
        removed
    }

    /// Release spare capacity after eviction or a failed frame
    pub fn shrink(&mut self) {
        self.seen.shrink_to_fit();
    }

    /// Forget every plate
    pub fn clear(&mut self) {
        self.seen.clear();
        self.seen.shrink_to_fit();
    }

    /// Number of tracked plates
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Last sighting of a plate, if tracked
    pub fn last_seen(&self, plate: &str) -> Option<DateTime<Utc>> {
        self.seen.get(plate).copied()
    }

    /// Dedup window
    pub fn window(&self) -> Duration {
        self.window
    }
}
