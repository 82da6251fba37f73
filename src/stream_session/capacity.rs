//! Lot capacity mode: slot classification + occupancy change tracking

use super::{ModeGauge, StreamMode};
use crate::ai_client::{round2, BBox, SlotDetection, SlotDetector};
use crate::error::Result;
use crate::occupancy_tracker::{OccupancyChange, OccupancyTracker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

const CLASS_OCCUPIED: &str = "occupied";
const CLASS_EMPTY: &str = "empty";

/// Slot entry in a `capacity_update` envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotStatus {
    /// 1-based position in the detector output
    pub slot_id: u32,
    pub status: String,
    pub confidence: f64,
    pub bbox: BBox,
}

/// Capacity fields of a `capacity_update` envelope
#[derive(Debug, Clone, Serialize)]
pub struct CapacityPayload {
    pub total_slots: u32,
    pub occupied: u32,
    pub empty: u32,
    pub occupancy_rate: f64,
    pub slots: Vec<SlotStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_change: Option<OccupancyChange>,
}

/// Lot capacity mode
pub struct CapacityMode {
    detector: Arc<dyn SlotDetector>,
    tracker: OccupancyTracker,
}

impl CapacityMode {
    pub fn new(detector: Arc<dyn SlotDetector>) -> Self {
        Self {
            detector,
            tracker: OccupancyTracker::new(),
        }
    }
}

#[async_trait]
impl StreamMode for CapacityMode {
    type Detection = Vec<SlotDetection>;
    type Payload = CapacityPayload;

    fn kind(&self) -> &'static str {
        "capacity_update"
    }

    async fn detect(&self, frame: Vec<u8>) -> Result<Vec<SlotDetection>> {
        self.detector.detect_slots(frame).await
    }

    fn post_process(&mut self, detections: Vec<SlotDetection>, _now: DateTime<Utc>) -> CapacityPayload {
        let mut occupied = 0u32;
        let mut empty = 0u32;
        let slots: Vec<SlotStatus> = detections
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                match slot.class.as_str() {
                    CLASS_OCCUPIED => occupied += 1,
                    CLASS_EMPTY => empty += 1,
                    _ => {}
                }
                SlotStatus {
                    slot_id: idx as u32 + 1,
                    status: slot.class,
                    confidence: round2(slot.confidence),
                    bbox: slot.bbox,
                }
            })
            .collect();

        let total_slots = occupied + empty;
        let occupancy_rate = if total_slots > 0 {
            round2(occupied as f64 / total_slots as f64)
        } else {
            0.0
        };

        CapacityPayload {
            total_slots,
            occupied,
            empty,
            occupancy_rate,
            slots,
            state_change: self.tracker.observe(occupied),
        }
    }

    fn reset(&mut self) {
        self.tracker.reset();
    }

    fn gauge(&self) -> ModeGauge {
        ModeGauge::CurrentOccupancy(self.tracker.last_count())
    }
}
