//! Plate gate mode: recognition + time-windowed dedup

use super::{ModeGauge, StreamMode};
use crate::ai_client::{normalize_plate, BBox, PlateReading, PlateRecognizer};
use crate::error::Result;
use crate::plate_dedup::{DedupConfig, PlateDedupCache};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Plate entry in a `plate_detection` envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateRecord {
    pub plate_number: String,
    pub raw_text: String,
    pub confidence: f64,
    pub detection_confidence: f64,
    pub bbox: BBox,
    pub is_new: bool,
}

/// Plate fields of a `plate_detection` envelope
#[derive(Debug, Clone, Serialize)]
pub struct PlatePayload {
    pub plates: Vec<PlateRecord>,
    pub plates_detected: usize,
    pub new_plates: usize,
}

/// Plate gate mode
pub struct PlateMode {
    recognizer: Arc<dyn PlateRecognizer>,
    dedup: PlateDedupCache,
}

impl PlateMode {
    pub fn new(recognizer: Arc<dyn PlateRecognizer>, dedup: DedupConfig) -> Self {
        Self {
            recognizer,
            dedup: PlateDedupCache::new(dedup),
        }
    }

    /// Number of plates currently tracked by the dedup cache
    pub fn tracked_plates(&self) -> usize {
        self.dedup.len()
    }
}

#[async_trait]
impl StreamMode for PlateMode {
    type Detection = Vec<PlateReading>;
    type Payload = PlatePayload;

    fn kind(&self) -> &'static str {
        "plate_detection"
    }

    async fn detect(&self, frame: Vec<u8>) -> Result<Vec<PlateReading>> {
        self.recognizer.recognize(frame).await
    }

    fn post_process(&mut self, readings: Vec<PlateReading>, now: DateTime<Utc>) -> PlatePayload {
        let plates: Vec<PlateRecord> = readings
            .into_iter()
            .filter_map(|reading| {
                let plate_number = normalize_plate(&reading.text);
                if plate_number.is_empty() {
                    return None;
                }
                let is_new = !self.dedup.is_duplicate_at(&plate_number, now);
                Some(PlateRecord {
                    plate_number,
                    raw_text: reading.raw_text,
                    confidence: reading.ocr_confidence,
                    detection_confidence: reading.detection_confidence,
                    bbox: reading.bbox,
                    is_new,
                })
            })
            .collect();

        let new_plates = plates.iter().filter(|p| p.is_new).count();
        if new_plates > 0 {
            tracing::info!(new_plates = new_plates, "New plates sighted");
        }

        PlatePayload {
            plates_detected: plates.len(),
            new_plates,
            plates,
        }
    }

    fn evict_stale(&mut self, now: DateTime<Utc>) {
        self.dedup.evict_at(now);
    }

    fn reclaim(&mut self) {
        self.dedup.shrink();
    }

    fn reset(&mut self) {
        self.dedup.clear();
    }

    fn gauge(&self) -> ModeGauge {
        ModeGauge::TrackedPlates(self.dedup.len())
    }
}
