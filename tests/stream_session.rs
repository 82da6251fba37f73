//! StreamSession integration tests with in-memory detection backends

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use parking_stream_server::ai_client::{
    BBox, PlateReading, PlateRecognizer, SlotDetection, SlotDetector,
};
use parking_stream_server::frame_skipper::{build_skipper, FixedSkipper, SkipperConfig};
use parking_stream_server::occupancy_tracker::ChangeDirection;
use parking_stream_server::plate_dedup::{DedupConfig, PlateDedupCache, RefreshPolicy};
use parking_stream_server::realtime_hub::Outbound;
use parking_stream_server::stream_protocol::{handle_inbound, Inbound};
use parking_stream_server::stream_session::{
    CapacityMode, FrameOutcome, ModeGauge, PlateMode, SessionPhase, StreamSession,
};
use parking_stream_server::{Error, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const BOX: BBox = BBox { x1: 5, y1: 5, x2: 105, y2: 45 };

/// Recognizer returning the same plates on every call
struct FixedPlates {
    plates: Vec<&'static str>,
    calls: AtomicUsize,
}

impl FixedPlates {
    fn new(plates: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            plates,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PlateRecognizer for FixedPlates {
    async fn recognize(&self, _image: Vec<u8>) -> Result<Vec<PlateReading>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .plates
            .iter()
            .map(|text| PlateReading {
                text: text.to_string(),
                raw_text: text.to_string(),
                ocr_confidence: 0.9,
                detection_confidence: 0.8,
                bbox: BOX,
            })
            .collect())
    }
}

/// Recognizer that always fails
struct BrokenRecognizer;

#[async_trait]
impl PlateRecognizer for BrokenRecognizer {
    async fn recognize(&self, _image: Vec<u8>) -> Result<Vec<PlateReading>> {
        Err(Error::Api("model unavailable".to_string()))
    }
}

/// Detector replaying a script of occupied/empty counts
struct ScriptedLot {
    script: Mutex<VecDeque<(u32, u32)>>,
}

impl ScriptedLot {
    fn new(script: &[(u32, u32)]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.iter().copied().collect()),
        })
    }
}

#[async_trait]
impl SlotDetector for ScriptedLot {
    async fn detect_slots(&self, _image: Vec<u8>) -> Result<Vec<SlotDetection>> {
        let (occupied, empty) = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Internal("script exhausted".to_string()))?;
        let slot = |class: &str| SlotDetection {
            class: class.to_string(),
            confidence: 0.876,
            bbox: BOX,
        };
        Ok((0..occupied)
            .map(|_| slot("occupied"))
            .chain((0..empty).map(|_| slot("empty")))
            .collect())
    }
}

fn plate_session(recognizer: Arc<dyn PlateRecognizer>, skip: u32) -> StreamSession<PlateMode> {
    StreamSession::new(
        PlateMode::new(recognizer, DedupConfig::default()),
        Box::new(FixedSkipper::new(skip)),
    )
}

fn frame() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF]
}

#[tokio::test]
async fn skip_five_admits_frames_five_and_ten() {
    let recognizer = FixedPlates::new(vec!["AB123"]);
    let mut session = plate_session(recognizer.clone(), 5);

    let mut outcomes = Vec::new();
    for _ in 0..10 {
        if let Some(outcome) = session.process_frame(frame()).await {
            outcomes.push(outcome);
        }
    }

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].frame_number(), 5);
    assert_eq!(outcomes[1].frame_number(), 10);
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.frame_count(), 10);
    assert_eq!(session.processed_count(), 2);
}

#[tokio::test]
async fn repeated_plate_is_flagged_duplicate() {
    let mut session = plate_session(FixedPlates::new(vec!["ab 123"]), 1);

    let first = session.process_frame(frame()).await.unwrap();
    let second = session.process_frame(frame()).await.unwrap();

    let first = first.processed().unwrap();
    assert_eq!(first.payload.plates[0].plate_number, "AB123");
    assert!(first.payload.plates[0].is_new);
    assert_eq!(first.payload.new_plates, 1);

    let second = second.processed().unwrap();
    assert!(!second.payload.plates[0].is_new);
    assert_eq!(second.payload.new_plates, 0);
    assert_eq!(second.processed_frame_number, 2);
}

#[tokio::test]
async fn plate_envelope_shape() {
    let mut session = plate_session(FixedPlates::new(vec!["AB123"]), 1);
    let outcome = session.process_frame(frame()).await.unwrap();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["type"], "plate_detection");
    assert_eq!(json["frame_number"], 1);
    assert_eq!(json["processed_frame_number"], 1);
    assert_eq!(json["plates_detected"], 1);
    assert_eq!(json["plates"][0]["is_new"], true);
    assert!(json["timestamp"].as_f64().unwrap() > 0.0);
    assert!(json.get("processing_time_ms").is_some());
    assert!(json.get("current_skip_rate").is_none());
}

#[tokio::test]
async fn adaptive_session_reports_skip_rate() {
    let mut session = StreamSession::new(
        PlateMode::new(FixedPlates::new(vec![]), DedupConfig::default()),
        build_skipper(&SkipperConfig::gate(1, true)),
    );
    let outcome = session.process_frame(frame()).await.unwrap();
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["current_skip_rate"], 1);
}

#[tokio::test]
async fn detection_failure_yields_failure_envelope() {
    let mut session = plate_session(Arc::new(BrokenRecognizer), 2);

    assert!(session.process_frame(frame()).await.is_none());
    let outcome = session.process_frame(frame()).await.unwrap();

    assert!(!outcome.is_success());
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["frame_number"], 2);
    assert!(json["error"].as_str().unwrap().contains("model unavailable"));

    assert_eq!(session.frame_count(), 2);
    assert_eq!(session.processed_count(), 0);
}

#[tokio::test]
async fn capacity_reports_every_change() {
    let lot = ScriptedLot::new(&[(5, 5), (5, 5), (6, 4), (4, 6)]);
    let mut session = StreamSession::new(
        CapacityMode::new(lot),
        Box::new(FixedSkipper::new(1)),
    );

    let mut changes = Vec::new();
    for _ in 0..4 {
        let outcome = session.process_frame(frame()).await.unwrap();
        let envelope = outcome.processed().unwrap();
        assert_eq!(envelope.payload.total_slots, 10);
        changes.push(envelope.payload.state_change.clone());
    }

    assert!(changes[0].is_none());
    assert!(changes[1].is_none());

    let up = changes[2].clone().unwrap();
    assert_eq!((up.previous, up.current, up.change), (5, 6, 1));
    assert_eq!(up.direction, ChangeDirection::Increased);

    let down = changes[3].clone().unwrap();
    assert_eq!((down.previous, down.current, down.change), (6, 4, -2));
    assert_eq!(down.direction, ChangeDirection::Decreased);

    assert_eq!(session.get_stats().gauge, ModeGauge::CurrentOccupancy(Some(4)));
}

#[tokio::test]
async fn capacity_envelope_shape() {
    let mut session = StreamSession::new(
        CapacityMode::new(ScriptedLot::new(&[(1, 2)])),
        Box::new(FixedSkipper::new(1)),
    );
    let outcome = session.process_frame(frame()).await.unwrap();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["type"], "capacity_update");
    assert_eq!(json["occupied"], 1);
    assert_eq!(json["empty"], 2);
    assert_eq!(json["occupancy_rate"], 0.33);
    assert_eq!(json["slots"][2]["slot_id"], 3);
    assert_eq!(json["slots"][0]["confidence"], 0.88);
    assert!(json.get("state_change").is_none());
}

#[tokio::test]
async fn reset_zeroes_counters_and_forgets_plates() {
    let mut session = plate_session(FixedPlates::new(vec!["AB123"]), 1);
    session.process_frame(frame()).await;
    session.process_frame(frame()).await;

    session.reset_state();
    assert_eq!(session.frame_count(), 0);
    assert_eq!(session.processed_count(), 0);
    assert_eq!(session.current_skip(), 1);

    let outcome = session.process_frame(frame()).await.unwrap();
    let envelope = outcome.processed().unwrap();
    assert_eq!(envelope.frame_number, 1);
    assert!(envelope.payload.plates[0].is_new);
}

#[tokio::test]
async fn stats_snapshot() {
    let mut session = plate_session(FixedPlates::new(vec!["AB123", "XY987"]), 2);
    for _ in 0..5 {
        session.process_frame(frame()).await;
    }

    let stats = session.get_stats();
    assert_eq!(stats.total_frames, 5);
    assert_eq!(stats.processed_frames, 2);
    assert_eq!(stats.skip_rate, "1/2");
    assert_eq!(stats.gauge, ModeGauge::TrackedPlates(2));

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["tracked_plates"], 2);
}

#[tokio::test]
async fn closed_session_ignores_frames() {
    let recognizer = FixedPlates::new(vec!["AB123"]);
    let mut session = plate_session(recognizer.clone(), 1);
    assert_eq!(session.phase(), SessionPhase::Idle);

    session.process_frame(frame()).await;
    assert_eq!(session.phase(), SessionPhase::Active);

    session.close();
    assert!(session.process_frame(frame()).await.is_none());
    assert_eq!(session.phase(), SessionPhase::Closed);
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn control_messages_bypass_detection() {
    let recognizer = FixedPlates::new(vec!["AB123"]);
    let mut session = plate_session(recognizer.clone(), 1);

    let reply = handle_inbound(&mut session, Inbound::from_text(r#"{"type":"stats"}"#))
        .await
        .unwrap()
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(reply.as_text().unwrap()).unwrap();
    assert_eq!(json["type"], "stats");
    assert_eq!(json["data"]["skip_rate"], "1/1");

    let reply = handle_inbound(&mut session, Inbound::from_text(r#"{"type":"reset"}"#))
        .await
        .unwrap();
    assert_eq!(reply, Some(Outbound::Text(r#"{"type":"reset_ack"}"#.to_string())));

    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_message_gets_error_reply() {
    let mut session = plate_session(FixedPlates::new(vec![]), 1);

    let reply = handle_inbound(&mut session, Inbound::from_text("{oops"))
        .await
        .unwrap()
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(reply.as_text().unwrap()).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["type"], "error");
    assert_eq!(session.frame_count(), 0);
}

#[tokio::test]
async fn base64_frame_is_processed() {
    let mut session = plate_session(FixedPlates::new(vec!["AB123"]), 1);
    let reply = handle_inbound(
        &mut session,
        Inbound::from_text(r#"{"data":"data:image/jpeg;base64,/9j/"}"#),
    )
    .await
    .unwrap()
    .unwrap();
    let json: serde_json::Value = serde_json::from_str(reply.as_text().unwrap()).unwrap();
    assert_eq!(json["type"], "plate_detection");
}

#[tokio::test]
async fn skipped_frame_has_no_reply() {
    let mut session = plate_session(FixedPlates::new(vec![]), 3);
    let reply = handle_inbound(&mut session, Inbound::from_binary(frame()))
        .await
        .unwrap();
    assert!(reply.is_none());
}

#[test]
fn dedup_window_scenario_with_new_only_refresh() {
    let mut cache = PlateDedupCache::new(DedupConfig {
        refresh: RefreshPolicy::NewSightingOnly,
        ..DedupConfig::default()
    });
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

    assert!(!cache.is_duplicate_at("AB123", t0));
    assert!(cache.is_duplicate_at("AB123", t0 + Duration::seconds(5)));
    assert!(!cache.is_duplicate_at("AB123", t0 + Duration::seconds(11)));
}

#[test]
fn failed_outcome_is_untagged() {
    let outcome: FrameOutcome<()> = FrameOutcome::Failed(
        parking_stream_server::stream_session::FailureEnvelope::new("boom", 7),
    );
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["frame_number"], 7);
    assert!(json.get("Failed").is_none());
}

/// Recognizer reporting a never-seen plate on every call
struct FreshPlates {
    calls: AtomicUsize,
}

#[async_trait]
impl PlateRecognizer for FreshPlates {
    async fn recognize(&self, _image: Vec<u8>) -> Result<Vec<PlateReading>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let text = format!("P{:05}", n);
        Ok(vec![PlateReading {
            raw_text: text.clone(),
            text,
            ocr_confidence: 0.9,
            detection_confidence: 0.8,
            bbox: BOX,
        }])
    }
}

/// Tracked-plate gauge after each of `frames` raw frames
async fn tracked_after_each_frame(skip: u32, frames: u64) -> Vec<usize> {
    let mut session = StreamSession::new(
        PlateMode::new(
            Arc::new(FreshPlates {
                calls: AtomicUsize::new(0),
            }),
            DedupConfig {
                max_tracked: 10,
                ..DedupConfig::default()
            },
        ),
        Box::new(FixedSkipper::new(skip)),
    );

    let mut tracked = Vec::new();
    for _ in 0..frames {
        session.process_frame(frame()).await;
        match session.get_stats().gauge {
            ModeGauge::TrackedPlates(n) => tracked.push(n),
            other => panic!("unexpected gauge {:?}", other),
        }
    }
    tracked
}

#[tokio::test]
async fn eviction_runs_every_fifty_raw_frames() {
    let tracked = tracked_after_each_frame(1, 50).await;
    assert_eq!(tracked[48], 49);
    assert_eq!(tracked[49], 10);
}

#[tokio::test]
async fn eviction_cadence_follows_raw_frame_count() {
    // Admitted frames are multiples of 3, so eviction first coincides at frame 150
    let tracked = tracked_after_each_frame(3, 150).await;
    assert_eq!(tracked[49], 16);
    assert_eq!(tracked[99], 33);
    assert_eq!(tracked[148], 49);
    assert_eq!(tracked[149], 10);
}
