//! Application state
//!
//! Holds configuration and the components shared by every connection

use crate::ai_client::{InferenceClient, PlateRecognizer, SlotDetector};
use crate::error::{Error, Result};
use crate::frame_skipper::{build_skipper, SkipperConfig};
use crate::plate_dedup::{DedupConfig, RefreshPolicy, DEFAULT_MAX_TRACKED};
use crate::realtime_hub::RealtimeHub;
use crate::stream_session::{CapacityMode, PlateMode, StreamSession};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest accepted plate dedup window
pub const MAX_DEDUP_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Allowed CORS origin
    pub frontend_url: String,
    pub environment: Environment,
    /// Inference service URL
    pub inference_url: String,
    /// Per-request inference timeout
    pub inference_timeout: Duration,
    /// Adaptive frame skipping for new sessions
    pub dynamic_frame_skipping: bool,
    /// Initial skip interval, plate stream
    pub gate_frame_skip: u32,
    /// Plate dedup window
    pub gate_dedup_window: Duration,
    pub gate_max_tracked_plates: usize,
    pub gate_dedup_refresh: RefreshPolicy,
    /// Initial skip interval, capacity stream
    pub lot_frame_skip: u32,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT").unwrap_or(8000),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .map(|v| Environment::from_env_value(&v))
                .unwrap_or(Environment::Development),
            inference_url: std::env::var("INFERENCE_URL")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            inference_timeout: Duration::from_secs(env_parse("INFERENCE_TIMEOUT_SECS").unwrap_or(30)),
            dynamic_frame_skipping: std::env::var("DYNAMIC_FRAME_SKIPPING")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            gate_frame_skip: env_parse("GATE_FRAME_SKIP").unwrap_or(5),
            gate_dedup_window: Duration::from_secs(env_parse("GATE_DEDUP_WINDOW").unwrap_or(10)),
            gate_max_tracked_plates: env_parse("GATE_MAX_TRACKED_PLATES")
                .unwrap_or(DEFAULT_MAX_TRACKED),
            gate_dedup_refresh: std::env::var("GATE_DEDUP_REFRESH")
                .ok()
                .and_then(|v| RefreshPolicy::parse(&v))
                .unwrap_or_default(),
            lot_frame_skip: env_parse("LOT_FRAME_SKIP").unwrap_or(10),
        }
    }
}

/// Session configuration echoed in the connection handshake
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub environment: Environment,
    pub dynamic_frame_skipping: bool,
    pub gate_frame_skip: u32,
    pub lot_frame_skip: u32,
    pub dedup_window_sec: u64,
    pub dedup_refresh: &'static str,
}

impl AppConfig {
    /// Reject values no session can run with
    pub fn validate(&self) -> Result<()> {
        if self.gate_frame_skip == 0 {
            return Err(Error::Config("GATE_FRAME_SKIP must be at least 1".to_string()));
        }
        if self.lot_frame_skip == 0 {
            return Err(Error::Config("LOT_FRAME_SKIP must be at least 1".to_string()));
        }
        if self.gate_dedup_window.is_zero() {
            return Err(Error::Config("GATE_DEDUP_WINDOW must be positive".to_string()));
        }
        if self.gate_dedup_window > MAX_DEDUP_WINDOW {
            return Err(Error::Config(format!(
                "GATE_DEDUP_WINDOW must be at most {} seconds",
                MAX_DEDUP_WINDOW.as_secs()
            )));
        }
        if self.gate_max_tracked_plates == 0 {
            return Err(Error::Config(
                "GATE_MAX_TRACKED_PLATES must be at least 1".to_string(),
            ));
        }
        if self.inference_timeout.is_zero() {
            return Err(Error::Config("INFERENCE_TIMEOUT_SECS must be positive".to_string()));
        }
        Ok(())
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            environment: self.environment,
            dynamic_frame_skipping: self.dynamic_frame_skipping,
            gate_frame_skip: self.gate_frame_skip,
            lot_frame_skip: self.lot_frame_skip,
            dedup_window_sec: self.gate_dedup_window.as_secs(),
            dedup_refresh: self.gate_dedup_refresh.as_str(),
        }
    }

    pub fn gate_skipper(&self) -> SkipperConfig {
        SkipperConfig::gate(self.gate_frame_skip, self.dynamic_frame_skipping)
    }

    pub fn lot_skipper(&self) -> SkipperConfig {
        SkipperConfig::lot(self.lot_frame_skip, self.dynamic_frame_skipping)
    }

    pub fn dedup_config(&self) -> DedupConfig {
        DedupConfig {
            window: self.gate_dedup_window,
            max_tracked: self.gate_max_tracked_plates,
            refresh: self.gate_dedup_refresh,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// InferenceClient (health probing)
    pub inference: Arc<InferenceClient>,
    /// Plate recognition backend shared by all gate sessions
    pub plate_recognizer: Arc<dyn PlateRecognizer>,
    /// Slot detection backend shared by all lot sessions
    pub slot_detector: Arc<dyn SlotDetector>,
    /// RealtimeHub for stream sockets (unicast replies)
    pub stream_hub: Arc<RealtimeHub>,
    /// RealtimeHub for signaling sockets (relay)
    pub signaling_hub: Arc<RealtimeHub>,
    pub started_at: Instant,
}

impl AppState {
    /// Build state with the inference client backing both detection seams
    pub fn new(config: AppConfig, inference: Arc<InferenceClient>) -> Self {
        Self::with_backends(config, inference.clone(), inference.clone(), inference)
    }

    /// Build state with explicit detection backends
    pub fn with_backends(
        config: AppConfig,
        inference: Arc<InferenceClient>,
        plate_recognizer: Arc<dyn PlateRecognizer>,
        slot_detector: Arc<dyn SlotDetector>,
    ) -> Self {
        Self {
            config,
            inference,
            plate_recognizer,
            slot_detector,
            stream_hub: Arc::new(RealtimeHub::new("stream")),
            signaling_hub: Arc::new(RealtimeHub::new("signaling")),
            started_at: Instant::now(),
        }
    }

    /// New plate gate session
    pub fn plate_session(&self) -> StreamSession<PlateMode> {
        StreamSession::new(
            PlateMode::new(self.plate_recognizer.clone(), self.config.dedup_config()),
            build_skipper(&self.config.gate_skipper()),
        )
    }

    /// New lot capacity session
    pub fn capacity_session(&self) -> StreamSession<CapacityMode> {
        StreamSession::new(
            CapacityMode::new(self.slot_detector.clone()),
            build_skipper(&self.config.lot_skipper()),
        )
    }

    pub fn uptime_sec(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            frontend_url: "http://localhost:3000".to_string(),
            environment: Environment::Development,
            inference_url: "http://localhost:9000".to_string(),
            inference_timeout: Duration::from_secs(30),
            dynamic_frame_skipping: false,
            gate_frame_skip: 5,
            gate_dedup_window: Duration::from_secs(10),
            gate_max_tracked_plates: 100,
            gate_dedup_refresh: RefreshPolicy::EverySighting,
            lot_frame_skip: 10,
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut c = config();
        c.gate_frame_skip = 0;
        assert!(matches!(c.validate(), Err(Error::Config(_))));

        let mut c = config();
        c.gate_dedup_window = Duration::ZERO;
        assert!(matches!(c.validate(), Err(Error::Config(_))));

        let mut c = config();
        c.gate_dedup_window = Duration::from_secs(u64::MAX);
        assert!(matches!(c.validate(), Err(Error::Config(_))));

        let mut c = config();
        c.gate_dedup_window = MAX_DEDUP_WINDOW;
        assert!(c.validate().is_ok());

        let mut c = config();
        c.gate_max_tracked_plates = 0;
        assert!(matches!(c.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::from_env_value("Production"), Environment::Production);
        assert_eq!(Environment::from_env_value("staging"), Environment::Development);
    }

    #[test]
    fn test_summary_shape() {
        let value = serde_json::to_value(config().summary()).unwrap();
        assert_eq!(value["environment"], "development");
        assert_eq!(value["gate_frame_skip"], 5);
        assert_eq!(value["lot_frame_skip"], 10);
        assert_eq!(value["dedup_window_sec"], 10);
        assert_eq!(value["dedup_refresh"], "every");
    }

    #[test]
    fn test_skipper_configs() {
        let c = config();
        let gate = c.gate_skipper();
        assert_eq!((gate.initial_skip, gate.min_skip, gate.max_skip), (5, 1, 30));
        let lot = c.lot_skipper();
        assert_eq!((lot.initial_skip, lot.min_skip, lot.max_skip), (10, 2, 50));
    }
}
