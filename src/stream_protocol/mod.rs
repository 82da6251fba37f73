//! StreamProtocol - Inbound Message Dispatch
//!
//! ## Responsibilities
//!
//! - Classify socket messages (frame / control / malformed)
//! - Answer `reset` and `stats` without touching the detection path
//! - Route frames into the stream session
//! - Build handshake and protocol error replies
//!
//! Malformed input is answered, never fatal: the connection stays open.

use crate::error::{Error, Result};
use crate::realtime_hub::Outbound;
use crate::stream_session::{unix_timestamp, StreamMode, StreamSession};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;

const DATA_URL_MARKER: &str = ";base64,";

/// Control message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Reset,
    Stats,
}

/// Classified inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Encoded image bytes
    Frame(Vec<u8>),
    Control(ControlCommand),
    /// Unusable message, with the reason sent back to the client
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct TextEnvelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    data: Option<String>,
}

impl Inbound {
    /// Classify a binary message; its bytes are the frame
    pub fn from_binary(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            return Self::Malformed("Empty frame".to_string());
        }
        Self::Frame(bytes)
    }

    /// Classify a text message: control envelope or `{"data": base64}`
    pub fn from_text(text: &str) -> Self {
        let envelope: TextEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => return Self::Malformed(format!("Invalid JSON: {}", e)),
        };

        match envelope.kind.as_deref() {
            Some("reset") => return Self::Control(ControlCommand::Reset),
            Some("stats") => return Self::Control(ControlCommand::Stats),
            _ => {}
        }

        match (envelope.data, envelope.kind) {
            (Some(data), _) => match decode_frame(&data) {
                Ok(bytes) if !bytes.is_empty() => Self::Frame(bytes),
                Ok(_) => Self::Malformed("Empty frame".to_string()),
                Err(e) => Self::Malformed(format!("Invalid base64 data: {}", e)),
            },
            (None, Some(kind)) => Self::Malformed(format!("Unknown message type: {}", kind)),
            (None, None) => Self::Malformed("Missing 'data' field".to_string()),
        }
    }
}

/// Decode a base64 frame, dropping an optional `data:<mime>;base64,` prefix
pub fn decode_frame(data: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let payload = match data.strip_prefix("data:") {
        Some(rest) => rest
            .find(DATA_URL_MARKER)
            .map(|idx| &rest[idx + DATA_URL_MARKER.len()..])
            .unwrap_or(data),
        None => data,
    };
    base64::engine::general_purpose::STANDARD.decode(payload.trim())
}

/// Reply to an unusable message
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolError {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    pub timestamp: f64,
}

impl ProtocolError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            kind: "error",
            error: error.into(),
            code: None,
            timestamp: unix_timestamp(),
        }
    }

    pub fn from_error(err: &Error) -> Self {
        Self {
            code: Some(err.code()),
            ..Self::new(err.to_string())
        }
    }
}

/// First message on every stream socket
pub fn handshake<C: Serialize>(config: &C) -> Result<Outbound> {
    Outbound::json(&json!({
        "type": "connection",
        "status": "connected",
        "config": config,
    }))
}

/// Dispatch one inbound message against a session.
///
/// Returns the reply to send, if any; skipped frames produce none.
pub async fn handle_inbound<M: StreamMode>(
    session: &mut StreamSession<M>,
    inbound: Inbound,
) -> Result<Option<Outbound>> {
    match inbound {
        Inbound::Frame(bytes) => session
            .process_frame(bytes)
            .await
            .map(|outcome| Outbound::json(&outcome))
            .transpose(),
        Inbound::Control(ControlCommand::Reset) => {
            session.reset_state();
            Ok(Some(Outbound::json(&json!({ "type": "reset_ack" }))?))
        }
        Inbound::Control(ControlCommand::Stats) => {
            let stats = session.get_stats();
            Ok(Some(Outbound::json(&json!({ "type": "stats", "data": stats }))?))
        }
        Inbound::Malformed(reason) => {
            tracing::debug!(kind = session.kind(), reason = %reason, "Malformed message");
            let err = Error::Parse(reason);
            Ok(Some(Outbound::json(&ProtocolError::from_error(&err))?))
        }
    }
}
