//! Inference service types

use serde::{Deserialize, Serialize};

/// Bounding box in the (possibly resized) frame's pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BBox {
    /// Convert a centre/size box to corner coordinates
    pub fn from_center(x: f64, y: f64, width: f64, height: f64) -> Self {
        let (x, y) = (x as i32, y as i32);
        let (half_w, half_h) = (width as i32 / 2, height as i32 / 2);
        Self {
            x1: x - half_w,
            y1: y - half_h,
            x2: x + half_w,
            y2: y + half_h,
        }
    }
}

/// One recognized plate, as seen by a stream session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateReading {
    /// Cleaned plate text (identity)
    pub text: String,
    /// Text as returned by OCR
    pub raw_text: String,
    pub ocr_confidence: f64,
    pub detection_confidence: f64,
    pub bbox: BBox,
}

/// One parking slot classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDetection {
    /// "occupied", "empty", or any other model class
    pub class: String,
    pub confidence: f64,
    pub bbox: BBox,
}

/// OCR text fragment for one plate region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrFragment {
    pub text: String,
    pub confidence: f64,
}

/// Plate region located by the detector, with its OCR fragments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateRegion {
    pub bbox: BBox,
    pub detection_confidence: f64,
    #[serde(default)]
    pub fragments: Vec<OcrFragment>,
}

/// Response of POST /v1/plates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatesResponse {
    pub success: bool,
    #[serde(default)]
    pub plates: Vec<PlateRegion>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Raw slot prediction (centre-format box)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotPrediction {
    pub class: String,
    pub confidence: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SlotPrediction {
    pub fn into_detection(self) -> SlotDetection {
        SlotDetection {
            bbox: BBox::from_center(self.x, self.y, self.width, self.height),
            class: self.class,
            confidence: self.confidence,
        }
    }
}

/// Response of POST /v1/slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotsResponse {
    pub success: bool,
    #[serde(default)]
    pub predictions: Vec<SlotPrediction>,
    #[serde(default)]
    pub error: Option<String>,
}
