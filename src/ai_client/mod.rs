//! AIClient - Inference Service Adapter
//!
//! ## Responsibilities
//!
//! - Plate recognition (locate plate regions, then pick the OCR reading)
//! - Parking slot classification
//! - Health probing of the inference service
//!
//! Stream sessions only see the `PlateRecognizer` / `SlotDetector` traits.
//! One `InferenceClient` is built at startup and shared by every session;
//! it holds no per-call mutable state.

mod plate_text;
mod types;

pub use plate_text::{best_reading, normalize_plate, round2, PlateText, MIN_PLATE_CHARS};
pub use types::*;

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

/// Plate recognition capability
#[async_trait]
pub trait PlateRecognizer: Send + Sync {
    /// Recognize every plate in an encoded image
    async fn recognize(&self, image: Vec<u8>) -> Result<Vec<PlateReading>>;
}

/// Parking slot detection capability
#[async_trait]
pub trait SlotDetector: Send + Sync {
    /// Classify every visible parking slot in an encoded image
    async fn detect_slots(&self, image: Vec<u8>) -> Result<Vec<SlotDetection>>;
}

/// HTTP client for the inference service
pub struct InferenceClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl InferenceClient {
    /// Create new client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Check inference service health
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn post_image<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        image: Vec<u8>,
    ) -> Result<T> {
        if image.is_empty() {
            return Err(Error::Validation("empty image".to_string()));
        }
        let url = format!("{}{}", self.base_url, path);
        let form = Form::new().part(
            "image",
            Part::bytes(image)
                .file_name("frame.jpg")
                .mime_str("image/jpeg")?,
        );

        let resp = self.client.post(&url).multipart(form).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api(format!(
                "inference request {} failed: {} - {}",
                path, status, body
            )));
        }

        Ok(resp.json().await?)
    }
}

/// Second stage of plate recognition: keep regions with a usable reading
pub fn readings_from_regions(regions: Vec<PlateRegion>) -> Vec<PlateReading> {
    regions
        .into_iter()
        .filter_map(|region| {
            let reading = best_reading(&region.fragments)?;
            Some(PlateReading {
                text: reading.text,
                raw_text: reading.raw_text,
                ocr_confidence: reading.confidence,
                detection_confidence: round2(region.detection_confidence),
                bbox: region.bbox,
            })
        })
        .collect()
}

#[async_trait]
impl PlateRecognizer for InferenceClient {
    async fn recognize(&self, image: Vec<u8>) -> Result<Vec<PlateReading>> {
        let resp: PlatesResponse = self.post_image("/v1/plates", image).await?;
        if !resp.success {
            return Err(Error::Api(
                resp.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }
        Ok(readings_from_regions(resp.plates))
    }
}

#[async_trait]
impl SlotDetector for InferenceClient {
    async fn detect_slots(&self, image: Vec<u8>) -> Result<Vec<SlotDetection>> {
        let resp: SlotsResponse = self.post_image("/v1/slots", image).await?;
        if !resp.success {
            return Err(Error::Api(
                resp.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }
        Ok(resp
            .predictions
            .into_iter()
            .map(SlotPrediction::into_detection)
            .collect())
    }
}
