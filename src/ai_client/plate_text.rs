//! Plate text cleanup and OCR reading selection

use super::types::OcrFragment;

/// Minimum alphanumeric characters for a usable fragment
pub const MIN_PLATE_CHARS: usize = 3;

/// Mean confidence a combined reading needs to beat the single best fragment
const COMBINE_MIN_CONFIDENCE: f64 = 0.3;

/// Chosen reading for one plate region
#[derive(Debug, Clone, PartialEq)]
pub struct PlateText {
    pub text: String,
    pub raw_text: String,
    pub confidence: f64,
}

/// Uppercase and keep only `A-Z0-9`
pub fn normalize_plate(text: &str) -> String {
    text.chars()
        .flat_map(char::to_uppercase)
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pick the reading for a region from its OCR fragments.
///
/// Plates split across several text lines come back as several fragments;
/// their concatenation wins over the best single fragment when it is longer
/// and the fragments agree with reasonable confidence.
pub fn best_reading(fragments: &[OcrFragment]) -> Option<PlateText> {
    let valid: Vec<PlateText> = fragments
        .iter()
        .filter_map(|f| {
            let text = normalize_plate(&f.text);
            (text.len() >= MIN_PLATE_CHARS).then(|| PlateText {
                text,
                raw_text: f.text.clone(),
                confidence: f.confidence,
            })
        })
        .collect();

    let mut best = valid
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))?
        .clone();

    if valid.len() > 1 {
        let combined_text: String = valid.iter().map(|p| p.text.as_str()).collect();
        let avg_conf = valid.iter().map(|p| p.confidence).sum::<f64>() / valid.len() as f64;
        if combined_text.len() > best.text.len() && avg_conf > COMBINE_MIN_CONFIDENCE {
            best = PlateText {
                text: combined_text,
                raw_text: valid
                    .iter()
                    .map(|p| p.raw_text.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
                confidence: avg_conf,
            };
        }
    }

    best.confidence = round2(best.confidence);
    Some(best)
}
