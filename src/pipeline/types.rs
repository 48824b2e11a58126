//! Shared pipeline types and the model-bound trait seams.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::ReportError;
pub use crate::models::ExtractedResult;

/// Identity fields pulled out of the report header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    /// Extracted and cleaned name; "Unknown" when no pattern matched.
    pub name: String,
    /// ISO date when the printed date parsed, otherwise the raw match.
    pub date: Option<String>,
    /// 14-digit national id when one appears in the text.
    pub national_id: Option<String>,
}

/// Everything one engine pass produces. Terminal failures (bad image,
/// non-medical content, worker error) come back in the same shape with
/// `error` set rather than as a Rust error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEnvelope {
    pub validity_score: Option<f32>,
    pub domain_score: Option<f32>,
    pub is_valid: bool,
    pub is_medical: bool,
    pub patient_info: Option<PatientInfo>,
    pub results: Vec<ExtractedResult>,
    pub raw_text: Option<String>,
    pub error: Option<String>,
}

impl ReportEnvelope {
    /// Terminal envelope for a pass that never produced usable output.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            validity_score: None,
            domain_score: None,
            is_valid: false,
            is_medical: false,
            patient_info: None,
            results: Vec::new(),
            raw_text: None,
            error: Some(error.into()),
        }
    }
}

/// Text recognition seam. Implementations return the recognized lines in
/// reading order; joining and windowing happen in the engine.
pub trait OcrEngine: Send + Sync {
    fn recognize_lines(&self, image: &RgbImage) -> Result<Vec<String>, ReportError>;
}

/// Report validity/domain scoring seam. Returns `(validity, domain)`
/// scores in [0, 1].
pub trait ReportClassifier: Send + Sync {
    fn classify(&self, image: &RgbImage) -> Result<(f32, f32), ReportError>;
}

/// Outcome of the radiology-specific gate. Internal failure surfaces as
/// `is_valid: None` plus an error message, never as a panic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiologyVerdict {
    pub is_valid: Option<bool>,
    pub confidence: Option<f32>,
    pub error: Option<String>,
}

impl RadiologyVerdict {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            is_valid: None,
            confidence: None,
            error: Some(error.into()),
        }
    }
}

/// Specialty gate for radiology uploads, independent of the report engine.
pub trait RadiologyClassifier: Send + Sync {
    fn classify(&self, image_bytes: &[u8]) -> RadiologyVerdict;
}
