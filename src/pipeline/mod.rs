//! Report extraction pipeline: image quality gate, validity
//! classification, OCR, medical-domain check, patient info, and the
//! sliding-window test extractor.
//!
//! `ReportEngine` runs the stages in one pass with no retry. Model-bound
//! stages (classification, OCR) sit behind trait seams so tests swap in
//! deterministic mocks and deployments swap in real models.

pub mod classify;
pub mod engine;
pub mod extract;
pub mod ocr;
pub mod patient_info;
pub mod quality;
pub mod types;

pub use classify::{HeuristicRadiologyClassifier, HeuristicReportClassifier, VALIDITY_THRESHOLD};
pub use engine::ReportEngine;
pub use ocr::RemoteOcr;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Image decoding failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("OCR transport error: {0}")]
    OcrTransport(#[from] reqwest::Error),

    #[error("Extraction timed out after {0}s")]
    Timeout(u64),

    #[error("Extraction worker failed: {0}")]
    Worker(String),
}
