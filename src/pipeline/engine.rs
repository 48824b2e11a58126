//! Report engine: one pass over an uploaded image, five stages, no retry.
//!
//! The engine never returns a Rust error to callers. Every failure mode,
//! including panics in model code and worker timeouts, collapses into a
//! `ReportEnvelope` with `error` set and `is_valid` false, so the intake
//! boundary has exactly one shape to translate.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::classify::VALIDITY_THRESHOLD;
use super::types::{OcrEngine, ReportClassifier, ReportEnvelope};
use super::{extract, patient_info, quality, ReportError};
use crate::catalog::Catalog;

/// Phrases that mark a report as medical when no catalog synonym hits.
const MEDICAL_KEYWORDS: &[&str] = &[
    "medical report",
    "lab results",
    "test results",
    "تقرير طبي",
    "نتائج التحليل",
    "مختبر",
    "تحليل",
];

pub const ERR_UNREADABLE: &str = "Image quality insufficient for reading";
pub const ERR_NOT_MEDICAL: &str = "No medical content detected";
pub const ERR_PROCESSING: &str = "Report processing failed";

pub struct ReportEngine {
    catalog: Arc<Catalog>,
    ocr: Arc<dyn OcrEngine>,
    classifier: Arc<dyn ReportClassifier>,
    timeout: Duration,
}

impl ReportEngine {
    pub fn new(
        catalog: Arc<Catalog>,
        ocr: Arc<dyn OcrEngine>,
        classifier: Arc<dyn ReportClassifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            ocr,
            classifier,
            timeout,
        }
    }

    /// One synchronous pass. Panics in model code are contained here.
    pub fn analyze(&self, image_bytes: &[u8]) -> ReportEnvelope {
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.analyze_inner(image_bytes)));
        match outcome {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(err)) => {
                warn!(error = %err, "Report pass failed");
                ReportEnvelope::failed(err.to_string())
            }
            Err(_) => {
                warn!("Report pass panicked");
                ReportEnvelope::failed(ERR_PROCESSING)
            }
        }
    }

    /// The async entry point: the pass runs on a blocking worker with a
    /// hard timeout. Used by the intake handlers.
    pub async fn analyze_async(self: Arc<Self>, image_bytes: Vec<u8>) -> ReportEnvelope {
        let timeout = self.timeout;
        let engine = self;
        let task =
            tokio::task::spawn_blocking(move || engine.analyze(&image_bytes));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(join_err)) => {
                warn!(error = %join_err, "Extraction worker failed");
                ReportEnvelope::failed(ReportError::Worker(join_err.to_string()).to_string())
            }
            Err(_) => {
                warn!(timeout_s = timeout.as_secs(), "Extraction timed out");
                ReportEnvelope::failed(ReportError::Timeout(timeout.as_secs()).to_string())
            }
        }
    }

    fn analyze_inner(&self, image_bytes: &[u8]) -> Result<ReportEnvelope, ReportError> {
        // Stage 1: decode and, for small scans, the one enhancement pass.
        let mut image = quality::decode(image_bytes)?;
        if quality::needs_enhancement(&image) {
            image = quality::enhance(&image);
        }

        // Stage 2: validity gate.
        let (validity, domain) = self.classifier.classify(&image)?;
        let is_valid = validity > VALIDITY_THRESHOLD;
        if !is_valid {
            debug!(validity, "Report rejected by validity gate");
            return Ok(ReportEnvelope {
                validity_score: Some(validity),
                domain_score: Some(domain),
                is_valid: false,
                is_medical: false,
                patient_info: None,
                results: Vec::new(),
                raw_text: None,
                error: Some(ERR_UNREADABLE.to_string()),
            });
        }

        // Stage 3: OCR.
        let lines = self.ocr.recognize_lines(&image)?;
        let raw_text = lines.join("\n");

        // Stage 4: domain check over the recognized text.
        if !self.looks_medical(&raw_text) {
            debug!("Report rejected by domain check");
            return Ok(ReportEnvelope {
                validity_score: Some(validity),
                domain_score: Some(domain),
                is_valid: true,
                is_medical: false,
                patient_info: None,
                results: Vec::new(),
                raw_text: Some(raw_text),
                error: Some(ERR_NOT_MEDICAL.to_string()),
            });
        }

        // Stage 5: structure.
        let patient = patient_info::extract(&raw_text);
        let results = extract::extract_results(&self.catalog, &lines);
        info!(
            results = results.len(),
            patient = %patient.name,
            "Report structured"
        );

        Ok(ReportEnvelope {
            validity_score: Some(validity),
            domain_score: Some(domain),
            is_valid: true,
            is_medical: true,
            patient_info: Some(patient),
            results,
            raw_text: Some(raw_text),
            error: None,
        })
    }

    fn looks_medical(&self, raw_text: &str) -> bool {
        let lower = raw_text.to_lowercase();
        if MEDICAL_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return true;
        }
        self.catalog
            .all_synonyms_lowercased()
            .any(|(_, synonym)| lower.contains(synonym.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::mock::{FailingOcr, MockClassifier, MockOcr, PanickingClassifier};
    use image::{Rgb, RgbImage};

    fn png_bytes() -> Vec<u8> {
        let image = RgbImage::from_pixel(32, 32, Rgb([200, 200, 200]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        bytes
    }

    fn engine(ocr: Arc<dyn OcrEngine>, validity: f32) -> ReportEngine {
        ReportEngine::new(
            Arc::new(Catalog::builtin()),
            ocr,
            Arc::new(MockClassifier {
                validity,
                domain: 0.8,
            }),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn full_pass_structures_a_report() {
        let text = "Patient Name: John Smith\nDate: 03/15/2026\nHemoglobin\n13.5\n12 - 16 g/dL";
        let engine = engine(Arc::new(MockOcr::with_text(text)), 0.9);
        let envelope = engine.analyze(&png_bytes());

        assert!(envelope.is_valid);
        assert!(envelope.is_medical);
        assert_eq!(envelope.error, None);
        assert_eq!(envelope.results.len(), 1);
        let info = envelope.patient_info.unwrap();
        assert_eq!(info.name, "John Smith");
        assert_eq!(info.date.as_deref(), Some("2026-03-15"));
        assert!(envelope.raw_text.unwrap().contains("Hemoglobin"));
    }

    #[test]
    fn low_validity_is_terminal() {
        let engine = engine(Arc::new(MockOcr::with_text("anything")), 0.3);
        let envelope = engine.analyze(&png_bytes());

        assert!(!envelope.is_valid);
        assert_eq!(envelope.error.as_deref(), Some(ERR_UNREADABLE));
        assert!(envelope.results.is_empty());
        assert_eq!(envelope.raw_text, None);
        assert_eq!(envelope.validity_score, Some(0.3));
    }

    #[test]
    fn threshold_is_strictly_greater_than() {
        let engine = engine(Arc::new(MockOcr::with_text("anything")), VALIDITY_THRESHOLD);
        assert!(!engine.analyze(&png_bytes()).is_valid);
    }

    #[test]
    fn non_medical_text_is_terminal_but_keeps_raw_text() {
        let engine = engine(
            Arc::new(MockOcr::with_text("holiday photo\nsunset over water")),
            0.9,
        );
        let envelope = engine.analyze(&png_bytes());

        assert!(envelope.is_valid);
        assert!(!envelope.is_medical);
        assert_eq!(envelope.error.as_deref(), Some(ERR_NOT_MEDICAL));
        assert!(envelope.raw_text.is_some());
        assert!(envelope.results.is_empty());
    }

    #[test]
    fn keyword_alone_marks_medical() {
        let engine = engine(Arc::new(MockOcr::with_text("MEDICAL REPORT\nno tests here")), 0.9);
        let envelope = engine.analyze(&png_bytes());
        assert!(envelope.is_medical);
        assert!(envelope.results.is_empty());
    }

    #[test]
    fn undecodable_image_fails_soft() {
        let engine = engine(Arc::new(MockOcr::with_text("x")), 0.9);
        let envelope = engine.analyze(b"not an image");
        assert!(!envelope.is_valid);
        assert!(envelope.error.is_some());
    }

    #[test]
    fn ocr_failure_fails_soft() {
        let engine = engine(Arc::new(FailingOcr), 0.9);
        let envelope = engine.analyze(&png_bytes());
        assert!(!envelope.is_valid);
        assert!(envelope.error.unwrap().contains("OCR failed"));
    }

    #[test]
    fn classifier_panic_is_contained() {
        let engine = ReportEngine::new(
            Arc::new(Catalog::builtin()),
            Arc::new(MockOcr::with_text("x")),
            Arc::new(PanickingClassifier),
            Duration::from_secs(30),
        );
        let envelope = engine.analyze(&png_bytes());
        assert!(!envelope.is_valid);
        assert_eq!(envelope.error.as_deref(), Some(ERR_PROCESSING));
    }

    struct SleepyOcr;

    impl OcrEngine for SleepyOcr {
        fn recognize_lines(&self, _image: &RgbImage) -> Result<Vec<String>, ReportError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(vec!["medical report".to_string()])
        }
    }

    #[tokio::test]
    async fn worker_timeout_fails_soft() {
        let engine = Arc::new(ReportEngine::new(
            Arc::new(Catalog::builtin()),
            Arc::new(SleepyOcr),
            Arc::new(MockClassifier {
                validity: 0.9,
                domain: 0.8,
            }),
            Duration::from_millis(20),
        ));
        let envelope = engine.clone().analyze_async(png_bytes()).await;
        assert!(!envelope.is_valid);
        assert!(envelope.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn async_pass_matches_sync_pass() {
        let engine = Arc::new(engine(
            Arc::new(MockOcr::with_text("Glucose\n105\n70 - 110 mg/dL")),
            0.9,
        ));
        let envelope = engine.clone().analyze_async(png_bytes()).await;
        assert!(envelope.is_medical);
        assert_eq!(envelope.results.len(), 1);
    }
}
