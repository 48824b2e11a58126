//! Heuristic validity and domain classifiers.
//!
//! Pixel-statistics scorers behind the same traits a learned model would
//! implement. The weights are plain struct fields fixed at construction,
//! so a deployment can tune them without touching the scoring code.

use image::RgbImage;
use tracing::debug;

use super::quality;
use super::types::{RadiologyClassifier, RadiologyVerdict, ReportClassifier};
use super::ReportError;

/// Validity scores above this count as a readable report.
pub const VALIDITY_THRESHOLD: f32 = 0.5;

/// Scores document readability (sharpness + contrast) and document-ness
/// (ink coverage on an unsaturated page).
pub struct HeuristicReportClassifier {
    /// Laplacian variance at which sharpness scores 0.5.
    sharpness_midpoint: f64,
    /// RMS contrast at which the contrast score reaches 0.5.
    contrast_midpoint: f64,
}

impl Default for HeuristicReportClassifier {
    fn default() -> Self {
        Self {
            sharpness_midpoint: 100.0,
            contrast_midpoint: 30.0,
        }
    }
}

impl ReportClassifier for HeuristicReportClassifier {
    fn classify(&self, image: &RgbImage) -> Result<(f32, f32), ReportError> {
        let gray = quality::gray(image);

        let lap = quality::laplacian_variance(&gray);
        let sharpness = lap / (lap + self.sharpness_midpoint);
        let rms = quality::rms_contrast(&gray);
        let contrast = rms / (rms + self.contrast_midpoint);
        let validity = (0.5 * sharpness + 0.5 * contrast) as f32;

        // Printed reports: some ink, but a mostly light, unsaturated page.
        let ink = quality::ink_coverage(&gray);
        let ink_score = (ink / 0.05).min(1.0);
        let low_saturation = (1.0 - 2.0 * quality::mean_saturation(image)).clamp(0.0, 1.0);
        let domain = (ink_score * low_saturation) as f32;

        debug!(lap, rms, ink, validity, domain, "Report classification scores");
        Ok((validity.clamp(0.0, 1.0), domain.clamp(0.0, 1.0)))
    }
}

/// Scores whether an upload looks like a radiology film: near-grayscale,
/// dark background, with some bright structure.
pub struct HeuristicRadiologyClassifier {
    /// Confidence above this accepts the scan.
    acceptance_threshold: f32,
}

impl Default for HeuristicRadiologyClassifier {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.5,
        }
    }
}

impl RadiologyClassifier for HeuristicRadiologyClassifier {
    fn classify(&self, image_bytes: &[u8]) -> RadiologyVerdict {
        let image = match quality::decode(image_bytes) {
            Ok(image) => image,
            Err(err) => {
                debug!(error = %err, "Radiology classification failed to decode");
                return RadiologyVerdict::failed(err.to_string());
            }
        };

        let gray = quality::gray(&image);
        let low_saturation = (1.0 - 4.0 * quality::mean_saturation(&image)).clamp(0.0, 1.0);
        let dark_fraction = quality::ink_coverage(&gray);
        // Films are mostly dark; clip at 0.9 so all-black frames score low.
        let darkness = if dark_fraction > 0.9 {
            0.0
        } else {
            (dark_fraction / 0.5).min(1.0)
        };

        let confidence = (0.6 * low_saturation + 0.4 * darkness) as f32;
        RadiologyVerdict {
            is_valid: Some(confidence > self.acceptance_threshold),
            confidence: Some(confidence),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn text_like_page() -> RgbImage {
        // Light page with sharp dark strokes every few columns.
        let mut img = RgbImage::from_pixel(64, 64, Rgb([235, 235, 235]));
        for y in 8..56 {
            for x in (4..60).step_by(6) {
                img.put_pixel(x, y, Rgb([20, 20, 20]));
            }
        }
        img
    }

    #[test]
    fn sharp_printed_page_passes_both_gates() {
        let classifier = HeuristicReportClassifier::default();
        let (validity, domain) = classifier.classify(&text_like_page()).unwrap();
        assert!(validity > VALIDITY_THRESHOLD, "validity {validity}");
        assert!(domain > 0.5, "domain {domain}");
    }

    #[test]
    fn blank_page_fails_validity() {
        let classifier = HeuristicReportClassifier::default();
        let blank = RgbImage::from_pixel(64, 64, Rgb([240, 240, 240]));
        let (validity, domain) = classifier.classify(&blank).unwrap();
        assert!(validity < VALIDITY_THRESHOLD, "validity {validity}");
        assert_eq!(domain, 0.0);
    }

    #[test]
    fn saturated_photo_fails_domain() {
        let classifier = HeuristicReportClassifier::default();
        let mut photo = RgbImage::from_pixel(64, 64, Rgb([220, 40, 40]));
        for y in 0..64 {
            for x in (0..64).step_by(2) {
                photo.put_pixel(x, y, Rgb([40, 180, 40]));
            }
        }
        let (_, domain) = classifier.classify(&photo).unwrap();
        assert!(domain < 0.2, "domain {domain}");
    }

    fn encode_png(image: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image.clone())
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[test]
    fn grayscale_film_accepted() {
        let mut film = RgbImage::from_pixel(64, 64, Rgb([25, 25, 25]));
        for y in 16..48 {
            for x in 24..40 {
                film.put_pixel(x, y, Rgb([200, 200, 200]));
            }
        }
        let verdict = HeuristicRadiologyClassifier::default().classify(&encode_png(&film));
        assert_eq!(verdict.is_valid, Some(true));
        assert!(verdict.confidence.unwrap() > 0.5);
        assert!(verdict.error.is_none());
    }

    #[test]
    fn color_photo_rejected() {
        let photo = RgbImage::from_pixel(64, 64, Rgb([230, 120, 40]));
        let verdict = HeuristicRadiologyClassifier::default().classify(&encode_png(&photo));
        assert_eq!(verdict.is_valid, Some(false));
    }

    #[test]
    fn undecodable_bytes_fail_soft() {
        let verdict = HeuristicRadiologyClassifier::default().classify(b"junk");
        assert_eq!(verdict.is_valid, None);
        assert!(verdict.error.is_some());
    }
}
