//! Image quality gate and enhancement.
//!
//! Small scans get one fixed enhancement pass before classification:
//! contrast ×1.5, sharpness ×2.0, brightness ×1.2, in that order. The
//! factors and the sub-1000px trigger match the capture profile this
//! service was tuned on; the pass is applied at most once per image.
//!
//! Also home to the pixel statistics the heuristic classifiers score on.

use image::{GrayImage, Luma, Rgb, RgbImage};
use tracing::debug;

use super::ReportError;

/// Either dimension below this triggers the enhancement pass.
pub const MIN_DIMENSION: u32 = 1000;

const CONTRAST_FACTOR: f32 = 1.5;
const SHARPNESS_FACTOR: f32 = 2.0;
const BRIGHTNESS_FACTOR: f32 = 1.2;

pub fn decode(bytes: &[u8]) -> Result<RgbImage, ReportError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

pub fn needs_enhancement(image: &RgbImage) -> bool {
    image.width() < MIN_DIMENSION || image.height() < MIN_DIMENSION
}

/// The fixed enhancement pass. Callers gate on `needs_enhancement` so it
/// runs exactly once for small scans and never for full-size ones.
pub fn enhance(image: &RgbImage) -> RgbImage {
    debug!(
        width = image.width(),
        height = image.height(),
        "Enhancing small scan before classification"
    );
    let contrasted = adjust_contrast(image, CONTRAST_FACTOR);
    let sharpened = sharpen(&contrasted, SHARPNESS_FACTOR);
    adjust_brightness(&sharpened, BRIGHTNESS_FACTOR)
}

/// Blend every channel toward the image's mean gray level.
/// Factor 1.0 is identity, >1.0 pushes pixels away from the mean.
fn adjust_contrast(image: &RgbImage, factor: f32) -> RgbImage {
    let mean = gray(image)
        .pixels()
        .map(|p| p.0[0] as f64)
        .sum::<f64>()
        / (image.width() as f64 * image.height() as f64).max(1.0);
    let mean = mean as f32;

    map_pixels(image, |c| mean + (c - mean) * factor)
}

fn adjust_brightness(image: &RgbImage, factor: f32) -> RgbImage {
    map_pixels(image, |c| c * factor)
}

/// Unsharp-style blend: push each pixel away from its smoothed
/// neighborhood. Factor 1.0 is identity, 0.0 is the smoothed image.
fn sharpen(image: &RgbImage, factor: f32) -> RgbImage {
    // 3x3 smoothing kernel, center-weighted, sums to 1.
    let kernel = [
        1.0 / 13.0,
        1.0 / 13.0,
        1.0 / 13.0,
        1.0 / 13.0,
        5.0 / 13.0,
        1.0 / 13.0,
        1.0 / 13.0,
        1.0 / 13.0,
        1.0 / 13.0,
    ];
    let smooth = image::imageops::filter3x3(image, &kernel);

    let mut out = RgbImage::new(image.width(), image.height());
    for (x, y, px) in image.enumerate_pixels() {
        let s = smooth.get_pixel(x, y);
        let mut blended = [0u8; 3];
        for ch in 0..3 {
            let v = s.0[ch] as f32 + (px.0[ch] as f32 - s.0[ch] as f32) * factor;
            blended[ch] = v.clamp(0.0, 255.0) as u8;
        }
        out.put_pixel(x, y, Rgb(blended));
    }
    out
}

fn map_pixels(image: &RgbImage, f: impl Fn(f32) -> f32) -> RgbImage {
    let mut out = RgbImage::new(image.width(), image.height());
    for (x, y, px) in image.enumerate_pixels() {
        let mapped = [
            f(px.0[0] as f32).clamp(0.0, 255.0) as u8,
            f(px.0[1] as f32).clamp(0.0, 255.0) as u8,
            f(px.0[2] as f32).clamp(0.0, 255.0) as u8,
        ];
        out.put_pixel(x, y, Rgb(mapped));
    }
    out
}

// ── Pixel statistics ─────────────────────────────────────────────

/// ITU-R 601 luma.
pub fn gray(image: &RgbImage) -> GrayImage {
    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, px) in image.enumerate_pixels() {
        let l = 0.299 * px.0[0] as f32 + 0.587 * px.0[1] as f32 + 0.114 * px.0[2] as f32;
        out.put_pixel(x, y, Luma([l.round().clamp(0.0, 255.0) as u8]));
    }
    out
}

/// Variance of the 4-neighbor Laplacian. Blur collapses it toward zero.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }
    let mut responses = Vec::with_capacity(((w - 2) * (h - 2)) as usize);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let c = gray.get_pixel(x, y).0[0] as f64;
            let n = gray.get_pixel(x, y - 1).0[0] as f64;
            let s = gray.get_pixel(x, y + 1).0[0] as f64;
            let e = gray.get_pixel(x + 1, y).0[0] as f64;
            let wv = gray.get_pixel(x - 1, y).0[0] as f64;
            responses.push(n + s + e + wv - 4.0 * c);
        }
    }
    variance(&responses)
}

/// Standard deviation of gray levels.
pub fn rms_contrast(gray: &GrayImage) -> f64 {
    let levels: Vec<f64> = gray.pixels().map(|p| p.0[0] as f64).collect();
    variance(&levels).sqrt()
}

/// Fraction of dark pixels. Printed text on paper sits in a narrow band;
/// photos and blank pages fall outside it.
pub fn ink_coverage(gray: &GrayImage) -> f64 {
    let total = gray.pixels().len();
    if total == 0 {
        return 0.0;
    }
    let dark = gray.pixels().filter(|p| p.0[0] < 128).count();
    dark as f64 / total as f64
}

/// Mean HSV-style saturation in [0, 1]. Documents and radiology films
/// are near zero, natural photos are not.
pub fn mean_saturation(image: &RgbImage) -> f64 {
    let total = image.pixels().len();
    if total == 0 {
        return 0.0;
    }
    let sum: f64 = image
        .pixels()
        .map(|px| {
            let max = px.0.iter().copied().max().unwrap_or(0) as f64;
            let min = px.0.iter().copied().min().unwrap_or(0) as f64;
            if max == 0.0 {
                0.0
            } else {
                (max - min) / max
            }
        })
        .sum();
    sum / total as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(width: u32, height: u32, level: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([level, level, level]))
    }

    fn checkerboard(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let level = if (x + y) % 2 == 0 { 0 } else { 255 };
            *px = Rgb([level, level, level]);
        }
        img
    }

    #[test]
    fn enhancement_triggers_on_either_small_dimension() {
        assert!(needs_enhancement(&flat(999, 2000, 128)));
        assert!(needs_enhancement(&flat(2000, 999, 128)));
        assert!(!needs_enhancement(&flat(1000, 1000, 128)));
    }

    #[test]
    fn contrast_pushes_away_from_mean() {
        let mut img = flat(4, 4, 100);
        img.put_pixel(0, 0, Rgb([200, 200, 200]));
        let out = adjust_contrast(&img, 1.5);
        // The bright outlier gets brighter, the rest get darker.
        assert!(out.get_pixel(0, 0).0[0] > 200);
        assert!(out.get_pixel(1, 1).0[0] < 100);
    }

    #[test]
    fn brightness_scales_and_clamps() {
        let out = adjust_brightness(&flat(2, 2, 220), 1.2);
        assert_eq!(out.get_pixel(0, 0).0[0], 255);
        let out = adjust_brightness(&flat(2, 2, 100), 1.2);
        assert_eq!(out.get_pixel(0, 0).0[0], 120);
    }

    #[test]
    fn sharpen_is_identity_at_factor_one() {
        let img = checkerboard(8, 8);
        let out = sharpen(&img, 1.0);
        assert_eq!(img, out);
    }

    #[test]
    fn laplacian_variance_separates_sharp_from_flat() {
        let sharp = laplacian_variance(&gray(&checkerboard(16, 16)));
        let blurry = laplacian_variance(&gray(&flat(16, 16, 128)));
        assert!(sharp > 1000.0);
        assert_eq!(blurry, 0.0);
    }

    #[test]
    fn saturation_zero_for_gray_images() {
        assert_eq!(mean_saturation(&flat(4, 4, 77)), 0.0);
        let red = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
        assert!(mean_saturation(&red) > 0.9);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode(b"not an image").is_err());
    }
}
