//! Remote OCR client.
//!
//! Text recognition runs in a hosted model service; this client posts the
//! image and gets the recognized text back. Blocking on purpose: the
//! engine already runs on a `spawn_blocking` worker with its own timeout.

use std::io::Cursor;
use std::sync::OnceLock;
use std::time::Duration;

use image::{DynamicImage, ImageOutputFormat, RgbImage};
use serde::Deserialize;
use tracing::debug;

use super::types::OcrEngine;
use super::ReportError;

#[derive(Deserialize)]
struct OcrResponse {
    text: String,
}

pub struct RemoteOcr {
    endpoint: String,
    timeout: Duration,
    // Built on first use. A blocking client must never be constructed on
    // an async runtime thread; first use happens on the blocking worker.
    client: OnceLock<reqwest::blocking::Client>,
}

impl RemoteOcr {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, ReportError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let built = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        Ok(self.client.get_or_init(|| built))
    }

    fn encode_png(image: &RgbImage) -> Result<Vec<u8>, ReportError> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
        Ok(bytes)
    }
}

impl OcrEngine for RemoteOcr {
    fn recognize_lines(&self, image: &RgbImage) -> Result<Vec<String>, ReportError> {
        let png = Self::encode_png(image)?;
        debug!(endpoint = %self.endpoint, bytes = png.len(), "Posting image for OCR");

        let response = self
            .client()?
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(png)
            .send()?;

        if !response.status().is_success() {
            return Err(ReportError::Ocr(format!(
                "OCR service returned {}",
                response.status()
            )));
        }

        let body: OcrResponse = response.json()?;
        Ok(body.text.lines().map(str::to_string).collect())
    }
}
