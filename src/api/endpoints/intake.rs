//! Intake upload endpoints: report images in, routed records out.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::api::error::ApiError;
use crate::api::types::AppState;
use crate::intake::{IntakeOutcome, IntakeRouter};
use crate::models::{ExtractedResult, RecordPayload};

#[derive(Serialize)]
pub struct IntakeResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    pub results: Vec<ExtractedResult>,
}

impl IntakeResponse {
    fn from_outcome(
        outcome: IntakeOutcome,
        patient_name: Option<String>,
        results: Vec<ExtractedResult>,
    ) -> Self {
        match outcome {
            IntakeOutcome::Direct { timestamp_id } => Self {
                status: "recorded",
                timestamp_id: Some(timestamp_id),
                assigned_to: None,
                doc_id: None,
                patient_name,
                results,
            },
            IntakeOutcome::Queued { assigned_to, doc_id } => Self {
                status: "pending_review",
                timestamp_id: None,
                assigned_to: Some(assigned_to),
                doc_id: Some(doc_id),
                patient_name,
                results,
            },
        }
    }
}

/// `POST /intake/:subject_id/biomarkers` — lab report image upload.
///
/// Runs the extraction engine; unreadable or non-medical uploads come
/// back 422 with the engine's reason.
pub async fn upload_biomarkers(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<IntakeResponse>, ApiError> {
    let upload = UploadFields::read(multipart).await?;
    let image = upload.require_image()?;
    let added_by = upload.require_text("added_by")?;

    let envelope = state.engine.clone().analyze_async(image).await;
    if let Some(error) = envelope.error {
        debug!(subject_id, error, "Biomarker upload rejected by engine");
        return Err(ApiError::Invalid(error));
    }

    let patient_name = envelope.patient_info.as_ref().map(|p| p.name.clone());
    let extracted_date = envelope
        .patient_info
        .as_ref()
        .and_then(|p| p.date.as_deref())
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive());

    let payload = RecordPayload::Biomarker {
        extracted_date,
        results: envelope.results.clone(),
        image_url: None,
    };
    let outcome =
        IntakeRouter::new(state.store.as_ref()).route_new_record(&subject_id, payload, &added_by)?;

    Ok(Json(IntakeResponse::from_outcome(
        outcome,
        patient_name,
        envelope.results,
    )))
}

/// `POST /intake/:subject_id/radiology` — scan image plus declared
/// metadata. The radiology gate rejects uploads it is confident are not
/// scans; a gate failure is recorded on the payload, not fatal.
pub async fn upload_radiology(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<IntakeResponse>, ApiError> {
    let upload = UploadFields::read(multipart).await?;
    let image = upload.require_image()?;
    let added_by = upload.require_text("added_by")?;
    let radiology_name = upload.require_text("radiology_name")?;
    let report_notes = upload.text("report_notes").unwrap_or_default();
    let date = upload
        .text("date")
        .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive());

    let classifier = state.radiology.clone();
    let verdict = tokio::task::spawn_blocking(move || classifier.classify(&image))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    if verdict.is_valid == Some(false) {
        return Err(ApiError::Invalid(
            "Image does not appear to be a radiology scan".to_string(),
        ));
    }

    let payload = RecordPayload::Radiology {
        radiology_name,
        date,
        report_notes,
        image_validity: verdict.is_valid,
        image_confidence: verdict.confidence,
        image_url: None,
    };
    let outcome =
        IntakeRouter::new(state.store.as_ref()).route_new_record(&subject_id, payload, &added_by)?;

    Ok(Json(IntakeResponse::from_outcome(outcome, None, Vec::new())))
}

/// Collected multipart fields: one image part, the rest text.
struct UploadFields {
    image: Option<Vec<u8>>,
    texts: Vec<(String, String)>,
}

impl UploadFields {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut image = None;
        let mut texts = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::Invalid(err.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::Invalid(err.to_string()))?;
                image = Some(bytes.to_vec());
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|err| ApiError::Invalid(err.to_string()))?;
                texts.push((name, value));
            }
        }
        Ok(Self { image, texts })
    }

    fn require_image(&self) -> Result<Vec<u8>, ApiError> {
        self.image
            .clone()
            .ok_or_else(|| ApiError::Invalid("Missing image part".to_string()))
    }

    fn text(&self, name: &str) -> Option<String> {
        self.texts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn require_text(&self, name: &str) -> Result<String, ApiError> {
        self.text(name)
            .ok_or_else(|| ApiError::Invalid(format!("Missing field: {name}")))
    }
}
