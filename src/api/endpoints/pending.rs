//! Reviewer queue endpoints.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::AppState;
use crate::approval::ApprovalQueue;
use crate::models::RecordPayload;

#[derive(Serialize)]
pub struct PendingResponse {
    pub doc_id: String,
    pub subject_id: String,
    pub record_type: String,
    pub patient_name: String,
    pub added_by_name: String,
    pub submitted_at: DateTime<Utc>,
    pub payload: RecordPayload,
}

/// `GET /pending/:reviewer` — everything waiting on one reviewer.
pub async fn list(
    State(state): State<AppState>,
    Path(reviewer): Path<String>,
) -> Result<Json<Vec<PendingResponse>>, ApiError> {
    let items = ApprovalQueue::new(state.store.as_ref()).pending_for_reviewer(&reviewer)?;
    let responses = items
        .into_iter()
        .map(|item| PendingResponse {
            doc_id: item.doc_id,
            subject_id: item.approval.subject_id,
            record_type: item.approval.record_type.to_string(),
            patient_name: item.approval.record.patient_name,
            added_by_name: item.approval.record.added_by_name,
            submitted_at: item.approval.submitted_at,
            payload: item.approval.record.payload,
        })
        .collect();
    Ok(Json(responses))
}

#[derive(Serialize)]
pub struct ApproveResponse {
    pub status: &'static str,
    pub subject_id: String,
    pub record_type: String,
    pub timestamp_id: String,
}

/// `POST /pending/:reviewer/:doc_id/approve`
pub async fn approve(
    State(state): State<AppState>,
    Path((reviewer, doc_id)): Path<(String, String)>,
) -> Result<Json<ApproveResponse>, ApiError> {
    let receipt = ApprovalQueue::new(state.store.as_ref()).approve(&reviewer, &doc_id)?;
    Ok(Json(ApproveResponse {
        status: "approved",
        subject_id: receipt.subject_id,
        record_type: receipt.record_type.to_string(),
        timestamp_id: receipt.timestamp_id,
    }))
}

#[derive(Serialize)]
pub struct RejectResponse {
    pub status: &'static str,
}

/// `POST /pending/:reviewer/:doc_id/reject`
pub async fn reject(
    State(state): State<AppState>,
    Path((reviewer, doc_id)): Path<(String, String)>,
) -> Result<Json<RejectResponse>, ApiError> {
    ApprovalQueue::new(state.store.as_ref()).reject(&reviewer, &doc_id)?;
    Ok(Json(RejectResponse { status: "rejected" }))
}
