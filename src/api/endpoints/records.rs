//! Clinical record CRUD endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::AppState;
use crate::models::{ClinicalRecord, ExtractedResult, RecordPayload, RecordType};
use crate::records::ClinicalRecords;

fn parse_record_type(raw: &str) -> Result<RecordType, ApiError> {
    raw.parse().map_err(ApiError::Invalid)
}

#[derive(Serialize)]
pub struct RecordResponse {
    pub timestamp_id: String,
    #[serde(flatten)]
    pub record: ClinicalRecord,
}

/// `GET /records/:subject_id/:record_type`
pub async fn list(
    State(state): State<AppState>,
    Path((subject_id, record_type)): Path<(String, String)>,
) -> Result<Json<Vec<RecordResponse>>, ApiError> {
    let record_type = parse_record_type(&record_type)?;
    let items = ClinicalRecords::new(state.store.as_ref()).list(&subject_id, record_type)?;
    Ok(Json(
        items
            .into_iter()
            .map(|item| RecordResponse {
                timestamp_id: item.timestamp_id,
                record: item.record,
            })
            .collect(),
    ))
}

#[derive(Deserialize)]
pub struct EditRequest {
    pub requester_id: String,
    pub payload: RecordPayload,
}

/// `PUT /records/:subject_id/:record_type/:timestamp_id`
pub async fn edit(
    State(state): State<AppState>,
    Path((subject_id, record_type, timestamp_id)): Path<(String, String, String)>,
    Json(request): Json<EditRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record_type = parse_record_type(&record_type)?;
    ClinicalRecords::new(state.store.as_ref()).edit(
        &subject_id,
        record_type,
        &timestamp_id,
        &request.requester_id,
        request.payload,
    )?;
    Ok(Json(serde_json::json!({"status": "updated"})))
}

#[derive(Deserialize)]
pub struct RequesterQuery {
    pub requester_id: String,
}

/// `DELETE /records/:subject_id/:record_type/:timestamp_id?requester_id=`
pub async fn delete(
    State(state): State<AppState>,
    Path((subject_id, record_type, timestamp_id)): Path<(String, String, String)>,
    Query(query): Query<RequesterQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record_type = parse_record_type(&record_type)?;
    ClinicalRecords::new(state.store.as_ref()).delete(
        &subject_id,
        record_type,
        &timestamp_id,
        &query.requester_id,
    )?;
    Ok(Json(serde_json::json!({"status": "deleted"})))
}

#[derive(Deserialize)]
pub struct AppendRequest {
    pub result: ExtractedResult,
}

#[derive(Serialize)]
pub struct AppendResponse {
    pub status: &'static str,
    pub timestamp_id: String,
}

/// `POST /records/:subject_id/biomarkers/results` — manual result entry
/// onto the subject's latest biomarker record.
pub async fn append_result(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Json(request): Json<AppendRequest>,
) -> Result<Json<AppendResponse>, ApiError> {
    let timestamp_id =
        ClinicalRecords::new(state.store.as_ref()).append_result(&subject_id, request.result)?;
    Ok(Json(AppendResponse {
        status: "appended",
        timestamp_id,
    }))
}

#[derive(Deserialize)]
pub struct EditResultsRequest {
    pub requester_id: String,
    pub results: Vec<ExtractedResult>,
}

/// `PUT /records/:subject_id/biomarkers/:timestamp_id/results`
pub async fn edit_results(
    State(state): State<AppState>,
    Path((subject_id, timestamp_id)): Path<(String, String)>,
    Json(request): Json<EditResultsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    ClinicalRecords::new(state.store.as_ref()).edit_results(
        &subject_id,
        &timestamp_id,
        &request.requester_id,
        request.results,
    )?;
    Ok(Json(serde_json::json!({"status": "updated"})))
}
