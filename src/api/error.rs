//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::approval::ApprovalError;
use crate::assignment::AssignmentError;
use crate::intake::IntakeError;
use crate::records::RecordError;
use crate::store::StoreError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not authorized")]
    Unauthorized,
    #[error("Invalid submission: {0}")]
    Invalid(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::Unauthorized => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Not authorized".to_string(),
            ),
            ApiError::Invalid(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID",
                detail.clone(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::SubjectNotFound(id) => ApiError::NotFound(format!("Subject {id}")),
            IntakeError::Store(err) => err.into(),
        }
    }
}

impl From<AssignmentError> for ApiError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::SubjectNotFound(id) => ApiError::NotFound(format!("Subject {id}")),
            AssignmentError::Store(err) => err.into(),
        }
    }
}

impl From<ApprovalError> for ApiError {
    fn from(err: ApprovalError) -> Self {
        match err {
            ApprovalError::ReviewerNotFound(key) => ApiError::NotFound(format!("Reviewer {key}")),
            ApprovalError::PendingNotFound(id) => {
                ApiError::NotFound(format!("Pending approval {id}"))
            }
            ApprovalError::Store(err) => err.into(),
        }
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::NotFound(id) => ApiError::NotFound(format!("Record {id}")),
            RecordError::Unauthorized => ApiError::Unauthorized,
            RecordError::NotBiomarker => {
                ApiError::Invalid("Record is not a biomarker record".to_string())
            }
            RecordError::Store(err) => err.into(),
        }
    }
}
