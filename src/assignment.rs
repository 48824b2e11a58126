//! Reviewer assignment — who reviews a subject's queued submissions.
//!
//! The subject → reviewer mapping in `reviewer_assignments` is
//! authoritative: one document per subject, updated in a single write, so
//! a pending submission can only ever land in one reviewer's queue. The
//! legacy per-doctor `assigned_patients` index is still consulted on
//! lookup for data written before the mapping existed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::identity::IdentityDirectory;
use crate::store::{layout, DocumentStore, StoreError, WriteBatch};

#[derive(Error, Debug)]
pub enum AssignmentError {
    #[error("Subject not found: {0}")]
    SubjectNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The reviewer fallback of last resort.
pub const ADMIN_REVIEWER: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerKind {
    Facility,
    Doctor,
    Admin,
}

/// A resolved reviewer: the queue id submissions are filed under, plus a
/// display name when one is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedReviewer {
    pub reviewer_id: String,
    pub reviewer_name: Option<String>,
    pub kind: ReviewerKind,
}

pub struct ReviewerAssignments<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ReviewerAssignments<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// The reviewer already responsible for this subject, if any.
    ///
    /// Authoritative mapping first, then the legacy registered-doctor
    /// assigned-patient subcollections.
    pub fn assigned_reviewer(
        &self,
        subject_id: &str,
    ) -> Result<Option<AssignedReviewer>, StoreError> {
        if let Some(doc) = self.store.get(&layout::assignment(subject_id))? {
            let reviewer_id = str_field(&doc.body, "reviewer_id");
            if let Some(reviewer_id) = reviewer_id {
                return Ok(Some(AssignedReviewer {
                    reviewer_id,
                    reviewer_name: str_field(&doc.body, "reviewer_name"),
                    kind: ReviewerKind::Doctor,
                }));
            }
        }

        for doctor in self.store.list(&layout::doctors())? {
            let assigned = layout::assigned_patients(&doctor.id).doc(subject_id);
            if self.store.get(&assigned)?.is_some() {
                return Ok(Some(AssignedReviewer {
                    reviewer_id: doctor.id.clone(),
                    reviewer_name: str_field(&doctor.body, "doctor_name"),
                    kind: ReviewerKind::Doctor,
                }));
            }
        }

        Ok(None)
    }

    /// Record a doctor assignment for a subject. One write to the
    /// authoritative mapping; an unregistered doctor additionally raises
    /// an admin notification instead of silently vanishing.
    pub fn assign(
        &self,
        subject_id: &str,
        doctor_email: &str,
        doctor_name: Option<&str>,
    ) -> Result<AssignedReviewer, AssignmentError> {
        let registered = self.store.get(&layout::doctor(doctor_email))?.is_some();

        let mut batch = WriteBatch::new().put(
            layout::assignment(subject_id),
            json!({
                "subject_id": subject_id,
                "reviewer_id": doctor_email,
                "reviewer_name": doctor_name,
                "registered": registered,
                "assigned_at": Utc::now().to_rfc3339(),
            }),
        );

        if !registered {
            let notification_id = Uuid::new_v4().simple().to_string();
            batch = batch.put(
                layout::admin_notifications().doc(&notification_id),
                json!({
                    "subject_id": subject_id,
                    "doctor_email": doctor_email,
                    "message": format!(
                        "Patient {subject_id} was assigned to unregistered doctor {doctor_email}"
                    ),
                    "timestamp": Utc::now().to_rfc3339(),
                }),
            );
            tracing::warn!(subject_id, doctor_email, "Assignment to unregistered doctor");
        }

        self.store.apply(batch)?;

        Ok(AssignedReviewer {
            reviewer_id: doctor_email.to_string(),
            reviewer_name: doctor_name.map(str::to_string),
            kind: ReviewerKind::Doctor,
        })
    }

    /// Pick a reviewer for a subject with no existing assignment.
    ///
    /// A hospital-role facility in the subject's region strictly precedes
    /// any doctor in the region; "admin" is the final fallback. Region
    /// comparison is case-insensitive and whitespace-trimmed, with no
    /// partial matching.
    pub fn auto_assign(&self, subject_id: &str) -> Result<AssignedReviewer, AssignmentError> {
        let ids = IdentityDirectory::new(self.store);
        if !ids.subject_exists(subject_id)? {
            return Err(AssignmentError::SubjectNotFound(subject_id.to_string()));
        }
        let region = ids.subject_region(subject_id)?;

        if let Some(region) = region {
            for facility in self.store.list(&layout::facilities())? {
                if normalized_field(&facility.body, "region").as_deref() == Some(&region)
                    && facility.body.get("role").and_then(Value::as_str) == Some("hospital")
                {
                    return Ok(AssignedReviewer {
                        reviewer_id: facility.id.clone(),
                        reviewer_name: str_field(&facility.body, "facility_name"),
                        kind: ReviewerKind::Facility,
                    });
                }
            }

            for doctor in self.store.list(&layout::doctors())? {
                if normalized_field(&doctor.body, "region").as_deref() == Some(&region) {
                    return Ok(AssignedReviewer {
                        reviewer_id: doctor.id.clone(),
                        reviewer_name: str_field(&doctor.body, "doctor_name"),
                        kind: ReviewerKind::Doctor,
                    });
                }
            }
        }

        Ok(AssignedReviewer {
            reviewer_id: ADMIN_REVIEWER.to_string(),
            reviewer_name: None,
            kind: ReviewerKind::Admin,
        })
    }
}

fn str_field(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn normalized_field(body: &Value, field: &str) -> Option<String> {
    str_field(body, field).map(|s| s.trim().to_lowercase())
}
