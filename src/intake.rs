//! Intake routing: direct write for verified clinicians, reviewer queue
//! for everyone else.
//!
//! A queued submission lands in exactly one reviewer's queue, chosen at
//! intake time from the assignment mapping (or auto-assignment). Nothing
//! downstream ever has to search other queues for it.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assignment::{AssignmentError, ReviewerAssignments};
use crate::identity::IdentityDirectory;
use crate::models::{ClinicalRecord, PendingApproval, RecordPayload};
use crate::store::{layout, DocumentStore, StoreError};

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Subject not found: {0}")]
    SubjectNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AssignmentError> for IntakeError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::SubjectNotFound(id) => IntakeError::SubjectNotFound(id),
            AssignmentError::Store(err) => IntakeError::Store(err),
        }
    }
}

/// Where a submission ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Written straight into the subject's permanent records.
    Direct { timestamp_id: String },
    /// Parked in a reviewer's approval queue.
    Queued { assigned_to: String, doc_id: String },
}

pub struct IntakeRouter<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> IntakeRouter<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub fn route_new_record(
        &self,
        subject_id: &str,
        payload: RecordPayload,
        uploader_id: &str,
    ) -> Result<IntakeOutcome, IntakeError> {
        let ids = IdentityDirectory::new(self.store);
        if !ids.subject_exists(subject_id)? {
            return Err(IntakeError::SubjectNotFound(subject_id.to_string()));
        }

        let record_type = payload.record_type();
        let record = ClinicalRecord {
            subject_id: subject_id.to_string(),
            payload,
            added_by: uploader_id.to_string(),
            added_by_name: ids.resolve_display_name(uploader_id)?,
            patient_name: ids.subject_display_name(subject_id)?,
            created_at: Utc::now(),
        };

        if ids.is_verified_clinician(uploader_id)? {
            let timestamp_id = record.timestamp_id();
            let body = serde_json::to_value(&record).map_err(StoreError::from)?;
            self.store
                .put(&layout::record(subject_id, record_type, &timestamp_id), &body)?;

            // Facility uploads also land in the facility's own procedures
            // index. Second write is independent of the first; a failure
            // here leaves the record written but unindexed.
            if let Some(facility) = ids.facility_by_id(uploader_id)? {
                self.store.put(
                    &layout::facility_procedure(
                        &facility.id,
                        subject_id,
                        record_type,
                        &timestamp_id,
                    ),
                    &body,
                )?;
            }

            info!(subject_id, %record_type, uploader_id, "Record written directly");
            return Ok(IntakeOutcome::Direct { timestamp_id });
        }

        let assignments = ReviewerAssignments::new(self.store);
        let reviewer = match assignments.assigned_reviewer(subject_id)? {
            Some(reviewer) => reviewer,
            None => {
                let reviewer = assignments.auto_assign(subject_id)?;
                warn!(
                    subject_id,
                    reviewer = %reviewer.reviewer_id,
                    "No assigned reviewer, auto-assigned"
                );
                reviewer
            }
        };

        let pending = PendingApproval {
            subject_id: subject_id.to_string(),
            record_type,
            record,
            assigned_to: reviewer.reviewer_id.clone(),
            assigned_reviewer_name: reviewer.reviewer_name,
            submitted_at: Utc::now(),
        };
        let doc_id = Uuid::new_v4().simple().to_string();
        let body = serde_json::to_value(&pending).map_err(StoreError::from)?;
        self.store.put(
            &layout::pending_doc(&reviewer.reviewer_id, record_type, &doc_id),
            &body,
        )?;

        info!(
            subject_id,
            %record_type,
            assigned_to = %reviewer.reviewer_id,
            doc_id,
            "Submission queued for review"
        );
        Ok(IntakeOutcome::Queued {
            assigned_to: reviewer.reviewer_id,
            doc_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordType;
    use crate::store::SqliteStore;
    use chrono::NaiveDate;
    use serde_json::json;

    fn biomarker_payload() -> RecordPayload {
        RecordPayload::Biomarker {
            extracted_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            results: Vec::new(),
            image_url: None,
        }
    }

    fn seeded_store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store
            .put(
                &layout::user("29803123456789"),
                &json!({"full_name": "Ahmed Mohamed", "region": "cairo"}),
            )
            .unwrap();
        store
            .put(
                &layout::facilities().doc("fac-doc-1"),
                &json!({"facility_id": "FAC-1", "facility_name": "Cairo Central Lab",
                        "region": "cairo", "role": "laboratory"}),
            )
            .unwrap();
        store
            .put(
                &layout::doctor("dr.nour@clinic.eg"),
                &json!({"doctor_id": "DOC-7", "doctor_name": "Dr. Nour", "region": "cairo"}),
            )
            .unwrap();
        store
    }

    #[test]
    fn facility_upload_writes_record_and_procedure_index() {
        let store = seeded_store();
        let outcome = IntakeRouter::new(&store)
            .route_new_record("29803123456789", biomarker_payload(), "FAC-1")
            .unwrap();

        let IntakeOutcome::Direct { timestamp_id } = outcome else {
            panic!("expected direct write");
        };
        let record = store
            .get(&layout::record("29803123456789", RecordType::Biomarker, &timestamp_id))
            .unwrap()
            .unwrap();
        assert_eq!(record.body["added_by_name"], "Cairo Central Lab");
        assert_eq!(record.body["patient_name"], "Ahmed Mohamed");

        // Duplicate under the facility's own index, keyed by doc id.
        let indexed = store
            .get(&layout::facility_procedure(
                "fac-doc-1",
                "29803123456789",
                RecordType::Biomarker,
                &timestamp_id,
            ))
            .unwrap();
        assert!(indexed.is_some());
    }

    #[test]
    fn doctor_upload_is_direct_without_procedure_index() {
        let store = seeded_store();
        let outcome = IntakeRouter::new(&store)
            .route_new_record("29803123456789", biomarker_payload(), "DOC-7")
            .unwrap();
        assert!(matches!(outcome, IntakeOutcome::Direct { .. }));

        let procedures = layout::facilities()
            .doc("fac-doc-1")
            .sub("procedures")
            .doc("29803123456789");
        assert!(store.list_subcollections(&procedures).unwrap().is_empty());
    }

    #[test]
    fn patient_upload_queues_for_assigned_reviewer() {
        let store = seeded_store();
        store
            .put(
                &layout::assignment("29803123456789"),
                &json!({"reviewer_id": "dr.nour@clinic.eg", "reviewer_name": "Dr. Nour"}),
            )
            .unwrap();

        let outcome = IntakeRouter::new(&store)
            .route_new_record("29803123456789", biomarker_payload(), "29803123456789")
            .unwrap();
        let IntakeOutcome::Queued { assigned_to, doc_id } = outcome else {
            panic!("expected queued");
        };
        assert_eq!(assigned_to, "dr.nour@clinic.eg");

        let pending = store
            .get(&layout::pending_doc("dr.nour@clinic.eg", RecordType::Biomarker, &doc_id))
            .unwrap()
            .unwrap();
        assert_eq!(pending.body["record"]["added_by_name"], "Patient");
        assert_eq!(pending.body["assigned_reviewer_name"], "Dr. Nour");
    }

    #[test]
    fn unassigned_patient_upload_auto_assigns_and_queues_once() {
        let store = seeded_store();
        store
            .put(
                &layout::facilities().doc("hosp-1"),
                &json!({"facility_id": "FAC-9", "facility_name": "Cairo General",
                        "region": "cairo", "role": "hospital"}),
            )
            .unwrap();

        let outcome = IntakeRouter::new(&store)
            .route_new_record("29803123456789", biomarker_payload(), "29803123456789")
            .unwrap();
        let IntakeOutcome::Queued { assigned_to, doc_id } = outcome else {
            panic!("expected queued");
        };
        assert_eq!(assigned_to, "hosp-1");

        // Exactly one queue holds the submission.
        let hosp_queue = store
            .list(&layout::pending_queue("hosp-1", RecordType::Biomarker))
            .unwrap();
        assert_eq!(hosp_queue.len(), 1);
        assert_eq!(hosp_queue[0].id, doc_id);
        let doctor_queue = store
            .list(&layout::pending_queue("dr.nour@clinic.eg", RecordType::Biomarker))
            .unwrap();
        assert!(doctor_queue.is_empty());
    }

    #[test]
    fn unknown_subject_is_not_found() {
        let store = seeded_store();
        let err = IntakeRouter::new(&store)
            .route_new_record("nobody", biomarker_payload(), "FAC-1")
            .unwrap_err();
        assert!(matches!(err, IntakeError::SubjectNotFound(_)));
    }
}
