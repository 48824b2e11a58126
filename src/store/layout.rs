//! Collection layout — every path the workflow modules touch, in one
//! place. Mirrors the hosted document-database schema this service grew
//! up on: `users`, `facilities`, `doctors`, per-reviewer approval queues,
//! and per-subject clinical record subtrees.

use crate::models::RecordType;
use crate::store::DocPath;

pub fn users() -> DocPath {
    DocPath::collection("users")
}

pub fn user(subject_id: &str) -> DocPath {
    users().doc(subject_id)
}

pub fn facilities() -> DocPath {
    DocPath::collection("facilities")
}

pub fn doctors() -> DocPath {
    DocPath::collection("doctors")
}

pub fn doctor(doctor_key: &str) -> DocPath {
    doctors().doc(doctor_key)
}

/// Authoritative subject → reviewer mapping, one document per subject.
pub fn assignments() -> DocPath {
    DocPath::collection("reviewer_assignments")
}

pub fn assignment(subject_id: &str) -> DocPath {
    assignments().doc(subject_id)
}

/// Legacy per-doctor assigned-patient index, still consulted on lookup.
pub fn assigned_patients(doctor_key: &str) -> DocPath {
    doctor(doctor_key).sub("assigned_patients")
}

/// Operator alerts, e.g. assignment to a doctor nobody registered.
pub fn admin_notifications() -> DocPath {
    DocPath::collection("admin_notifications")
        .doc("unregistered_doctors")
        .sub("notifications")
}

/// A subject's permanent records of one type.
pub fn records(subject_id: &str, record_type: RecordType) -> DocPath {
    user(subject_id)
        .sub("clinical")
        .doc(record_type.as_str())
        .sub("records")
}

pub fn record(subject_id: &str, record_type: RecordType, timestamp_id: &str) -> DocPath {
    records(subject_id, record_type).doc(timestamp_id)
}

/// Root document of one reviewer's pending queues.
pub fn reviewer_queues(reviewer_id: &str) -> DocPath {
    DocPath::collection("pending_approvals").doc(reviewer_id)
}

pub fn pending_queue(reviewer_id: &str, record_type: RecordType) -> DocPath {
    reviewer_queues(reviewer_id).sub(record_type.as_str())
}

pub fn pending_doc(reviewer_id: &str, record_type: RecordType, doc_id: &str) -> DocPath {
    pending_queue(reviewer_id, record_type).doc(doc_id)
}

pub fn approved_doc(reviewer_id: &str, record_type: RecordType, doc_id: &str) -> DocPath {
    DocPath::collection("approved_approvals")
        .doc(reviewer_id)
        .sub(record_type.as_str())
        .doc(doc_id)
}

pub fn rejected_doc(reviewer_id: &str, record_type: RecordType, doc_id: &str) -> DocPath {
    DocPath::collection("rejected_approvals")
        .doc(reviewer_id)
        .sub(record_type.as_str())
        .doc(doc_id)
}

/// The uploading facility's own "procedures performed on this patient"
/// index. Written alongside the subject's record on the direct path.
pub fn facility_procedure(
    facility_doc_id: &str,
    subject_id: &str,
    record_type: RecordType,
    timestamp_id: &str,
) -> DocPath {
    facilities()
        .doc(facility_doc_id)
        .sub("procedures")
        .doc(subject_id)
        .sub(record_type.as_str())
        .doc(timestamp_id)
}
