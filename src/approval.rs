//! Approval state machine for queued submissions.
//!
//! `pending → approved` and `pending → rejected` are the only
//! transitions, both terminal. Approve writes the record, its audit copy,
//! and the queue deletion in one batch, so the store never holds a
//! record without its audit trail. A submission lives in exactly one
//! reviewer's queue, so the search space for a doc id is that reviewer's
//! per-type queues and nothing else.

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::models::{format_timestamp_id, PendingApproval, RecordType};
use crate::store::{layout, DocumentStore, StoreError, WriteBatch};

#[derive(Error, Debug)]
pub enum ApprovalError {
    #[error("Reviewer not found: {0}")]
    ReviewerNotFound(String),

    #[error("Pending approval not found: {0}")]
    PendingNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What an approve transition produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalReceipt {
    pub subject_id: String,
    pub record_type: RecordType,
    /// Approval-time id the permanent record was written under.
    pub timestamp_id: String,
}

/// One entry in a reviewer's queue listing.
#[derive(Debug, Clone)]
pub struct PendingItem {
    pub doc_id: String,
    pub approval: PendingApproval,
}

pub struct ApprovalQueue<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ApprovalQueue<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Canonical queue id for whatever key a reviewer presents: facility
    /// name, doctor key, a reviewer id from the assignment mapping, or
    /// the literal "admin". Anything else is unknown.
    pub fn resolve_reviewer_key(&self, key: &str) -> Result<String, ApprovalError> {
        let facilities = self.store.find_by_field(
            &layout::facilities(),
            "facility_name",
            &json!(key),
        )?;
        if let Some(facility) = facilities.first() {
            return Ok(facility.id.clone());
        }

        if self.store.get(&layout::doctor(key))?.is_some() {
            return Ok(key.to_string());
        }

        let mapped = self.store.find_by_field(
            &layout::assignments(),
            "reviewer_id",
            &json!(key),
        )?;
        if !mapped.is_empty() {
            return Ok(key.to_string());
        }

        if key == crate::assignment::ADMIN_REVIEWER {
            return Ok(key.to_string());
        }

        Err(ApprovalError::ReviewerNotFound(key.to_string()))
    }

    /// All submissions waiting on a reviewer, across record types.
    pub fn pending_for_reviewer(&self, key: &str) -> Result<Vec<PendingItem>, ApprovalError> {
        let reviewer = self.resolve_reviewer_key(key)?;
        let mut items = Vec::new();
        for record_type in RecordType::ALL {
            for doc in self.store.list(&layout::pending_queue(&reviewer, record_type))? {
                let approval: PendingApproval =
                    serde_json::from_value(doc.body).map_err(StoreError::from)?;
                items.push(PendingItem {
                    doc_id: doc.id,
                    approval,
                });
            }
        }
        Ok(items)
    }

    /// Approve a pending submission: the record enters the subject's
    /// permanent store keyed by the approval timestamp, the audit copy
    /// and the queue deletion ride the same batch.
    pub fn approve(&self, key: &str, doc_id: &str) -> Result<ApprovalReceipt, ApprovalError> {
        let reviewer = self.resolve_reviewer_key(key)?;
        let (record_type, mut approval) = self.find_pending(&reviewer, doc_id)?;

        let approved_at = Utc::now();
        let timestamp_id = format_timestamp_id(&approved_at);
        approval.record.created_at = approved_at;

        let record_body =
            serde_json::to_value(&approval.record).map_err(StoreError::from)?;
        let mut audit = serde_json::to_value(&approval).map_err(StoreError::from)?;
        audit["status"] = json!("approved");
        audit["resolved_at"] = json!(approved_at.to_rfc3339());

        let subject_id = approval.subject_id.clone();
        self.store.apply(
            WriteBatch::new()
                .put(
                    layout::record(&subject_id, record_type, &timestamp_id),
                    record_body,
                )
                .put(layout::approved_doc(&reviewer, record_type, doc_id), audit)
                .delete(layout::pending_doc(&reviewer, record_type, doc_id)),
        )?;

        info!(reviewer, doc_id, subject_id, %record_type, "Submission approved");
        Ok(ApprovalReceipt {
            subject_id,
            record_type,
            timestamp_id,
        })
    }

    /// Reject a pending submission. Audit copy only; the subject's
    /// records are never touched.
    pub fn reject(&self, key: &str, doc_id: &str) -> Result<(), ApprovalError> {
        let reviewer = self.resolve_reviewer_key(key)?;
        let (record_type, approval) = self.find_pending(&reviewer, doc_id)?;

        let mut audit = serde_json::to_value(&approval).map_err(StoreError::from)?;
        audit["status"] = json!("rejected");
        audit["resolved_at"] = json!(Utc::now().to_rfc3339());

        self.store.apply(
            WriteBatch::new()
                .put(layout::rejected_doc(&reviewer, record_type, doc_id), audit)
                .delete(layout::pending_doc(&reviewer, record_type, doc_id)),
        )?;

        info!(reviewer, doc_id, subject_id = %approval.subject_id, "Submission rejected");
        Ok(())
    }

    fn find_pending(
        &self,
        reviewer: &str,
        doc_id: &str,
    ) -> Result<(RecordType, PendingApproval), ApprovalError> {
        for record_type in RecordType::ALL {
            let path = layout::pending_doc(reviewer, record_type, doc_id);
            if let Some(doc) = self.store.get(&path)? {
                let approval: PendingApproval =
                    serde_json::from_value(doc.body).map_err(StoreError::from)?;
                return Ok((record_type, approval));
            }
        }
        Err(ApprovalError::PendingNotFound(doc_id.to_string()))
    }
}
