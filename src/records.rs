//! Read and maintain a subject's permanent clinical records.
//!
//! Edits and deletes are gated on the requesting identity matching the
//! record's `added_by`. The error for a mismatch carries no owner
//! information.

use thiserror::Error;
use tracing::info;

use crate::models::{ClinicalRecord, ExtractedResult, RecordPayload, RecordType};
use crate::store::{layout, DocumentStore, StoreError};

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Not authorized to modify this record")]
    Unauthorized,

    #[error("Record is not a biomarker record")]
    NotBiomarker,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One stored record plus the timestamp id it lives under.
#[derive(Debug, Clone)]
pub struct RecordItem {
    pub timestamp_id: String,
    pub record: ClinicalRecord,
}

pub struct ClinicalRecords<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ClinicalRecords<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// All records of one type, oldest first (timestamp ids sort).
    pub fn list(
        &self,
        subject_id: &str,
        record_type: RecordType,
    ) -> Result<Vec<RecordItem>, RecordError> {
        let docs = self.store.list(&layout::records(subject_id, record_type))?;
        let mut items = Vec::with_capacity(docs.len());
        for doc in docs {
            let record: ClinicalRecord =
                serde_json::from_value(doc.body).map_err(StoreError::from)?;
            items.push(RecordItem {
                timestamp_id: doc.id,
                record,
            });
        }
        Ok(items)
    }

    pub fn get(
        &self,
        subject_id: &str,
        record_type: RecordType,
        timestamp_id: &str,
    ) -> Result<ClinicalRecord, RecordError> {
        let doc = self
            .store
            .get(&layout::record(subject_id, record_type, timestamp_id))?
            .ok_or_else(|| RecordError::NotFound(timestamp_id.to_string()))?;
        Ok(serde_json::from_value(doc.body).map_err(StoreError::from)?)
    }

    /// Replace a record's payload. Only the identity that created the
    /// record may edit it; envelope fields stay as written.
    pub fn edit(
        &self,
        subject_id: &str,
        record_type: RecordType,
        timestamp_id: &str,
        requester_id: &str,
        payload: RecordPayload,
    ) -> Result<(), RecordError> {
        let mut record = self.get(subject_id, record_type, timestamp_id)?;
        if record.added_by != requester_id {
            return Err(RecordError::Unauthorized);
        }
        record.payload = payload;
        self.write_back(subject_id, record_type, timestamp_id, &record)?;
        info!(subject_id, %record_type, timestamp_id, "Record edited");
        Ok(())
    }

    pub fn delete(
        &self,
        subject_id: &str,
        record_type: RecordType,
        timestamp_id: &str,
        requester_id: &str,
    ) -> Result<(), RecordError> {
        let record = self.get(subject_id, record_type, timestamp_id)?;
        if record.added_by != requester_id {
            return Err(RecordError::Unauthorized);
        }
        self.store
            .delete(&layout::record(subject_id, record_type, timestamp_id))?;
        info!(subject_id, %record_type, timestamp_id, "Record deleted");
        Ok(())
    }

    /// Append one manually entered result to the subject's latest
    /// biomarker record.
    pub fn append_result(
        &self,
        subject_id: &str,
        result: ExtractedResult,
    ) -> Result<String, RecordError> {
        let mut items = self.list(subject_id, RecordType::Biomarker)?;
        let Some(latest) = items.pop() else {
            return Err(RecordError::NotFound("no biomarker records".to_string()));
        };

        let mut record = latest.record;
        match &mut record.payload {
            RecordPayload::Biomarker { results, .. } => results.push(result),
            _ => return Err(RecordError::NotBiomarker),
        }
        self.write_back(subject_id, RecordType::Biomarker, &latest.timestamp_id, &record)?;
        info!(subject_id, timestamp_id = %latest.timestamp_id, "Manual result appended");
        Ok(latest.timestamp_id)
    }

    /// Replace a biomarker record's result set in place, same ownership
    /// gate as `edit`.
    pub fn edit_results(
        &self,
        subject_id: &str,
        timestamp_id: &str,
        requester_id: &str,
        new_results: Vec<ExtractedResult>,
    ) -> Result<(), RecordError> {
        let mut record = self.get(subject_id, RecordType::Biomarker, timestamp_id)?;
        if record.added_by != requester_id {
            return Err(RecordError::Unauthorized);
        }
        match &mut record.payload {
            RecordPayload::Biomarker { results, .. } => *results = new_results,
            _ => return Err(RecordError::NotBiomarker),
        }
        self.write_back(subject_id, RecordType::Biomarker, timestamp_id, &record)?;
        Ok(())
    }

    fn write_back(
        &self,
        subject_id: &str,
        record_type: RecordType,
        timestamp_id: &str,
        record: &ClinicalRecord,
    ) -> Result<(), RecordError> {
        let body = serde_json::to_value(record).map_err(StoreError::from)?;
        self.store
            .put(&layout::record(subject_id, record_type, timestamp_id), &body)?;
        Ok(())
    }
}
