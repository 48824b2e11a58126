//! Identity resolution over the document store.
//!
//! Facilities and doctors are looked up by their indexed `facility_id` /
//! `doctor_id` attributes, never by document key — registration writes
//! the documents under independent keys. Display names degrade to
//! "Patient" for self-uploads rather than failing the write.

use serde_json::{json, Value};

use crate::store::{layout, Document, DocumentStore, StoreError};

pub struct IdentityDirectory<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> IdentityDirectory<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// The facility document whose `facility_id` attribute matches, if any.
    pub fn facility_by_id(&self, facility_id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .store
            .find_by_field(&layout::facilities(), "facility_id", &json!(facility_id))?
            .into_iter()
            .next())
    }

    /// The facility document whose `facility_name` attribute matches.
    pub fn facility_by_name(&self, name: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .store
            .find_by_field(&layout::facilities(), "facility_name", &json!(name))?
            .into_iter()
            .next())
    }

    pub fn is_facility(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.facility_by_id(id)?.is_some())
    }

    pub fn is_doctor(&self, id: &str) -> Result<bool, StoreError> {
        Ok(!self
            .store
            .find_by_field(&layout::doctors(), "doctor_id", &json!(id))?
            .is_empty())
    }

    /// Whether this uploader may write directly into a patient's record.
    pub fn is_verified_clinician(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.is_facility(id)? || self.is_doctor(id)?)
    }

    /// Display name for an uploader id: facility name, doctor name, or
    /// the literal "Patient" fallback for self-uploads.
    pub fn resolve_display_name(&self, id: &str) -> Result<String, StoreError> {
        if let Some(facility) = self.facility_by_id(id)? {
            return Ok(str_field(&facility.body, "facility_name", "Unknown Facility"));
        }
        let doctors = self
            .store
            .find_by_field(&layout::doctors(), "doctor_id", &json!(id))?;
        if let Some(doctor) = doctors.first() {
            return Ok(str_field(&doctor.body, "doctor_name", "Unknown Doctor"));
        }
        Ok("Patient".to_string())
    }

    /// Whether a subject exists at all.
    pub fn subject_exists(&self, subject_id: &str) -> Result<bool, StoreError> {
        Ok(self.store.get(&layout::user(subject_id))?.is_some())
    }

    /// Subject's region, trimmed and lowercased for comparison.
    /// Missing subject or missing region both come back as `None`.
    pub fn subject_region(&self, subject_id: &str) -> Result<Option<String>, StoreError> {
        let Some(user) = self.store.get(&layout::user(subject_id))? else {
            return Ok(None);
        };
        Ok(user
            .body
            .get("region")
            .and_then(Value::as_str)
            .map(|r| r.trim().to_lowercase())
            .filter(|r| !r.is_empty()))
    }

    pub fn subject_display_name(&self, subject_id: &str) -> Result<String, StoreError> {
        let Some(user) = self.store.get(&layout::user(subject_id))? else {
            return Ok("Unknown".to_string());
        };
        Ok(str_field(&user.body, "full_name", "Unknown"))
    }
}

fn str_field(body: &Value, field: &str, fallback: &str) -> String {
    body.get(field)
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}
