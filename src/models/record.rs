//! Clinical record types shared across intake, approval, and the API.
//!
//! Every record that reaches a patient's permanent store is a
//! `ClinicalRecord`: a shared envelope (subject, uploader, timestamps)
//! around a tagged, type-specific payload. Pending submissions wrap the
//! same record together with reviewer-queue metadata.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One structured test result extracted from a report image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedResult {
    /// Canonical test id from the catalog.
    pub item: String,
    /// Numeric value as printed (decimal separator normalized to ".").
    pub value: String,
    pub unit: String,
    pub reference_range: String,
    /// Out-of-range flag. `None` means indeterminate — the value or range
    /// did not parse — which callers must not collapse into "normal".
    pub flag: Option<bool>,
}

/// The record types the intake router and approval queue handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Allergy,
    Diagnosis,
    Medication,
    Biomarker,
    Radiology,
    VitalSigns,
}

impl RecordType {
    /// All types, in the order queue searches iterate them.
    pub const ALL: [RecordType; 6] = [
        RecordType::Biomarker,
        RecordType::Radiology,
        RecordType::Allergy,
        RecordType::Diagnosis,
        RecordType::Medication,
        RecordType::VitalSigns,
    ];

    /// Collection name in the document store.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Allergy => "allergies",
            RecordType::Diagnosis => "diagnoses",
            RecordType::Medication => "medications",
            RecordType::Biomarker => "bloodbiomarkers",
            RecordType::Radiology => "radiology",
            RecordType::VitalSigns => "measurements",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allergies" => Ok(RecordType::Allergy),
            "diagnoses" => Ok(RecordType::Diagnosis),
            "medications" => Ok(RecordType::Medication),
            "bloodbiomarkers" => Ok(RecordType::Biomarker),
            "radiology" => Ok(RecordType::Radiology),
            "measurements" => Ok(RecordType::VitalSigns),
            other => Err(format!("Unknown record type: {other}")),
        }
    }
}

/// Type-specific record payload. Tagged so stored documents stay
/// self-describing instead of untyped key-value maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordPayload {
    Biomarker {
        /// Collection date extracted from the report, or the intake date.
        extracted_date: NaiveDate,
        results: Vec<ExtractedResult>,
        image_url: Option<String>,
    },
    Radiology {
        radiology_name: String,
        date: NaiveDate,
        report_notes: String,
        image_validity: Option<bool>,
        image_confidence: Option<f32>,
        image_url: Option<String>,
    },
    Allergy {
        substance: String,
        reaction: Option<String>,
        severity: Option<String>,
    },
    Diagnosis {
        condition: String,
        diagnosed_on: Option<NaiveDate>,
        notes: Option<String>,
    },
    Medication {
        name: String,
        dosage: Option<String>,
        frequency: Option<String>,
    },
    VitalSigns {
        systolic: Option<f64>,
        diastolic: Option<f64>,
        heart_rate: Option<f64>,
        temperature_c: Option<f64>,
        measured_on: Option<NaiveDate>,
    },
}

impl RecordPayload {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordPayload::Biomarker { .. } => RecordType::Biomarker,
            RecordPayload::Radiology { .. } => RecordType::Radiology,
            RecordPayload::Allergy { .. } => RecordType::Allergy,
            RecordPayload::Diagnosis { .. } => RecordType::Diagnosis,
            RecordPayload::Medication { .. } => RecordType::Medication,
            RecordPayload::VitalSigns { .. } => RecordType::VitalSigns,
        }
    }
}

/// A record in (or bound for) a patient's permanent store.
///
/// Immutable once created, except for explicit edits and deletes gated by
/// `added_by` equality in `records::`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalRecord {
    pub subject_id: String,
    pub payload: RecordPayload,
    /// Uploader identity key (facility id, doctor id, or patient id).
    pub added_by: String,
    /// Display name resolved at write time; "Patient" for self-uploads.
    pub added_by_name: String,
    pub patient_name: String,
    pub created_at: DateTime<Utc>,
}

impl ClinicalRecord {
    /// Timestamp-derived document id, second resolution, sortable.
    pub fn timestamp_id(&self) -> String {
        format_timestamp_id(&self.created_at)
    }
}

/// `YYYY-MM-DD HH:MM:SS` — the id format used for permanent record
/// documents and the facility procedure index.
pub fn format_timestamp_id(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// A submission waiting in a reviewer's approval queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingApproval {
    pub subject_id: String,
    pub record_type: RecordType,
    pub record: ClinicalRecord,
    /// Canonical reviewer queue id this submission lives under.
    pub assigned_to: String,
    /// Display name of a previously assigned doctor, when one existed.
    pub assigned_reviewer_name: Option<String>,
    pub submitted_at: DateTime<Utc>,
}
