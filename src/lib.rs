//! medintake — document-intake and review-routing backend for a patient
//! medical-records service.
//!
//! Uploads flow through the extraction pipeline into the intake router:
//! verified clinicians write directly into a patient's records, everyone
//! else lands in a reviewer's approval queue. The approval state machine
//! moves queued submissions into the permanent store or the rejection
//! audit trail.

pub mod api;
pub mod approval;
pub mod assignment;
pub mod catalog;
pub mod config;
pub mod identity;
pub mod intake;
pub mod models;
pub mod pipeline;
pub mod records;
pub mod store;
pub mod text;
