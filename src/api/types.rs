//! Shared handler state.

use std::sync::Arc;

use crate::pipeline::{RadiologyClassifier, ReportEngine};
use crate::store::DocumentStore;

/// Everything the handlers need, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub engine: Arc<ReportEngine>,
    pub radiology: Arc<dyn RadiologyClassifier>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        engine: Arc<ReportEngine>,
        radiology: Arc<dyn RadiologyClassifier>,
    ) -> Self {
        Self {
            store,
            engine,
            radiology,
        }
    }
}
