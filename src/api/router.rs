//! Intake API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//!
//! NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use crate::api::endpoints;
use crate::api::types::AppState;

/// Maximum upload size. Phone photos of reports stay well under this.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/intake/:subject_id/biomarkers",
            post(endpoints::intake::upload_biomarkers),
        )
        .route(
            "/intake/:subject_id/radiology",
            post(endpoints::intake::upload_radiology),
        )
        .route("/pending/:reviewer", get(endpoints::pending::list))
        .route(
            "/pending/:reviewer/:doc_id/approve",
            post(endpoints::pending::approve),
        )
        .route(
            "/pending/:reviewer/:doc_id/reject",
            post(endpoints::pending::reject),
        )
        .route(
            "/records/:subject_id/biomarkers/results",
            post(endpoints::records::append_result),
        )
        .route(
            "/records/:subject_id/biomarkers/:timestamp_id/results",
            put(endpoints::records::edit_results),
        )
        .route(
            "/records/:subject_id/:record_type",
            get(endpoints::records::list),
        )
        .route(
            "/records/:subject_id/:record_type/:timestamp_id",
            put(endpoints::records::edit).delete(endpoints::records::delete),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
