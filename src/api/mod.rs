//! HTTP boundary: intake uploads, reviewer queues, record CRUD.
//!
//! Handlers translate workflow errors into status codes and JSON error
//! bodies; no workflow module knows HTTP exists.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use types::AppState;
