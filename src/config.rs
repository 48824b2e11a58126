//! Server configuration from the environment.

use std::path::PathBuf;
use std::time::Duration;

pub const APP_NAME: &str = "medintake";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "info,medintake=debug".to_string()
}

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path (MEDINTAKE_DB_PATH).
    pub db_path: PathBuf,
    /// Listen address (MEDINTAKE_BIND).
    pub bind: String,
    /// OCR service endpoint (MEDINTAKE_OCR_URL).
    pub ocr_url: String,
    /// Hard cap on one extraction pass (MEDINTAKE_EXTRACTION_TIMEOUT_S).
    pub extraction_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let db_path = std::env::var("MEDINTAKE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("medintake.db"));
        let bind = std::env::var("MEDINTAKE_BIND")
            .unwrap_or_else(|_| "127.0.0.1:8700".to_string());
        let ocr_url = std::env::var("MEDINTAKE_OCR_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8800/ocr".to_string());
        let extraction_timeout = std::env::var("MEDINTAKE_EXTRACTION_TIMEOUT_S")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Self {
            db_path,
            bind,
            ocr_url,
            extraction_timeout,
        }
    }
}
