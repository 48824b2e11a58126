use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use medintake::api::{api_router, AppState};
use medintake::catalog::Catalog;
use medintake::config::{self, Config};
use medintake::pipeline::{
    HeuristicRadiologyClassifier, HeuristicReportClassifier, RemoteOcr, ReportEngine,
};
use medintake::store::SqliteStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let cfg = Config::from_env();
    tracing::info!(version = config::APP_VERSION, db = %cfg.db_path.display(), "medintake starting");

    let store = Arc::new(SqliteStore::open(&cfg.db_path)?);
    let catalog = Arc::new(Catalog::builtin());
    let ocr = Arc::new(RemoteOcr::new(cfg.ocr_url.clone(), cfg.extraction_timeout));
    let engine = Arc::new(ReportEngine::new(
        catalog,
        ocr,
        Arc::new(HeuristicReportClassifier::default()),
        cfg.extraction_timeout,
    ));
    let state = AppState::new(store, engine, Arc::new(HeuristicRadiologyClassifier::default()));

    let listener = tokio::net::TcpListener::bind(&cfg.bind).await?;
    tracing::info!(addr = %cfg.bind, "API listening");
    axum::serve(listener, api_router(state)).await?;
    Ok(())
}
