pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::db::DbPool;
use crate::error::AppResult;
use crate::services::analysis_service::AnalysisService;
use crate::services::history_store::SqliteHistoryStore;
use crate::services::model_backend::{BackendConfig, HttpModelBackend, ModelBackend};
use crate::services::settings_service::SettingsService;

pub use crate::services::learning_path::progress_stats;
pub use crate::services::progress_tracker::compute_metrics;
pub use crate::services::recommendations::recommend;
pub use crate::services::scoring::{aggregate, classify_level, score};

const DATABASE_FILE: &str = "designlens.sqlite";
const LOG_DIR: &str = "logs";

/// Wired services sharing one database.
#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    settings_service: Arc<SettingsService>,
    analysis_service: Arc<AnalysisService>,
}

impl AppState {
    /// Install logging under `data_dir/logs`, open (or create) the database
    /// and talk to the model backend configured through the environment.
    pub fn initialize(data_dir: &Path) -> AppResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        utils::logger::init_logging(&data_dir.join(LOG_DIR))?;
        let db_pool = DbPool::new(data_dir.join(DATABASE_FILE))?;
        let backend = Arc::new(HttpModelBackend::new(&BackendConfig::from_env())?);
        Self::with_backend(db_pool, backend)
    }

    pub fn with_backend(db_pool: DbPool, backend: Arc<dyn ModelBackend>) -> AppResult<Self> {
        let settings_service = Arc::new(SettingsService::new(db_pool.clone()));
        let store = Arc::new(SqliteHistoryStore::new(db_pool.clone()));
        // Warm the settings cache.
        settings_service.get()?;
        let analysis_service = Arc::new(AnalysisService::new(
            backend,
            store,
            Arc::clone(&settings_service),
        ));

        info!(target: "app::state", db_path = %db_pool.path().display(), "services ready");

        Ok(Self {
            db_pool,
            settings_service,
            analysis_service,
        })
    }

    pub fn db_pool(&self) -> &DbPool {
        &self.db_pool
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn analysis(&self) -> Arc<AnalysisService> {
        Arc::clone(&self.analysis_service)
    }
}
