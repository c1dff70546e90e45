use crate::db::repositories::analysis_repository::AnalysisRepository;
use crate::db::repositories::progress_repository::ProgressRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::analysis::DesignAnalysis;
use crate::models::progress::{ProgressEntry, ProgressFeedback};

/// Durable, append-only record of a user's analyses and progress.
pub trait HistoryStore: Send + Sync {
    fn append(&self, entry: &ProgressEntry) -> AppResult<()>;

    /// Entries for `user_id`, oldest first.
    fn list_for_user(&self, user_id: &str) -> AppResult<Vec<ProgressEntry>>;

    /// Attach feedback built from the newest entry for `resource_id`. Lookup,
    /// `build` and write share one transaction. Scores are left untouched.
    /// Fails with `NotFound` when the user has no such entry.
    fn attach_feedback(
        &self,
        user_id: &str,
        resource_id: &str,
        build: &dyn Fn(&ProgressEntry) -> ProgressFeedback,
    ) -> AppResult<ProgressEntry>;

    fn save_analysis(&self, analysis: &DesignAnalysis) -> AppResult<()>;

    fn find_analysis(&self, id: &str) -> AppResult<Option<DesignAnalysis>>;

    fn list_analyses(&self, user_id: &str) -> AppResult<Vec<DesignAnalysis>>;

    /// Persist a finished analysis together with its progress entry.
    fn record(&self, analysis: &DesignAnalysis, entry: &ProgressEntry) -> AppResult<()> {
        self.save_analysis(analysis)?;
        self.append(entry)
    }
}

#[derive(Clone)]
pub struct SqliteHistoryStore {
    db: DbPool,
}

impl SqliteHistoryStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn append(&self, entry: &ProgressEntry) -> AppResult<()> {
        self.db
            .with_connection(|conn| ProgressRepository::insert(conn, entry))
    }

    fn list_for_user(&self, user_id: &str) -> AppResult<Vec<ProgressEntry>> {
        self.db
            .with_connection(|conn| ProgressRepository::list_by_user(conn, user_id))
    }

    fn attach_feedback(
        &self,
        user_id: &str,
        resource_id: &str,
        build: &dyn Fn(&ProgressEntry) -> ProgressFeedback,
    ) -> AppResult<ProgressEntry> {
        self.db.with_transaction(|tx| {
            let mut entry =
                ProgressRepository::find_latest_for_resource(tx, user_id, resource_id)?
                    .ok_or_else(AppError::not_found)?;
            let feedback = build(&entry);
            ProgressRepository::update_feedback(tx, &entry.id, &feedback)?;
            entry.feedback = Some(feedback);
            Ok(entry)
        })
    }

    fn save_analysis(&self, analysis: &DesignAnalysis) -> AppResult<()> {
        self.db
            .with_connection(|conn| AnalysisRepository::insert(conn, analysis))
    }

    fn find_analysis(&self, id: &str) -> AppResult<Option<DesignAnalysis>> {
        self.db
            .with_connection(|conn| AnalysisRepository::find_by_id(conn, id))
    }

    fn list_analyses(&self, user_id: &str) -> AppResult<Vec<DesignAnalysis>> {
        self.db
            .with_connection(|conn| AnalysisRepository::list_by_user(conn, user_id))
    }

    fn record(&self, analysis: &DesignAnalysis, entry: &ProgressEntry) -> AppResult<()> {
        self.db.with_transaction(|tx| {
            AnalysisRepository::insert(tx, analysis)?;
            ProgressRepository::insert(tx, entry)
        })
    }
}
