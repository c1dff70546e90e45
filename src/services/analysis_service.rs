use std::io::Cursor;
use std::sync::Arc;

use chrono::Utc;
use image::{ImageFormat, ImageReader};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::repositories::progress_repository::format_timestamp;
use crate::error::{AppError, AppResult};
use crate::models::analysis::{
    Category, DesignAnalysis, DesignUpload, ModelOutput, PreparedImage, UploadFormat,
};
use crate::models::feedback::FeedbackInput;
use crate::models::progress::{CompletionStatus, EntryScores, LearningMetrics, ProgressEntry};
use crate::models::settings::ScoringConfig;
use crate::services::feedback_analyzer;
use crate::services::history_store::HistoryStore;
use crate::services::model_backend::ModelBackend;
use crate::services::progress_tracker::compute_metrics;
use crate::services::recommendations::recommend_with;
use crate::services::scoring::{aggregate_with, classify_level_with, score};
use crate::services::settings_service::SettingsService;
use crate::utils::digest::content_digest;

/// Composition sub-metric that doubles as the typography skill signal.
const TYPOGRAPHY_METRIC: &str = "typography";

/// Drives one upload through inference, scoring and persistence.
pub struct AnalysisService {
    backend: Arc<dyn ModelBackend>,
    store: Arc<dyn HistoryStore>,
    settings: Arc<SettingsService>,
}

impl AnalysisService {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        store: Arc<dyn HistoryStore>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            backend,
            store,
            settings,
        }
    }

    /// Validate an upload and read enough of it to describe it to a backend.
    pub fn prepare_upload(&self, upload: &DesignUpload) -> AppResult<PreparedImage> {
        let max_bytes = self.settings.get()?.max_upload_bytes;

        if upload.user_id.trim().is_empty() {
            return Err(AppError::invalid_input("user id is required"));
        }
        if upload.bytes.is_empty() {
            return Err(AppError::invalid_input_with_details(
                "uploaded file is empty",
                json!({ "fileName": upload.file_name }),
            ));
        }
        if upload.bytes.len() > max_bytes {
            return Err(AppError::invalid_input_with_details(
                "uploaded file exceeds the size limit",
                json!({
                    "fileName": upload.file_name,
                    "size": upload.bytes.len(),
                    "limit": max_bytes,
                }),
            ));
        }

        let detected = image::guess_format(&upload.bytes).map_err(|err| {
            AppError::invalid_input_with_details(
                "unrecognized image format",
                json!({ "fileName": upload.file_name, "reason": err.to_string() }),
            )
        })?;
        let (format, image_format) = match detected {
            ImageFormat::Jpeg => (UploadFormat::Jpeg, ImageFormat::Jpeg),
            ImageFormat::Png => (UploadFormat::Png, ImageFormat::Png),
            ImageFormat::Gif => (UploadFormat::Gif, ImageFormat::Gif),
            other => {
                return Err(AppError::invalid_input_with_details(
                    "only JPEG, PNG and GIF uploads are accepted",
                    json!({ "fileName": upload.file_name, "detected": format!("{other:?}") }),
                ))
            }
        };

        let (width, height) = ImageReader::with_format(Cursor::new(&upload.bytes), image_format)
            .into_dimensions()
            .map_err(|err| {
                AppError::invalid_input_with_details(
                    "image header could not be read",
                    json!({ "fileName": upload.file_name, "reason": err.to_string() }),
                )
            })?;

        Ok(PreparedImage {
            format,
            width,
            height,
            digest: content_digest(&upload.bytes),
            bytes: upload.bytes.clone(),
        })
    }

    pub async fn analyze(&self, upload: DesignUpload) -> AppResult<DesignAnalysis> {
        let image = self.prepare_upload(&upload)?;
        // One config snapshot per analysis.
        let config = self.settings.get()?;

        debug!(
            target: "app::analysis",
            user_id = %upload.user_id,
            digest = %image.digest,
            format = image.format.mime_type(),
            width = image.width,
            height = image.height,
            "upload accepted"
        );

        let output = self.backend.infer(&image).await.map_err(|err| {
            warn!(
                target: "app::analysis",
                user_id = %upload.user_id,
                digest = %image.digest,
                error = %err,
                "model inference failed"
            );
            err
        })?;

        let recorded_at = Utc::now();
        let resource_id = upload
            .resource_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| image.digest.clone());

        let analysis = build_analysis(
            &config,
            &output,
            AnalysisIdentity {
                id: Uuid::new_v4().to_string(),
                user_id: upload.user_id.clone(),
                resource_id,
                image_digest: image.digest.clone(),
                created_at: format_timestamp(&recorded_at),
            },
        )?;

        let entry = ProgressEntry {
            id: Uuid::new_v4().to_string(),
            user_id: analysis.user_id.clone(),
            resource_id: analysis.resource_id.clone(),
            recorded_at,
            completion_status: CompletionStatus::Completed,
            time_spent_seconds: 0,
            results: Some(EntryScores::from(&analysis)),
            feedback: None,
        };

        let analysis = self.persist(analysis, entry).await?;

        info!(
            target: "app::analysis",
            analysis_id = %analysis.id,
            user_id = %analysis.user_id,
            overall = analysis.overall.score,
            level = %analysis.level,
            recommendations = analysis.recommendations.len(),
            "design analysis recorded"
        );

        Ok(analysis)
    }

    // SQLite work stays off the async executor.
    async fn persist(
        &self,
        analysis: DesignAnalysis,
        entry: ProgressEntry,
    ) -> AppResult<DesignAnalysis> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || -> AppResult<DesignAnalysis> {
            store.record(&analysis, &entry)?;
            Ok(analysis)
        })
        .await
        .map_err(|err| AppError::other(format!("persistence task failed: {err}")))?
    }

    pub fn learning_metrics(&self, user_id: &str) -> AppResult<LearningMetrics> {
        if user_id.trim().is_empty() {
            return Err(AppError::invalid_input("user id is required"));
        }
        let history = self.store.list_for_user(user_id)?;
        Ok(compute_metrics(&history))
    }

    /// Enrich and attach feedback to the learner's newest entry for the resource.
    pub fn submit_feedback(&self, input: FeedbackInput) -> AppResult<ProgressEntry> {
        feedback_analyzer::validate(&input)?;

        let entry = self.store.attach_feedback(
            &input.user_id,
            &input.resource_id,
            &|latest| feedback_analyzer::enrich(&input, latest.results.as_ref()),
        )?;

        info!(
            target: "app::analysis",
            entry_id = %entry.id,
            rating = input.rating,
            sentiment = ?entry.feedback.as_ref().and_then(|feedback| feedback.sentiment),
            "feedback attached"
        );
        Ok(entry)
    }

    pub fn get_analysis(&self, id: &str) -> AppResult<DesignAnalysis> {
        self.store
            .find_analysis(id)?
            .ok_or_else(AppError::not_found)
    }

    pub fn list_analyses(&self, user_id: &str) -> AppResult<Vec<DesignAnalysis>> {
        self.store.list_analyses(user_id)
    }
}

struct AnalysisIdentity {
    id: String,
    user_id: String,
    resource_id: String,
    image_digest: String,
    created_at: String,
}

fn build_analysis(
    config: &ScoringConfig,
    output: &ModelOutput,
    identity: AnalysisIdentity,
) -> AppResult<DesignAnalysis> {
    let composition = score(Category::Composition, output.metrics(Category::Composition))?;
    let color = score(Category::Color, output.metrics(Category::Color))?;
    let technique = score(Category::Technique, output.metrics(Category::Technique))?;

    let overall = aggregate_with(config, &composition, &color, &technique)?;
    let level = classify_level_with(&config.level_cutoffs, overall.score);
    let recommendations = recommend_with(&config.thresholds, output)?;

    Ok(DesignAnalysis {
        id: identity.id,
        user_id: identity.user_id,
        resource_id: identity.resource_id,
        image_digest: identity.image_digest,
        composition,
        color,
        technique,
        overall,
        level,
        recommendations,
        typography: output.composition.get(TYPOGRAPHY_METRIC),
        created_at: identity.created_at,
    })
}
