// End-to-end flows through AppState with a scripted model backend.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use designlens_lib::db::DbPool;
use designlens_lib::error::AppResult;
use designlens_lib::models::analysis::{
    CategoryMetrics, DesignUpload, LearningLevel, ModelOutput, PreparedImage, UploadFormat,
};
use designlens_lib::models::feedback::{Difficulty, FeedbackInput, LearningContext, Sentiment};
use designlens_lib::models::recommendation::Priority;
use designlens_lib::models::settings::{OverallWeights, ScoringConfig, ScoringConfigUpdate};
use designlens_lib::services::model_backend::ModelBackend;
use designlens_lib::AppState;
use futures::future::join_all;
use image::{DynamicImage, ImageFormat, RgbImage};
use tempfile::{tempdir, TempDir};

struct ScriptedBackend {
    output: ModelOutput,
    calls: AtomicUsize,
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn infer(&self, image: &PreparedImage) -> AppResult<ModelOutput> {
        assert!(image.width > 0 && image.height > 0);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

fn model_output() -> ModelOutput {
    ModelOutput {
        composition: CategoryMetrics::new()
            .with("balance", 0.5)
            .with("typography", 0.3)
            .with("unity", 0.7),
        color: CategoryMetrics::new()
            .with("contrast", 0.8)
            .with("harmony", 0.9),
        technique: CategoryMetrics::new().with("precision", 0.2),
    }
}

fn setup() -> (AppState, Arc<ScriptedBackend>, TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("flow.sqlite")).expect("db pool");
    let backend = Arc::new(ScriptedBackend {
        output: model_output(),
        calls: AtomicUsize::new(0),
    });
    let state = AppState::with_backend(pool, backend.clone()).expect("state");
    (state, backend, dir)
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 40, 90])));
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, format).expect("encode image");
    cursor.into_inner()
}

fn upload(user_id: &str, resource_id: Option<&str>) -> DesignUpload {
    DesignUpload {
        user_id: user_id.to_string(),
        resource_id: resource_id.map(str::to_string),
        file_name: "poster.png".to_string(),
        bytes: encode(6, 4, ImageFormat::Png),
    }
}

#[tokio::test]
async fn analyze_scores_and_persists() {
    let (state, backend, _dir) = setup();
    let service = state.analysis();

    let analysis = service
        .analyze(upload("learner", Some("poster-1")))
        .await
        .expect("analysis");

    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert!((analysis.composition.score - 0.5).abs() < 1e-9);
    assert!((analysis.color.score - 0.85).abs() < 1e-9);
    assert!((analysis.technique.score - 0.2).abs() < 1e-9);
    assert!((analysis.overall.score - 0.515).abs() < 1e-9);
    assert_eq!(analysis.level, LearningLevel::Intermediate);
    assert_eq!(analysis.typography, Some(0.3));
    assert_eq!(analysis.resource_id, "poster-1");

    let priorities: Vec<(&str, Priority)> = analysis
        .recommendations
        .iter()
        .map(|r| (r.area.as_str(), r.priority))
        .collect();
    assert_eq!(
        priorities,
        vec![("composition", Priority::High), ("technique", Priority::Medium)]
    );

    let stored = service.get_analysis(&analysis.id).expect("stored analysis");
    assert_eq!(stored.id, analysis.id);
    assert_eq!(stored.level, analysis.level);
    assert_eq!(stored.recommendations, analysis.recommendations);
    assert_eq!(stored.overall.summary, analysis.overall.summary);
    assert!((stored.overall.score - analysis.overall.score).abs() < 1e-12);
    assert_eq!(service.list_analyses("learner").unwrap().len(), 1);

    let metrics = service.learning_metrics("learner").expect("metrics");
    assert_eq!(metrics.total_resources, 1);
    assert_eq!(metrics.completed_resources, 1);
    assert!((metrics.average_score - analysis.overall.score).abs() < 1e-9);
    assert_eq!(metrics.learning_trend.len(), 1);
    assert!((metrics.skill_levels["typography"] - 0.3).abs() < 1e-9);
}

#[tokio::test]
async fn resource_defaults_to_image_digest() {
    let (state, _backend, _dir) = setup();
    let service = state.analysis();

    let first = service.analyze(upload("learner", None)).await.unwrap();
    let second = service.analyze(upload("learner", Some("  "))).await.unwrap();

    assert_eq!(first.resource_id, first.image_digest);
    assert_eq!(second.resource_id, first.resource_id);
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn feedback_is_enriched_and_attached() {
    let (state, _backend, _dir) = setup();
    let service = state.analysis();
    service
        .analyze(upload("learner", Some("poster-1")))
        .await
        .expect("analysis");

    let entry = service
        .submit_feedback(FeedbackInput {
            user_id: "learner".into(),
            resource_id: "poster-1".into(),
            rating: 5,
            comments: Some("Great, clear layout".into()),
            strengths: vec!["color".into()],
            improvements: vec!["technique".into()],
            tags: vec!["poster".into()],
            learning_context: Some(LearningContext {
                difficulty: Difficulty::Appropriate,
                time_spent_seconds: 900,
                comprehension: 0.9,
                technical_issues: vec![],
            }),
        })
        .expect("feedback");

    let feedback = entry.feedback.expect("feedback stored");
    assert_eq!(feedback.sentiment, Some(Sentiment::Positive));
    assert_eq!(feedback.strengths, vec!["Color use and harmony".to_string()]);
    assert_eq!(
        feedback.improvements,
        vec!["technique - Suggestion: Repeat fundamental technique drills".to_string()]
    );
    assert_eq!(
        feedback.tags,
        vec![
            "poster".to_string(),
            "strong-color".to_string(),
            "technique-needs-work".to_string(),
        ]
    );

    let metrics = service.learning_metrics("learner").unwrap();
    assert_eq!(metrics.recent_feedback.len(), 1);
    assert_eq!(metrics.recent_feedback[0].resource_id, "poster-1");
}

#[tokio::test]
async fn concurrent_analyses_are_independent() {
    let (state, backend, _dir) = setup();
    let service = state.analysis();

    let runs = (0..8).map(|n| {
        let service = Arc::clone(&service);
        async move {
            service
                .analyze(upload("learner", Some(&format!("resource-{n}"))))
                .await
        }
    });
    let results = join_all(runs).await;

    let ids: HashSet<String> = results
        .into_iter()
        .map(|result| result.expect("analysis").id)
        .collect();
    assert_eq!(ids.len(), 8);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 8);

    let metrics = service.learning_metrics("learner").unwrap();
    assert_eq!(metrics.total_resources, 8);
    assert!(service.learning_metrics("someone-else").unwrap().learning_trend.is_empty());
}

#[tokio::test]
async fn updated_weights_apply_to_later_analyses() {
    let (state, _backend, _dir) = setup();
    state
        .settings()
        .update(ScoringConfigUpdate {
            weights: Some(OverallWeights {
                composition: 1.0,
                color: 0.0,
                technique: 0.0,
            }),
            ..Default::default()
        })
        .expect("update config");

    let analysis = state
        .analysis()
        .analyze(upload("learner", None))
        .await
        .unwrap();
    assert!((analysis.overall.score - 0.5).abs() < 1e-9);

    state.settings().reset().unwrap();
    let analysis = state
        .analysis()
        .analyze(upload("learner", None))
        .await
        .unwrap();
    assert!((analysis.overall.score - 0.515).abs() < 1e-9);
}

#[tokio::test]
async fn jpeg_uploads_are_accepted() {
    let (state, _backend, _dir) = setup();
    let image = state
        .analysis()
        .prepare_upload(&DesignUpload {
            user_id: "learner".into(),
            resource_id: None,
            file_name: "sketch.jpg".into(),
            bytes: encode(10, 7, ImageFormat::Jpeg),
        })
        .expect("jpeg accepted");

    assert_eq!(image.format, UploadFormat::Jpeg);
    assert_eq!((image.width, image.height), (10, 7));
}

#[tokio::test]
async fn settings_changes_reach_the_analysis_service() {
    let (state, _backend, _dir) = setup();
    let settings = state.settings();
    let service = state.analysis();

    let before = service.analyze(upload("learner", None)).await.unwrap();
    assert!((before.overall.score - 0.515).abs() < 1e-9);

    // Same service handle as before the update.
    settings
        .update(ScoringConfigUpdate {
            weights: Some(OverallWeights {
                composition: 0.0,
                color: 0.0,
                technique: 1.0,
            }),
            max_upload_bytes: Some(16),
            ..Default::default()
        })
        .expect("update config");

    let err = service.analyze(upload("learner", None)).await.unwrap_err();
    assert!(err.input_details().is_some());

    settings
        .update(ScoringConfigUpdate {
            max_upload_bytes: Some(1024 * 1024),
            ..Default::default()
        })
        .unwrap();
    let after = service.analyze(upload("learner", None)).await.unwrap();
    assert!((after.overall.score - 0.2).abs() < 1e-9);
    assert_eq!(after.level, LearningLevel::Beginner);
}

#[test]
fn initialize_installs_logging_under_data_dir() {
    let dir = tempdir().expect("temp dir");
    let data_dir = dir.path().join("data");

    let state = AppState::initialize(&data_dir).expect("initialize");

    assert!(data_dir.join("logs").is_dir());
    assert!(state.db_pool().path().starts_with(&data_dir));
    assert_eq!(state.settings().get().unwrap(), ScoringConfig::default());
}
