// Rejections and failure paths: nothing may be persisted when a step fails.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use designlens_lib::db::DbPool;
use designlens_lib::error::{AppError, AppResult, ErrorKind, ModelErrorCode};
use designlens_lib::models::analysis::{CategoryMetrics, DesignUpload, ModelOutput, PreparedImage};
use designlens_lib::models::feedback::FeedbackInput;
use designlens_lib::models::settings::ScoringConfigUpdate;
use designlens_lib::services::model_backend::ModelBackend;
use designlens_lib::AppState;
use image::{DynamicImage, ImageFormat, RgbImage};
use tempfile::{tempdir, TempDir};

enum Behaviour {
    Fail,
    Return(ModelOutput),
}

struct StubBackend(Behaviour);

#[async_trait]
impl ModelBackend for StubBackend {
    async fn infer(&self, _image: &PreparedImage) -> AppResult<ModelOutput> {
        match &self.0 {
            Behaviour::Fail => Err(AppError::model_unavailable_with_correlation(
                ModelErrorCode::BackendUnavailable,
                "backend offline",
                Some("corr-42"),
            )),
            Behaviour::Return(output) => Ok(output.clone()),
        }
    }
}

fn healthy_output() -> ModelOutput {
    ModelOutput {
        composition: CategoryMetrics::new().with("balance", 0.7),
        color: CategoryMetrics::new().with("harmony", 0.7),
        technique: CategoryMetrics::new().with("precision", 0.7),
    }
}

fn setup(behaviour: Behaviour) -> (AppState, TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("errors.sqlite")).expect("db pool");
    let state = AppState::with_backend(pool, Arc::new(StubBackend(behaviour))).expect("state");
    (state, dir)
}

fn png_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::new(3, 3));
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("encode png");
    cursor.into_inner()
}

fn upload(bytes: Vec<u8>) -> DesignUpload {
    DesignUpload {
        user_id: "learner".to_string(),
        resource_id: Some("resource-1".to_string()),
        file_name: "upload.bin".to_string(),
        bytes,
    }
}

fn assert_nothing_persisted(state: &AppState) {
    let service = state.analysis();
    assert!(service.list_analyses("learner").unwrap().is_empty());
    assert_eq!(service.learning_metrics("learner").unwrap().total_resources, 0);
}

#[tokio::test]
async fn empty_upload_is_rejected() {
    let (state, _dir) = setup(Behaviour::Return(healthy_output()));
    let err = state.analysis().analyze(upload(Vec::new())).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_nothing_persisted(&state);
}

#[tokio::test]
async fn unsupported_format_is_rejected() {
    let (state, _dir) = setup(Behaviour::Return(healthy_output()));

    let err = state
        .analysis()
        .analyze(upload(b"%PDF-1.7 not an image".to_vec()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    // Recognizable BMP magic, but not an accepted upload format.
    let mut bmp = b"BM".to_vec();
    bmp.extend_from_slice(&[0u8; 64]);
    let err = state.analysis().analyze(upload(bmp)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert_nothing_persisted(&state);
}

#[tokio::test]
async fn truncated_header_is_rejected() {
    let (state, _dir) = setup(Behaviour::Return(healthy_output()));
    let mut bytes = png_bytes();
    bytes.truncate(12);

    let err = state.analysis().analyze(upload(bytes)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let (state, _dir) = setup(Behaviour::Return(healthy_output()));
    let bytes = png_bytes();
    state
        .settings()
        .update(ScoringConfigUpdate {
            max_upload_bytes: Some(bytes.len() - 1),
            ..Default::default()
        })
        .unwrap();

    let err = state.analysis().analyze(upload(bytes)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.input_details().is_some());
    assert_nothing_persisted(&state);
}

#[tokio::test]
async fn blank_user_is_rejected() {
    let (state, _dir) = setup(Behaviour::Return(healthy_output()));
    let mut request = upload(png_bytes());
    request.user_id = "   ".to_string();

    let err = state.analysis().analyze(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn backend_failure_persists_nothing() {
    let (state, _dir) = setup(Behaviour::Fail);

    let err = state.analysis().analyze(upload(png_bytes())).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
    assert_eq!(err.model_code(), Some(ModelErrorCode::BackendUnavailable));
    assert_eq!(err.model_correlation_id(), Some("corr-42"));
    assert_nothing_persisted(&state);
}

#[tokio::test]
async fn empty_category_from_backend_is_invalid_input() {
    let mut output = healthy_output();
    output.technique = CategoryMetrics::new();
    let (state, _dir) = setup(Behaviour::Return(output));

    let err = state.analysis().analyze(upload(png_bytes())).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_nothing_persisted(&state);
}

#[tokio::test]
async fn out_of_range_metric_is_not_clamped() {
    let mut output = healthy_output();
    output.color.insert("harmony", 1.4);
    let (state, _dir) = setup(Behaviour::Return(output));

    let err = state.analysis().analyze(upload(png_bytes())).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_nothing_persisted(&state);
}

#[test]
fn feedback_for_unknown_resource_is_not_found() {
    let (state, _dir) = setup(Behaviour::Return(healthy_output()));
    let err = state
        .analysis()
        .submit_feedback(FeedbackInput {
            user_id: "learner".into(),
            resource_id: "never-analyzed".into(),
            rating: 4,
            comments: None,
            strengths: vec![],
            improvements: vec![],
            tags: vec![],
            learning_context: None,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn feedback_rating_out_of_range_is_invalid() {
    let (state, _dir) = setup(Behaviour::Return(healthy_output()));
    let err = state
        .analysis()
        .submit_feedback(FeedbackInput {
            user_id: "learner".into(),
            resource_id: "resource-1".into(),
            rating: 6,
            comments: None,
            strengths: vec![],
            improvements: vec![],
            tags: vec![],
            learning_context: None,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn missing_analysis_is_not_found() {
    let (state, _dir) = setup(Behaviour::Return(healthy_output()));
    let err = state.analysis().get_analysis("missing").unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}
