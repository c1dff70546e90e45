use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as Base64, Engine as _};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ModelErrorCode};
use crate::models::analysis::{ModelOutput, PreparedImage, UploadFormat};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8088";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const ANALYZE_PATH: &str = "/v1/analyze";

/// Source of raw per-category sub-metrics for one image.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn infer(&self, image: &PreparedImage) -> AppResult<ModelOutput>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("DESIGNLENS_MODEL_BASE_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let api_key = std::env::var("DESIGNLENS_MODEL_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let timeout_secs = match std::env::var("DESIGNLENS_MODEL_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(value) if value > 0 => value,
                _ => {
                    warn!(
                        target: "app::model",
                        value = %raw,
                        "ignoring invalid DESIGNLENS_MODEL_TIMEOUT_SECS"
                    );
                    DEFAULT_TIMEOUT_SECS
                }
            },
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    image: String,
    format: UploadFormat,
    mime_type: &'a str,
    width: u32,
    height: u32,
}

/// Calls a remote inference service once per image. Failures are surfaced
/// immediately; callers decide whether to try again.
pub struct HttpModelBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpModelBackend {
    pub fn new(config: &BackendConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("failed to build model HTTP client: {err}")))?;

        let endpoint = format!("{}{}", config.base_url.trim_end_matches('/'), ANALYZE_PATH);

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_http_error(status: StatusCode, correlation_id: &str) -> AppError {
        let (code, message) = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => (
                ModelErrorCode::Unauthorized,
                "model backend rejected the credentials".to_string(),
            ),
            StatusCode::TOO_MANY_REQUESTS => (
                ModelErrorCode::RateLimited,
                "model backend is rate limiting requests".to_string(),
            ),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => (
                ModelErrorCode::HttpTimeout,
                format!("model backend timed out (status {})", status.as_u16()),
            ),
            status if status.is_server_error() => (
                ModelErrorCode::BackendUnavailable,
                format!("model backend unavailable (status {})", status.as_u16()),
            ),
            StatusCode::BAD_REQUEST | StatusCode::PAYLOAD_TOO_LARGE | StatusCode::UNPROCESSABLE_ENTITY => (
                ModelErrorCode::InvalidRequest,
                format!("model backend rejected the image (status {})", status.as_u16()),
            ),
            StatusCode::NOT_FOUND => (
                ModelErrorCode::InvalidRequest,
                "model backend endpoint not found".to_string(),
            ),
            status => (
                ModelErrorCode::Unknown,
                format!("model backend returned status {}", status.as_u16()),
            ),
        };

        AppError::model_unavailable_with_correlation(code, message, Some(correlation_id))
    }

    fn error_from_reqwest(err: reqwest::Error, correlation_id: &str) -> AppError {
        if err.is_timeout() {
            AppError::model_unavailable_with_correlation(
                ModelErrorCode::HttpTimeout,
                "model backend request timed out",
                Some(correlation_id),
            )
        } else if err.is_connect() {
            AppError::model_unavailable_with_correlation(
                ModelErrorCode::BackendUnavailable,
                "could not connect to model backend",
                Some(correlation_id),
            )
        } else if let Some(status) = err.status() {
            Self::map_http_error(status, correlation_id)
        } else {
            AppError::model_unavailable_with_correlation(
                ModelErrorCode::Unknown,
                format!("model backend request failed: {err}"),
                Some(correlation_id),
            )
        }
    }
}

#[async_trait]
impl ModelBackend for HttpModelBackend {
    async fn infer(&self, image: &PreparedImage) -> AppResult<ModelOutput> {
        let correlation_id = Uuid::new_v4().to_string();
        let body = AnalyzeRequest {
            image: Base64.encode(&image.bytes),
            format: image.format,
            mime_type: image.format.mime_type(),
            width: image.width,
            height: image.height,
        };

        debug!(
            target: "app::model::http",
            correlation_id = %correlation_id,
            digest = %image.digest,
            bytes = image.bytes.len(),
            "invoking model backend"
        );

        let start = Instant::now();
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| Self::error_from_reqwest(err, &correlation_id))?;

        let status = response.status();
        let latency_ms = start.elapsed().as_millis();
        if !status.is_success() {
            warn!(
                target: "app::model::http",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                latency_ms,
                "model backend returned non-success status"
            );
            return Err(Self::map_http_error(status, &correlation_id));
        }

        let output: ModelOutput = response.json().await.map_err(|err| {
            AppError::model_unavailable_with_correlation(
                ModelErrorCode::InvalidResponse,
                format!("could not decode model backend response: {err}"),
                Some(correlation_id.as_str()),
            )
        })?;

        debug!(
            target: "app::model::http",
            correlation_id = %correlation_id,
            latency_ms,
            composition = output.composition.len(),
            color = output.color.len(),
            technique = output.technique.len(),
            "model backend responded"
        );

        Ok(output)
    }
}

pub mod testing {
    use super::*;

    /// Status mapping without a live request.
    pub fn map_http_error(status: StatusCode) -> AppError {
        HttpModelBackend::map_http_error(status, "test-correlation-id")
    }
}
