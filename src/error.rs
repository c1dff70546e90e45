use std::fmt;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

/// Coarse classification surfaced to callers that only need to branch on the
/// failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    ModelUnavailable,
    Persistence,
    NotFound,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorCode {
    NotConfigured,
    Unauthorized,
    HttpTimeout,
    RateLimited,
    InvalidResponse,
    InvalidRequest,
    BackendUnavailable,
    Unknown,
}

impl ModelErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelErrorCode::NotConfigured => "MODEL_NOT_CONFIGURED",
            ModelErrorCode::Unauthorized => "UNAUTHORIZED",
            ModelErrorCode::HttpTimeout => "HTTP_TIMEOUT",
            ModelErrorCode::RateLimited => "RATE_LIMITED",
            ModelErrorCode::InvalidResponse => "INVALID_RESPONSE",
            ModelErrorCode::InvalidRequest => "INVALID_REQUEST",
            ModelErrorCode::BackendUnavailable => "BACKEND_UNAVAILABLE",
            ModelErrorCode::Unknown => "UNKNOWN_MODEL_ERROR",
        }
    }
}

impl fmt::Display for ModelErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {message}")]
    InvalidInput {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("{message}")]
    ModelUnavailable {
        code: ModelErrorCode,
        message: String,
        correlation_id: Option<String>,
    },

    #[error("persistence error: {message}")]
    Persistence { message: String },

    #[error("record not found")]
    NotFound,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "invalid input");
        AppError::InvalidInput {
            message,
            details: None,
        }
    }

    pub fn invalid_input_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, details = %details, "invalid input with details");
        AppError::InvalidInput {
            message,
            details: Some(details),
        }
    }

    pub fn model_unavailable(code: ModelErrorCode, message: impl Into<String>) -> Self {
        Self::model_unavailable_with_correlation(code, message, None)
    }

    pub fn model_unavailable_with_correlation(
        code: ModelErrorCode,
        message: impl Into<String>,
        correlation_id: Option<&str>,
    ) -> Self {
        let message = message.into();
        let correlation = correlation_id.map(|value| value.to_string());
        match &correlation {
            Some(id) => {
                warn!(target: "app::model::error", code = %code, correlation_id = %id, %message);
            }
            None => {
                warn!(target: "app::model::error", code = %code, %message);
            }
        }

        AppError::ModelUnavailable {
            code,
            message,
            correlation_id: correlation,
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::database", %message, "persistence error");
        AppError::Persistence { message }
    }

    pub fn not_found() -> Self {
        warn!(target: "app::database", "resource not found");
        AppError::NotFound
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidInput { .. } => ErrorKind::InvalidInput,
            AppError::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            AppError::Persistence { .. } => ErrorKind::Persistence,
            AppError::NotFound => ErrorKind::NotFound,
            AppError::Serialization(_) | AppError::Io(_) | AppError::Other(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn model_code(&self) -> Option<ModelErrorCode> {
        match self {
            AppError::ModelUnavailable { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn model_correlation_id(&self) -> Option<&str> {
        match self {
            AppError::ModelUnavailable { correlation_id, .. } => correlation_id.as_deref(),
            _ => None,
        }
    }

    pub fn input_details(&self) -> Option<&JsonValue> {
        match self {
            AppError::InvalidInput { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        use rusqlite::Error::QueryReturnedNoRows;

        match &error {
            QueryReturnedNoRows => AppError::not_found(),
            _ => AppError::persistence(error.to_string()),
        }
    }
}
