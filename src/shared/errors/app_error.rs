use serde::Serialize;
use thiserror::Error;

/// Top-level failures: the whole tracking run could not be attempted.
///
/// Per-entity and per-key failures never surface here; they are carried in
/// the report's error list instead.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        AppError::ConfigurationError(message.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, AppError::ConfigurationError(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
