use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a remote collaborator for a single attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("request cancelled")]
    Cancelled,
}

impl SourceError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        SourceError::Http {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided wait hint, only ever present on HTTP failures.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SourceError::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if let Some(status) = err.status() {
            SourceError::http(status.as_u16(), err.to_string())
        } else if err.is_decode() {
            SourceError::Malformed(err.to_string())
        } else if err.is_builder() {
            SourceError::Validation(err.to_string())
        } else {
            SourceError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Malformed(err.to_string())
    }
}

/// Closed set of outcomes that drive the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Retryable,
    Fatal,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::Retryable => "retryable",
            ErrorKind::Fatal => "fatal",
            ErrorKind::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// Single classification point for collaborator failures.
///
/// Timeouts, connection failures, 429 and 5xx are transient; any other HTTP
/// status, malformed payloads and validation failures are fatal.
pub fn classify(error: &SourceError) -> ErrorKind {
    match error {
        SourceError::Timeout | SourceError::Connection(_) => ErrorKind::Retryable,
        SourceError::Http { status, .. } => match status {
            429 => ErrorKind::Retryable,
            500..=599 => ErrorKind::Retryable,
            _ => ErrorKind::Fatal,
        },
        SourceError::Malformed(_) | SourceError::Validation(_) => ErrorKind::Fatal,
        SourceError::Cancelled => ErrorKind::Cancelled,
    }
}

/// Terminal error of one logical remote call, after retries.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message} ({kind}, {attempts} attempt(s))")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub attempts: u32,
}

impl ClassifiedError {
    pub fn from_source(error: &SourceError, attempts: u32) -> Self {
        Self {
            kind: classify(error),
            message: error.to_string(),
            status: error.status(),
            attempts,
        }
    }

    /// Marker for work that was never finished because the run was cancelled.
    pub fn cancelled(attempts: u32) -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            message: "cancelled before completion".to_string(),
            status: None,
            attempts,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Retryable
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}
