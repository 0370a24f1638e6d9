use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Requested resource does not exist (or does not belong to the caller).
    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Malformed request body.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Failure of a request handler, carrying the message shown to the caller.
    #[error("{message}: {source}")]
    Failed {
        /// Caller-facing message.
        message: &'static str,
        /// Underlying cause, logged but never returned.
        source: Box<AppError>,
    },
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error message.
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Failed { message, source } => {
                tracing::error!(error = %source, "{}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
            _ => {
                tracing::error!(error = %self, "Request error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Attach a caller-facing failure message to a result.
pub trait ResultExt<T> {
    /// Wrap any error other than not-found or unauthorized into
    /// [`AppError::Failed`] with the given message.
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: &'static str) -> Result<T> {
        self.map_err(|e| match e {
            AppError::NotFound(_) | AppError::Unauthorized(_) | AppError::Failed { .. } => e,
            other => AppError::Failed {
                message,
                source: Box::new(other),
            },
        })
    }
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;
