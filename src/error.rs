use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Local cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Local storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Authorization required")]
    Unauthorized,

    #[error("Operation requires an authenticated session")]
    NotAuthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Sync engine is not running")]
    EngineStopped,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for authorization failures reported by the remote store
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Unauthorized)
    }

    /// True for failures a caller may simply try again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::HttpClient(_) | AppError::Timeout(_) | AppError::ExternalApi(_)
        )
    }

    /// True when the remote store could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        match self {
            AppError::Timeout(_) => true,
            AppError::HttpClient(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unauthorized | AppError::NotAuthenticated => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::Cache(_)
            | AppError::Io(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            AppError::Cancelled | AppError::EngineStopped => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
