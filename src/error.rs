//! Application error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Google OAuth credentials not configured")]
    CredentialsMissing,

    #[error("Invalid credential format: {0}")]
    InvalidCredentialFormat(String),

    #[error("Search Console query failed: {0}")]
    Query(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error when it surfaces as a response.
    /// Per-keyword query failures never reach here; the scheduler
    /// converts them into error-tagged results instead.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated | AppError::TokenRefreshFailed(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::InvalidRange(_)
            | AppError::CredentialsMissing
            | AppError::InvalidCredentialFormat(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Serializable error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::InvalidRange(_) => "INVALID_RANGE",
            AppError::NotAuthenticated => "NOT_AUTHENTICATED",
            AppError::TokenRefreshFailed(_) => "TOKEN_REFRESH_FAILED",
            AppError::CredentialsMissing => "CREDENTIALS_MISSING",
            AppError::InvalidCredentialFormat(_) => "INVALID_CREDENTIAL_FORMAT",
            AppError::Query(_) => "QUERY_FAILED",
            AppError::Http(_) => "HTTP_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::from(&self);
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
