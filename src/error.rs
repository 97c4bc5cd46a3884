//! Error types for the product API.
//!
//! `ApiError` is the handler-boundary taxonomy: every handler and interceptor
//! returns it and it renders as a JSON `{ "error": ... }` body. Storage and
//! configuration failures have their own types and are mapped to `ApiError`
//! where they cross into HTTP.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt::Display;
use thiserror::Error;

/// Errors surfaced to HTTP callers.
///
/// Messages are fixed strings: internal details are logged, never returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Write rejected because the record already exists
    #[error("{0}")]
    Conflict(&'static str),

    /// Request body missing, malformed or lacking a required field
    #[error("{0}")]
    BadRequest(&'static str),

    /// Bad credentials or a missing/invalid/expired bearer token
    #[error("{0}")]
    Unauthorized(&'static str),

    /// Client exceeded the request budget for the current window
    #[error("Too many requests, please try again later.")]
    TooManyRequests { retry_after_secs: u64 },

    /// Unexpected storage or runtime failure
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    /// Log `err` and keep only the generic `message` for the caller.
    pub fn internal(message: &'static str, err: impl Display) -> Self {
        tracing::error!(error = %err, "{}", message);
        ApiError::Internal(message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Conflict(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        match self {
            ApiError::TooManyRequests { retry_after_secs } => {
                let body = Json(json!({
                    "error": message,
                    "retry_after_seconds": retry_after_secs,
                }));
                (
                    status,
                    [(header::RETRY_AFTER, retry_after_secs.to_string())],
                    body,
                )
                    .into_response()
            }
            _ => (status, Json(json!({ "error": message }))).into_response(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        ApiError::BadRequest("Invalid request body")
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected query string");
        ApiError::BadRequest("Invalid query string")
    }
}

/// Credential store and product collection failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// The UNIQUE constraint on `users.email` rejected the write
    #[error("a user with this email already exists")]
    DuplicateEmail,

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Startup configuration faults. Always fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET is not set; refusing to start without a token signing secret")]
    MissingJwtSecret,

    #[error("BCRYPT_COST must be between 4 and 31, got {0}")]
    InvalidBcryptCost(u32),

    #[error("RATE_LIMIT_WINDOW_SECS must be at least 1")]
    ZeroRateLimitWindow,
}
