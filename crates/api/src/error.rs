use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use moodbase_core::error::CoreError;
use serde_json::json;

/// Message fragments that are safe to echo back in a 500 response.
const SAFE_MESSAGE_PATTERNS: &[&str] = &["already submitted", "Invalid", "Missing"];

/// Generic message used when an internal error must not be echoed.
const GENERIC_INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses of
/// the form `{ "success": false, "error": ..., "code": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `moodbase_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A malformed request that never reached domain validation.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The requested resource has no data, with a specific error code.
    #[error("Not found: {message}")]
    NotFound { code: &'static str, message: String },

    /// The client exceeded a rate limit.
    #[error("Too many requests: {0}")]
    TooManyRequests(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        AppError::NotFound {
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation { code, message } => {
                    (StatusCode::BAD_REQUEST, *code, message.clone())
                }
                CoreError::Conflict { code, message } => {
                    (StatusCode::CONFLICT, *code, message.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal(msg)
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::NotFound { code, message } => {
                (StatusCode::NOT_FOUND, *code, message.clone())
            }
            AppError::TooManyRequests(msg) => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                msg.clone(),
            ),
        };

        let body = json!({
            "success": false,
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Whether an internal error message may be shown to clients.
pub fn is_safe_message(message: &str) -> bool {
    SAFE_MESSAGE_PATTERNS.iter().any(|p| message.contains(p))
}

fn internal(message: &str) -> (StatusCode, &'static str, String) {
    let shown = if is_safe_message(message) {
        message.to_string()
    } else {
        GENERIC_INTERNAL_MESSAGE.to_string()
    };
    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", shown)
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                GENERIC_INTERNAL_MESSAGE.to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                GENERIC_INTERNAL_MESSAGE.to_string(),
            )
        }
    }
}
