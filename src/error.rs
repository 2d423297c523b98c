//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.
//!
//! # Error Categories
//!
//! - **Rejections**: arbitration decisions (`invalid_key`, `revoked`,
//!   `concurrent_session`, `session_expired`). These are answers, not
//!   failures; each carries a stable code clients branch on.
//! - **Authorization**: missing/incorrect administrative credential.
//! - **Infrastructure**: the backing record store unreachable. Recoverable,
//!   retried with backoff before it ever reaches this type.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::store::StoreError;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and a stable error code
/// in the JSON body. Clients branch on the code, not the message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The activation key does not exist.
    ///
    /// Non-retryable; the end user should re-check the key they entered.
    /// Returns HTTP 404 Not Found.
    #[error("Activation key not recognized")]
    InvalidKey,

    /// The activation key has been revoked. Terminal, non-retryable.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Activation key has been revoked")]
    Revoked,

    /// Another device holds a live session on this key.
    ///
    /// Retryable after `retry_after_seconds`, when the holding session
    /// would become stale if it stops heartbeating. Returns HTTP 409
    /// Conflict.
    #[error("Another device currently holds this activation key")]
    ConcurrentSession {
        /// Advisory wait before the session could be reclaimed.
        retry_after_seconds: i64,
    },

    /// Renewal found no session held by this device.
    ///
    /// Another device reclaimed the key, or an operator cleared the
    /// session. Non-retryable as a renewal; the caller must fall back to a
    /// full acquisition. Returns HTTP 410 Gone.
    #[error("No active session for this device")]
    SessionExpired,

    /// Administrative credential is missing or incorrect.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Missing or invalid administrative credential")]
    Unauthorized,

    /// Admin lookup of a key that does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Activation key not found")]
    KeyNotFound,

    /// The record store failed after retries, or a conditional-write loop
    /// exhausted its attempts under contention.
    ///
    /// Returns HTTP 503 Service Unavailable; callers may retry. Details
    /// are logged, never sent to the client.
    #[error("Record store unavailable")]
    Store(#[from] StoreError),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format (`retry_after_seconds` is present
/// only on `concurrent_session`):
/// ```json
/// {
///   "error": {
///     "code": "error_code",
///     "message": "Human-readable error message",
///     "retry_after_seconds": 312
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match &self {
            AppError::InvalidKey => (StatusCode::NOT_FOUND, "invalid_key", self.to_string()),
            AppError::Revoked => (StatusCode::FORBIDDEN, "revoked", self.to_string()),
            AppError::ConcurrentSession { .. } => {
                (StatusCode::CONFLICT, "concurrent_session", self.to_string())
            }
            AppError::SessionExpired => (StatusCode::GONE, "session_expired", self.to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::KeyNotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Store(err) => {
                // Hide backend details from the client
                tracing::error!("record store failure: {err}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    "The activation store is temporarily unavailable".to_string(),
                )
            }
        };

        // Build JSON response body
        let mut error = json!({
            "code": code,
            "message": message
        });
        if let AppError::ConcurrentSession {
            retry_after_seconds,
        } = &self
        {
            error["retry_after_seconds"] = json!(retry_after_seconds);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
