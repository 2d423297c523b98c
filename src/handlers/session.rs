//! Device-facing session endpoints.
//!
//! This module implements the three operations a protected installation
//! performs against its activation key:
//! - POST /api/v1/session/acquire - acquire or validate the session
//! - POST /api/v1/session/heartbeat - renew the session
//! - POST /api/v1/session/release - release the session on shutdown
//!
//! All three share one request shape: the (key, fingerprint) pair is the
//! entire client credential; no other authentication applies here.

use axum::{Json, extract::State};

use crate::app::AppState;
use crate::error::AppError;
use crate::models::api::{AckResponse, HeartbeatResponse, SessionRequest};
use crate::services::arbitration;

/// Acquire (or validate) the session for an activation key.
///
/// First activation and every-startup validation are this same operation.
///
/// # Request Body
///
/// ```json
/// {
///   "key": "act-550e8400-e29b-41d4-a716-446655440000",
///   "device_fingerprint": "9f2c4e…"
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{"success": true}`
/// - **Error (404)**: `invalid_key`
/// - **Error (403)**: `revoked`
/// - **Error (409)**: `concurrent_session`, with `retry_after_seconds`
pub async fn acquire(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<AckResponse>, AppError> {
    arbitration::acquire(&state, &request.key, &request.device_fingerprint).await?;

    Ok(Json(AckResponse::ok()))
}

/// Renew the session heartbeat.
///
/// # Response
///
/// - **Success (200 OK)**: `{"success": true, "next_interval_seconds": 300}`
/// - **Error (404)**: `invalid_key`
/// - **Error (403)**: `revoked`
/// - **Error (410)**: `session_expired` - the caller must fall back to a
///   full acquisition, not retry the renewal
pub async fn heartbeat(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<HeartbeatResponse>, AppError> {
    let next_interval_seconds =
        arbitration::renew(&state, &request.key, &request.device_fingerprint).await?;

    Ok(Json(HeartbeatResponse {
        success: true,
        next_interval_seconds,
    }))
}

/// Release the session.
///
/// Always answers `{"success": true}`. This runs during client shutdown,
/// where no failure has a useful recovery action; a lost release only
/// delays reclamation until the session goes stale. Store failures are
/// logged and swallowed.
pub async fn release(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> Json<AckResponse> {
    if let Err(err) =
        arbitration::release(&state, &request.key, &request.device_fingerprint).await
    {
        tracing::warn!(key = %request.key, "release failed: {err}");
    }

    Json(AckResponse::ok())
}
