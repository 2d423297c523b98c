//! HTTP handlers for key lifecycle administration.
//!
//! This module provides the operator endpoints for issuing, listing,
//! inspecting, and revoking activation keys. Every route here sits behind
//! the administrative credential middleware.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::AppState;
use crate::error::AppError;
use crate::models::api::{CreateKeyRequest, CreateKeyResponse, KeyOverview, RevokeKeyResponse};
use crate::models::record::ActivationRecord;
use crate::services::admin;

/// Issue a new activation key.
///
/// # Request Body
///
/// ```json
/// { "label": "workstation 7" }
/// ```
///
/// The label is optional; `{}` is a valid body.
///
/// # Response
///
/// Returns 201 Created:
///
/// ```json
/// {
///   "key": "act-550e8400-e29b-41d4-a716-446655440000",
///   "created_at": "2025-06-01T10:30:00Z"
/// }
/// ```
pub async fn create_key(
    State(state): State<AppState>,
    Json(request): Json<CreateKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = admin::create_key(&state, request.label).await?;

    Ok((StatusCode::CREATED, Json(CreateKeyResponse::from(&record))))
}

/// List every issued key.
///
/// Each entry carries the full session (or `null`) and the read-time
/// `is_stale` projection (`null` when no session is held):
///
/// ```json
/// [
///   {
///     "key": "act-…",
///     "status": "active",
///     "label": "workstation 7",
///     "created_at": "2025-06-01T10:30:00Z",
///     "session": {
///       "device_fingerprint": "9f2c4e…",
///       "started_at": "2025-06-02T08:00:00Z",
///       "last_heartbeat_at": "2025-06-02T08:25:00Z"
///     },
///     "is_stale": false
///   }
/// ]
/// ```
pub async fn list_keys(
    State(state): State<AppState>,
) -> Result<Json<Vec<KeyOverview>>, AppError> {
    let keys = admin::list_keys(&state).await?;

    Ok(Json(keys))
}

/// Fetch the full record for one key.
///
/// # Response
///
/// - **Success (200 OK)**: the complete activation record
/// - **Error (404)**: `not_found`
pub async fn get_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ActivationRecord>, AppError> {
    let record = admin::get_key(&state, &key).await?;

    Ok(Json(record))
}

/// Revoke a key.
///
/// Terminal: a revoked key rejects every future acquisition and renewal.
/// Any held session is left in place; it is inert once the key is revoked.
///
/// # Response
///
/// - **Success (200 OK)**: `{"key": "act-…", "status": "revoked"}`
/// - **Error (404)**: `not_found`
pub async fn revoke_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RevokeKeyResponse>, AppError> {
    let record = admin::revoke_key(&state, &key).await?;

    Ok(Json(RevokeKeyResponse::from(&record)))
}
