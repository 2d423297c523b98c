//! Key lifecycle administration.
//!
//! Issue, inspect, list, and revoke activation keys. Every operation here
//! sits behind the administrative credential check in the auth middleware;
//! nothing in this module runs for an unauthenticated caller.

use chrono::Utc;

use crate::app::AppState;
use crate::error::AppError;
use crate::models::api::KeyOverview;
use crate::models::record::{ActivationRecord, KeyStatus};
use crate::store::{StoreError, VersionedRecord};

/// Attempts at issuing a key before giving up.
///
/// A v4 UUID collision is practically impossible, but the conditional
/// create detects one anyway; a retry just draws a fresh key.
const ISSUE_ATTEMPTS: u32 = 3;

/// Attempts per revocation read-decide-write cycle.
const CAS_ATTEMPTS: u32 = 5;

/// Issue a fresh activation key.
///
/// The new record starts `active` with no session.
pub async fn create_key(
    state: &AppState,
    label: Option<String>,
) -> Result<ActivationRecord, AppError> {
    for _ in 0..ISSUE_ATTEMPTS {
        let record = ActivationRecord::issue(label.clone());

        match state.store.put(&record, None).await {
            Ok(_) => {
                tracing::info!(key = %record.key, "activation key issued");
                return Ok(record);
            }
            // Key collision; draw a new one.
            Err(StoreError::VersionConflict) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::Store(StoreError::VersionConflict))
}

/// List every issued key with its read-time staleness projection.
///
/// Records are returned newest first. `is_stale` is computed here from
/// `last_heartbeat_at` and the configured stale timeout, with the same
/// threshold the arbitration service applies; it is never stored.
pub async fn list_keys(state: &AppState) -> Result<Vec<KeyOverview>, AppError> {
    let mut records = state.store.list().await?;
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let now = Utc::now();
    let stale_after = state.config.stale_timeout();

    Ok(records
        .into_iter()
        .map(|record| KeyOverview::project(record, stale_after, now))
        .collect())
}

/// Fetch the full record for one key.
///
/// # Errors
///
/// - `KeyNotFound`: no record for `key`
pub async fn get_key(state: &AppState, key: &str) -> Result<ActivationRecord, AppError> {
    let versioned = state.store.get(key).await?.ok_or(AppError::KeyNotFound)?;
    Ok(versioned.record)
}

/// Revoke a key. Terminal; revocation is never reversed.
///
/// The session, if any, is deliberately left in place: a revoked key
/// rejects every acquisition and renewal regardless of session state, so a
/// lingering session record is harmless. Revoking an already-revoked key
/// is an idempotent success.
///
/// # Errors
///
/// - `KeyNotFound`: no record for `key`
pub async fn revoke_key(state: &AppState, key: &str) -> Result<ActivationRecord, AppError> {
    for _ in 0..CAS_ATTEMPTS {
        let VersionedRecord {
            mut record,
            version,
        } = state.store.get(key).await?.ok_or(AppError::KeyNotFound)?;

        if record.is_revoked() {
            return Ok(record);
        }

        record.status = KeyStatus::Revoked;

        match state.store.put(&record, Some(version)).await {
            Ok(_) => {
                tracing::info!(key, "activation key revoked");
                return Ok(record);
            }
            Err(StoreError::VersionConflict) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::Store(StoreError::VersionConflict))
}
