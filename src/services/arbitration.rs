//! Session arbitration - Core logic deciding which device holds a key.
//!
//! This service handles:
//! - Session acquisition (first activation and startup validation are the
//!   same operation; the distinction is purely the caller's labeling)
//! - Heartbeat renewal
//! - Deactivation
//!
//! # Concurrency
//!
//! The record store offers no multi-record transactions, only a per-record
//! conditional write. Every mutation here is a bounded read-decide-write
//! loop: fetch the record with its version, decide, and write back only if
//! the version is unchanged. A conflict restarts the loop from the fetch,
//! so a loser of a race re-reads the winner's session and gets an honest
//! rejection instead of silently displacing the winner.

use chrono::Utc;

use crate::app::AppState;
use crate::error::AppError;
use crate::models::record::ActiveSession;
use crate::store::{StoreError, VersionedRecord};

/// Attempts per read-decide-write cycle before reporting contention.
///
/// Each retry re-reads fresh state, so exhaustion means the record is under
/// continuous write pressure; the caller is told the store is unavailable
/// and may retry.
const CAS_ATTEMPTS: u32 = 5;

/// Acquire the session for `key`, or renew it if already held.
///
/// # Process
///
/// 1. Fetch the record; unknown key is rejected
/// 2. Revoked keys reject unconditionally
/// 3. A live session held by a different fingerprint is rejected with an
///    advisory retry-after
/// 4. Otherwise (no session, stale session, or same fingerprint) the
///    session is written for this fingerprint. `started_at` is preserved
///    when the same fingerprint already held the session, reset otherwise
///
/// # Errors
///
/// - `InvalidKey`: no record for `key`
/// - `Revoked`: key terminally disabled
/// - `ConcurrentSession`: a different device holds a live session
/// - `Store`: backing store unavailable or persistent write contention
pub async fn acquire(state: &AppState, key: &str, fingerprint: &str) -> Result<(), AppError> {
    for _ in 0..CAS_ATTEMPTS {
        let VersionedRecord {
            mut record,
            version,
        } = state.store.get(key).await?.ok_or(AppError::InvalidKey)?;

        if record.is_revoked() {
            return Err(AppError::Revoked);
        }

        let now = Utc::now();

        if let Some(session) = &record.current_session {
            // A live session may only be displaced by its own fingerprint.
            if !session.is_stale_at(state.config.stale_timeout(), now)
                && !session.is_held_by(fingerprint)
            {
                return Err(AppError::ConcurrentSession {
                    retry_after_seconds: session
                        .retry_after_seconds(state.config.stale_timeout(), now),
                });
            }
        }

        // Same fingerprint keeps its original start; a takeover starts over.
        let started_at = match &record.current_session {
            Some(session) if session.is_held_by(fingerprint) => session.started_at,
            _ => now,
        };

        record.current_session = Some(ActiveSession {
            device_fingerprint: fingerprint.to_string(),
            started_at,
            last_heartbeat_at: now,
        });

        match state.store.put(&record, Some(version)).await {
            Ok(_) => {
                tracing::info!(key, fingerprint, "session acquired");
                return Ok(());
            }
            // Lost the write race; re-read and re-decide.
            Err(StoreError::VersionConflict) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::Store(StoreError::VersionConflict))
}

/// Renew the session heartbeat for `key`.
///
/// Renewal is deliberately not self-healing: a missing or mismatched
/// session means another device has already reclaimed the key (or an
/// operator cleared it), and the caller must re-run a full acquisition
/// rather than blindly overwrite.
///
/// Returns the recommended wait before the next renewal.
///
/// # Errors
///
/// - `InvalidKey`: no record for `key`
/// - `Revoked`: key terminally disabled (rejected even for the holder)
/// - `SessionExpired`: session absent or held by a different fingerprint
/// - `Store`: backing store unavailable or persistent write contention
pub async fn renew(state: &AppState, key: &str, fingerprint: &str) -> Result<u64, AppError> {
    for _ in 0..CAS_ATTEMPTS {
        let VersionedRecord {
            mut record,
            version,
        } = state.store.get(key).await?.ok_or(AppError::InvalidKey)?;

        if record.is_revoked() {
            return Err(AppError::Revoked);
        }

        match &mut record.current_session {
            Some(session) if session.is_held_by(fingerprint) => {
                session.last_heartbeat_at = Utc::now();
            }
            _ => return Err(AppError::SessionExpired),
        }

        match state.store.put(&record, Some(version)).await {
            Ok(_) => {
                tracing::debug!(key, fingerprint, "heartbeat renewed");
                return Ok(state.config.heartbeat_interval_seconds);
            }
            Err(StoreError::VersionConflict) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::Store(StoreError::VersionConflict))
}

/// Release the session for `key` if held by `fingerprint`.
///
/// A release by a non-holding fingerprint is a no-op. Unknown keys are also
/// a no-op: this runs during process shutdown, where there is nothing
/// useful the caller could do with an error, so the handler above swallows
/// whatever this returns.
///
/// # Errors
///
/// - `Store`: backing store unavailable
pub async fn release(state: &AppState, key: &str, fingerprint: &str) -> Result<(), AppError> {
    for _ in 0..CAS_ATTEMPTS {
        let Some(VersionedRecord {
            mut record,
            version,
        }) = state.store.get(key).await?
        else {
            return Ok(());
        };

        match &record.current_session {
            Some(session) if session.is_held_by(fingerprint) => {
                record.current_session = None;
            }
            // Not ours to clear.
            _ => return Ok(()),
        }

        match state.store.put(&record, Some(version)).await {
            Ok(_) => {
                tracing::info!(key, fingerprint, "session released");
                return Ok(());
            }
            Err(StoreError::VersionConflict) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    // Every attempt lost its race, so another writer owns the record now
    // and the session is no longer ours to clear.
    Ok(())
}
