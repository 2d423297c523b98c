//! Activation record and session data models.
//!
//! This module defines:
//! - `ActivationRecord`: one record per issued activation key
//! - `ActiveSession`: the single device currently holding a key
//! - `KeyStatus`: the one-way `active -> revoked` key state
//!
//! Staleness is never stored. It is always derived at read time from
//! `last_heartbeat_at`, the configured stale timeout, and the current clock,
//! so no background sweeper is needed to keep it fresh.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix for all issued activation keys.
///
/// Keys look like `act-550e8400-e29b-41d4-a716-446655440000`. The prefix
/// makes keys recognizable in logs and support tickets.
pub const KEY_PREFIX: &str = "act-";

/// Lifecycle state of an activation key.
///
/// The transition is strictly one-way: `active -> revoked`. A revoked key
/// rejects every acquisition and renewal, regardless of session state, and
/// is never reactivated or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    /// Key may hold a session.
    Active,
    /// Key is terminally disabled.
    Revoked,
}

/// The device currently holding an activation key.
///
/// At most one session exists per record (it is embedded, not a separate
/// entity). A session is displaced either by the same fingerprint renewing
/// or re-acquiring, or by any fingerprint once the session has gone stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    /// Opaque device token, compared only for equality.
    ///
    /// Derivation happens on the client (see `client::fingerprint`); the
    /// arbitration logic never computes fingerprints.
    pub device_fingerprint: String,

    /// When this fingerprint first acquired the session.
    ///
    /// Preserved across renewals and re-acquisitions by the same
    /// fingerprint; reset when a different fingerprint takes over.
    pub started_at: DateTime<Utc>,

    /// Most recent liveness signal. Drives staleness.
    pub last_heartbeat_at: DateTime<Utc>,
}

impl ActiveSession {
    /// Starts a fresh session for `fingerprint` at `now`.
    pub fn start(fingerprint: &str, now: DateTime<Utc>) -> Self {
        Self {
            device_fingerprint: fingerprint.to_string(),
            started_at: now,
            last_heartbeat_at: now,
        }
    }

    /// Whether this session has gone stale at `now`.
    ///
    /// A session is stale iff strictly more than `stale_after` has elapsed
    /// since the last heartbeat. A session at exactly the threshold is
    /// still live.
    pub fn is_stale_at(&self, stale_after: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_heartbeat_at > stale_after
    }

    /// Advisory wait (in seconds) until this session becomes stale.
    ///
    /// Sent alongside `concurrent_session` rejections so the losing device
    /// can back off instead of polling. Clamped to at least one second.
    pub fn retry_after_seconds(&self, stale_after: Duration, now: DateTime<Utc>) -> i64 {
        (stale_after - (now - self.last_heartbeat_at))
            .num_seconds()
            .max(1)
    }

    /// Whether this session is held by `fingerprint`.
    pub fn is_held_by(&self, fingerprint: &str) -> bool {
        self.device_fingerprint == fingerprint
    }
}

/// One issued activation key and its session state.
///
/// Records are created by key issuance, transition `status` forward to
/// `revoked` at most once, and are never deleted. `current_session` is
/// `None` when no device holds the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationRecord {
    /// Opaque unique key identifier (`act-` prefixed UUID).
    pub key: String,

    /// Lifecycle state. See `KeyStatus`.
    pub status: KeyStatus,

    /// Optional free-text annotation for administrators.
    pub label: Option<String>,

    /// Immutable creation timestamp.
    pub created_at: DateTime<Utc>,

    /// The device currently holding this key, if any.
    pub current_session: Option<ActiveSession>,
}

impl ActivationRecord {
    /// Creates a fresh active record with a newly generated key.
    pub fn issue(label: Option<String>) -> Self {
        Self {
            key: format!("{}{}", KEY_PREFIX, Uuid::new_v4()),
            status: KeyStatus::Active,
            label,
            created_at: Utc::now(),
            current_session: None,
        }
    }

    /// Whether this key has been revoked.
    pub fn is_revoked(&self) -> bool {
        self.status == KeyStatus::Revoked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_heartbeat_age(age: Duration) -> (ActiveSession, DateTime<Utc>) {
        let now = Utc::now();
        let session = ActiveSession {
            device_fingerprint: "fp-a".to_string(),
            started_at: now - age,
            last_heartbeat_at: now - age,
        };
        (session, now)
    }

    #[test]
    fn session_is_live_within_timeout() {
        let (session, now) = session_with_heartbeat_age(Duration::minutes(4));
        assert!(!session.is_stale_at(Duration::minutes(10), now));
    }

    #[test]
    fn session_at_exact_threshold_is_still_live() {
        let (session, now) = session_with_heartbeat_age(Duration::minutes(10));
        assert!(!session.is_stale_at(Duration::minutes(10), now));
    }

    #[test]
    fn session_past_threshold_is_stale() {
        let (session, now) = session_with_heartbeat_age(Duration::minutes(11));
        assert!(session.is_stale_at(Duration::minutes(10), now));
    }

    #[test]
    fn retry_after_counts_down_to_staleness() {
        let (session, now) = session_with_heartbeat_age(Duration::minutes(4));
        let retry = session.retry_after_seconds(Duration::minutes(10), now);
        assert!(retry > 5 * 60 - 2 && retry <= 6 * 60, "retry = {retry}");
    }

    #[test]
    fn retry_after_is_clamped_to_one_second() {
        let (session, now) = session_with_heartbeat_age(Duration::minutes(10));
        assert_eq!(session.retry_after_seconds(Duration::minutes(10), now), 1);
    }

    #[test]
    fn issued_records_start_active_with_prefixed_key() {
        let record = ActivationRecord::issue(Some("workstation 7".to_string()));
        assert!(record.key.starts_with(KEY_PREFIX));
        assert_eq!(record.status, KeyStatus::Active);
        assert!(record.current_session.is_none());
        assert_eq!(record.label.as_deref(), Some("workstation 7"));
    }

    #[test]
    fn issued_keys_are_unique() {
        let a = ActivationRecord::issue(None);
        let b = ActivationRecord::issue(None);
        assert_ne!(a.key, b.key);
    }
}
