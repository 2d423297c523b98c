//! API request/response types for the session and admin endpoints.
//!
//! All three client-facing session operations share one request shape: the
//! (key, fingerprint) pair is the entire client credential. Responses carry
//! an explicit `success` flag; rejections never reach these types (they are
//! produced by `AppError`'s `IntoResponse` as the error envelope).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::record::{ActivationRecord, ActiveSession, KeyStatus};

/// Request body for acquire, heartbeat, and release.
///
/// ```json
/// {
///   "key": "act-550e8400-e29b-41d4-a716-446655440000",
///   "device_fingerprint": "9f2c4e…"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    /// The activation key the device was installed with.
    pub key: String,

    /// Opaque device fingerprint, derived locally on the device.
    pub device_fingerprint: String,
}

/// Response body for acquire and release.
#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Response body for a successful heartbeat renewal.
///
/// `next_interval_seconds` is the server-recommended wait before the next
/// renewal. Clients should adopt it; the server keeps it equal to the
/// configured heartbeat period.
#[derive(Debug, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub success: bool,
    pub next_interval_seconds: u64,
}

/// Request body for key issuance.
///
/// The label is optional; `{}` is a valid body.
#[derive(Debug, Default, Deserialize)]
pub struct CreateKeyRequest {
    /// Free-text annotation shown in key listings.
    #[serde(default)]
    pub label: Option<String>,
}

/// Response body for key issuance.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateKeyResponse {
    pub key: String,
    pub created_at: DateTime<Utc>,
}

impl From<&ActivationRecord> for CreateKeyResponse {
    fn from(record: &ActivationRecord) -> Self {
        Self {
            key: record.key.clone(),
            created_at: record.created_at,
        }
    }
}

/// One entry in the admin key listing.
///
/// `is_stale` is a read-time projection of the held session against the
/// configured stale timeout; it is `null` when no session is held. It is
/// never persisted.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyOverview {
    pub key: String,
    pub status: KeyStatus,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub session: Option<ActiveSession>,
    pub is_stale: Option<bool>,
}

impl KeyOverview {
    /// Projects a record into its listing form, deriving `is_stale` at `now`.
    pub fn project(record: ActivationRecord, stale_after: Duration, now: DateTime<Utc>) -> Self {
        let is_stale = record
            .current_session
            .as_ref()
            .map(|session| session.is_stale_at(stale_after, now));

        Self {
            key: record.key,
            status: record.status,
            label: record.label,
            created_at: record.created_at,
            session: record.current_session,
            is_stale,
        }
    }
}

/// Response body for key revocation.
#[derive(Debug, Serialize, Deserialize)]
pub struct RevokeKeyResponse {
    pub key: String,
    pub status: KeyStatus,
}

impl From<&ActivationRecord> for RevokeKeyResponse {
    fn from(record: &ActivationRecord) -> Self {
        Self {
            key: record.key.clone(),
            status: record.status,
        }
    }
}
