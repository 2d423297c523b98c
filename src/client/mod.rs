//! Client side of the activation protocol.
//!
//! This module runs inside the protected application process, not the
//! server. It provides:
//! - [`ActivationClient`]: typed access to the three session endpoints
//! - [`Heartbeat`](heartbeat::Heartbeat): the background renewal task
//! - [`fingerprint`]: device fingerprint derivation
//!
//! Every outbound call uses a fixed short request timeout, deliberately
//! much smaller than the heartbeat period: a slow network must not be
//! confused with a missed heartbeat.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::models::api::{AckResponse, HeartbeatResponse, SessionRequest};

pub mod fingerprint;
pub mod heartbeat;

/// Timeout for each outbound request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A server rejection, decoded from the error envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The key is unknown. The user should re-check it.
    InvalidKey,
    /// The key has been revoked. Terminal.
    Revoked,
    /// Another device holds a live session.
    ConcurrentSession {
        /// Advisory wait before the session could be reclaimed.
        retry_after_seconds: Option<u64>,
    },
    /// No session held by this device; re-acquire instead of renewing.
    SessionExpired,
    /// The server's record store is temporarily unavailable.
    StoreUnavailable,
    /// Any other error code, kept verbatim.
    Other(String),
}

impl Rejection {
    fn from_wire(code: &str, retry_after_seconds: Option<u64>) -> Self {
        match code {
            "invalid_key" => Self::InvalidKey,
            "revoked" => Self::Revoked,
            "concurrent_session" => Self::ConcurrentSession {
                retry_after_seconds,
            },
            "session_expired" => Self::SessionExpired,
            "store_unavailable" => Self::StoreUnavailable,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "invalid_key"),
            Self::Revoked => write!(f, "revoked"),
            Self::ConcurrentSession {
                retry_after_seconds: Some(secs),
            } => write!(f, "concurrent_session (retry after {secs}s)"),
            Self::ConcurrentSession { .. } => write!(f, "concurrent_session"),
            Self::SessionExpired => write!(f, "session_expired"),
            Self::StoreUnavailable => write!(f, "store_unavailable"),
            Self::Other(code) => write!(f, "{code}"),
        }
    }
}

/// Errors surfaced by the activation client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configured server URL could not be parsed.
    #[error("invalid server URL: {0}")]
    InvalidBaseUrl(String),

    /// The request never produced a server decision (connect failure,
    /// timeout, malformed response). Retryable on the next tick.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a rejection.
    #[error("server rejected request: {0}")]
    Rejected(Rejection),
}

/// Wire shape of the server's error envelope.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    #[serde(default)]
    retry_after_seconds: Option<u64>,
}

/// Typed client for the session endpoints.
///
/// Holds the (key, fingerprint) pair it was installed with; both are sent
/// on every call.
#[derive(Clone)]
pub struct ActivationClient {
    http: reqwest::Client,
    base_url: String,
    request: SessionRequest,
}

impl ActivationClient {
    /// Creates a client for the arbitration server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid HTTP(S) URL or the
    /// HTTP client cannot be constructed.
    pub fn new(base_url: &str, key: &str, fingerprint: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url)
            .map_err(|err| ClientError::InvalidBaseUrl(format!("{base_url}: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl(format!(
                "{base_url}: URL must use HTTP or HTTPS"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            request: SessionRequest {
                key: key.to_string(),
                device_fingerprint: fingerprint.to_string(),
            },
        })
    }

    /// Acquire (or validate) the session.
    ///
    /// Used on first activation and on every process start; the server
    /// treats both identically.
    pub async fn acquire(&self) -> Result<(), ClientError> {
        self.post::<AckResponse>("/api/v1/session/acquire")
            .await
            .map(|_| ())
    }

    /// Renew the session. Returns the server-recommended wait, in seconds,
    /// before the next renewal.
    pub async fn heartbeat(&self) -> Result<u64, ClientError> {
        self.post::<HeartbeatResponse>("/api/v1/session/heartbeat")
            .await
            .map(|response| response.next_interval_seconds)
    }

    /// Release the session. The server always acknowledges this.
    pub async fn release(&self) -> Result<(), ClientError> {
        self.post::<AckResponse>("/api/v1/session/release")
            .await
            .map(|_| ())
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(&self.request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        // Decode the rejection; fall back to the bare status if the body
        // is not the expected envelope.
        let rejection = match response.json::<ErrorBody>().await {
            Ok(body) => Rejection::from_wire(&body.error.code, body.error.retry_after_seconds),
            Err(_) => Rejection::Other(format!("http status {status}")),
        };

        Err(ClientError::Rejected(rejection))
    }
}
