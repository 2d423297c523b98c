//! Record Store abstraction over the persisted activation records.
//!
//! The store is a key-value contract: one `ActivationRecord` per activation
//! key, with `get`, a conditional `put`, and `list`. No multi-record
//! transactions exist. The arbitration and admin services are written
//! against the `RecordStore` trait and never name a concrete backend.
//!
//! # Conditional writes
//!
//! Every record carries a version. `put` only succeeds when the caller's
//! expected version still matches the stored one (or when creating a record
//! that does not exist yet). Callers run a read-decide-write loop and retry
//! from `get` on `VersionConflict`, which closes the lost-update race
//! between concurrent acquisitions without a lock service.

use async_trait::async_trait;
use std::time::Duration;

use crate::models::record::ActivationRecord;

mod memory;
mod postgres;

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;

/// A record together with the version it was read at.
#[derive(Debug, Clone)]
pub struct VersionedRecord {
    pub record: ActivationRecord,
    pub version: i64,
}

/// Errors surfaced by a record store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The stored version no longer matches the expected one, or a create
    /// collided with an existing record. The caller should re-read and
    /// retry its whole read-decide-write cycle.
    #[error("record version conflict")]
    VersionConflict,

    /// The backing store could not be reached or returned a malformed
    /// record. Recoverable; retried with backoff before reaching callers.
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value contract for activation records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetches the record for `key`, with its current version.
    async fn get(&self, key: &str) -> Result<Option<VersionedRecord>, StoreError>;

    /// Writes `record`, conditionally on the version it was read at.
    ///
    /// `expected_version = None` creates the record and fails with
    /// `VersionConflict` if it already exists. `Some(v)` overwrites only if
    /// the stored version is still `v`. Returns the new version.
    async fn put(
        &self,
        record: &ActivationRecord,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError>;

    /// Lists all records as a finite sequence.
    ///
    /// Backends may page internally; callers see a plain `Vec`.
    async fn list(&self) -> Result<Vec<ActivationRecord>, StoreError>;

    /// Probes backend connectivity. Used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Number of attempts `RetryingStore` makes per operation.
const RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retries; doubles per attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// Decorator that retries `Unavailable` errors with exponential backoff.
///
/// `VersionConflict` passes through untouched: it is a decision for the
/// caller's read-decide-write loop, not an infrastructure failure.
pub struct RetryingStore<S> {
    inner: S,
}

impl<S: RecordStore> RetryingStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

/// Runs one store operation up to `RETRY_ATTEMPTS` times.
///
/// Written as a macro rather than a generic helper so each method can call
/// `self.inner` directly without boxing closures over borrowed arguments.
macro_rules! retry_op {
    ($name:literal, $call:expr) => {{
        let mut attempt: u32 = 0;
        loop {
            match $call {
                Err(StoreError::Unavailable(reason)) if attempt + 1 < RETRY_ATTEMPTS => {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    tracing::warn!(
                        "store {} failed ({}), retrying in {:?}",
                        $name,
                        reason,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => break other,
            }
        }
    }};
}

#[async_trait]
impl<S: RecordStore> RecordStore for RetryingStore<S> {
    async fn get(&self, key: &str) -> Result<Option<VersionedRecord>, StoreError> {
        retry_op!("get", self.inner.get(key).await)
    }

    async fn put(
        &self,
        record: &ActivationRecord,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError> {
        retry_op!("put", self.inner.put(record, expected_version).await)
    }

    async fn list(&self) -> Result<Vec<ActivationRecord>, StoreError> {
        retry_op!("list", self.inner.list().await)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        retry_op!("ping", self.inner.ping().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Store that fails with `Unavailable` for the first `failures` pings.
    struct FlakyStore {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl RecordStore for FlakyStore {
        async fn get(&self, _key: &str) -> Result<Option<VersionedRecord>, StoreError> {
            Err(StoreError::VersionConflict)
        }

        async fn put(
            &self,
            _record: &ActivationRecord,
            _expected_version: Option<i64>,
        ) -> Result<i64, StoreError> {
            Err(StoreError::VersionConflict)
        }

        async fn list(&self) -> Result<Vec<ActivationRecord>, StoreError> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> Result<(), StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(StoreError::Unavailable("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_unavailable_until_success() {
        let store = RetryingStore::new(FlakyStore {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        assert!(store.ping().await.is_ok());
        assert_eq!(store.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_the_last_attempt() {
        let store = RetryingStore::new(FlakyStore {
            failures: 10,
            calls: AtomicU32::new(0),
        });
        assert!(matches!(
            store.ping().await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.inner.calls.load(Ordering::SeqCst), RETRY_ATTEMPTS);
    }

    #[tokio::test]
    async fn version_conflicts_pass_through_without_retry() {
        let store = RetryingStore::new(FlakyStore {
            failures: 0,
            calls: AtomicU32::new(0),
        });
        assert!(matches!(
            store.get("act-x").await,
            Err(StoreError::VersionConflict)
        ));
    }
}
