//! In-memory record store for tests and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::record::ActivationRecord;
use crate::store::{RecordStore, StoreError, VersionedRecord};

/// A `RecordStore` backed by a `HashMap` behind a `RwLock`.
///
/// Versioning matches the Postgres implementation exactly: records start at
/// version 1 and every successful conditional write increments it. Because
/// `put` checks the expected version under the write lock, the store gives
/// the same lost-update protection as the real backend, which is what the
/// concurrent arbitration tests exercise.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, (i64, ActivationRecord)>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(key).map(|(version, record)| VersionedRecord {
            record: record.clone(),
            version: *version,
        }))
    }

    async fn put(
        &self,
        record: &ActivationRecord,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError> {
        let mut records = self.records.write().await;
        let current = records.get(&record.key).map(|(version, _)| *version);

        let new_version = match (expected_version, current) {
            // Create: must not exist yet.
            (None, None) => 1,
            // Overwrite: stored version must still match what was read.
            (Some(expected), Some(stored)) if expected == stored => stored + 1,
            _ => return Err(StoreError::VersionConflict),
        };

        records.insert(record.key.clone(), (new_version, record.clone()));
        Ok(new_version)
    }

    async fn list(&self) -> Result<Vec<ActivationRecord>, StoreError> {
        let records = self.records.read().await;
        let mut all: Vec<ActivationRecord> =
            records.values().map(|(_, record)| record.clone()).collect();
        // Key order for a deterministic sequence, like the Postgres scan.
        all.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(all)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_roundtrips() {
        let store = MemoryRecordStore::new();
        let record = ActivationRecord::issue(Some("lab".to_string()));

        let version = store.put(&record, None).await.unwrap();
        assert_eq!(version, 1);

        let fetched = store.get(&record.key).await.unwrap().unwrap();
        assert_eq!(fetched.version, 1);
        assert_eq!(fetched.record.key, record.key);
        assert_eq!(fetched.record.label.as_deref(), Some("lab"));
    }

    #[tokio::test]
    async fn get_unknown_key_is_none() {
        let store = MemoryRecordStore::new();
        assert!(store.get("act-missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_conflicts_with_existing_record() {
        let store = MemoryRecordStore::new();
        let record = ActivationRecord::issue(None);
        store.put(&record, None).await.unwrap();

        assert!(matches!(
            store.put(&record, None).await,
            Err(StoreError::VersionConflict)
        ));
    }

    #[tokio::test]
    async fn stale_version_write_is_rejected() {
        let store = MemoryRecordStore::new();
        let mut record = ActivationRecord::issue(None);
        store.put(&record, None).await.unwrap();

        // Two writers read version 1; the first write wins.
        record.label = Some("writer one".to_string());
        let version = store.put(&record, Some(1)).await.unwrap();
        assert_eq!(version, 2);

        record.label = Some("writer two".to_string());
        assert!(matches!(
            store.put(&record, Some(1)).await,
            Err(StoreError::VersionConflict)
        ));

        let fetched = store.get(&record.key).await.unwrap().unwrap();
        assert_eq!(fetched.record.label.as_deref(), Some("writer one"));
    }

    #[tokio::test]
    async fn list_returns_every_record() {
        let store = MemoryRecordStore::new();
        for _ in 0..3 {
            store
                .put(&ActivationRecord::issue(None), None)
                .await
                .unwrap();
        }
        assert_eq!(store.list().await.unwrap().len(), 3);
    }
}
