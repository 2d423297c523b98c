//! PostgreSQL record store.
//!
//! One row per activation key in `activation_records`: the serialized
//! record as JSONB plus a version column backing the conditional write.
//! The table is the namespace; nothing else writes to it.

use async_trait::async_trait;

use crate::db::DbPool;
use crate::models::record::ActivationRecord;
use crate::store::{RecordStore, StoreError, VersionedRecord};

/// Page size for the internal list scan.
const LIST_PAGE_SIZE: i64 = 500;

/// `RecordStore` backed by the shared PostgreSQL pool.
pub struct PgRecordStore {
    pool: DbPool,
}

impl PgRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn decode(key: &str, value: serde_json::Value) -> Result<ActivationRecord, StoreError> {
    serde_json::from_value(value)
        .map_err(|err| StoreError::Unavailable(format!("corrupt record for {key}: {err}")))
}

fn encode(record: &ActivationRecord) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(record)
        .map_err(|err| StoreError::Unavailable(format!("unencodable record: {err}")))
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedRecord>, StoreError> {
        let row: Option<(i64, serde_json::Value)> = sqlx::query_as(
            "SELECT version, record FROM activation_records WHERE record_key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        match row {
            Some((version, value)) => Ok(Some(VersionedRecord {
                record: decode(key, value)?,
                version,
            })),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        record: &ActivationRecord,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError> {
        let value = encode(record)?;

        let rows_affected = match expected_version {
            // Create: ON CONFLICT DO NOTHING turns a racing duplicate
            // into rows_affected = 0 instead of an error.
            None => sqlx::query(
                r#"
                INSERT INTO activation_records (record_key, version, record)
                VALUES ($1, 1, $2)
                ON CONFLICT (record_key) DO NOTHING
                "#,
            )
            .bind(&record.key)
            .bind(&value)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?
            .rows_affected(),

            // Overwrite: only lands if the version is still the one read.
            Some(expected) => sqlx::query(
                r#"
                UPDATE activation_records
                SET record = $2, version = version + 1
                WHERE record_key = $1 AND version = $3
                "#,
            )
            .bind(&record.key)
            .bind(&value)
            .bind(expected)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?
            .rows_affected(),
        };

        if rows_affected == 0 {
            return Err(StoreError::VersionConflict);
        }

        Ok(expected_version.map_or(1, |v| v + 1))
    }

    async fn list(&self) -> Result<Vec<ActivationRecord>, StoreError> {
        let mut all = Vec::new();
        let mut after = String::new();

        // Keyset pagination over the primary key. Callers just see the
        // full sequence.
        loop {
            let rows: Vec<(String, serde_json::Value)> = sqlx::query_as(
                r#"
                SELECT record_key, record FROM activation_records
                WHERE record_key > $1
                ORDER BY record_key
                LIMIT $2
                "#,
            )
            .bind(&after)
            .bind(LIST_PAGE_SIZE)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

            let page_len = rows.len();
            for (key, value) in rows {
                all.push(decode(&key, value)?);
                after = key;
            }

            if (page_len as i64) < LIST_PAGE_SIZE {
                return Ok(all);
            }
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(unavailable)
    }
}
