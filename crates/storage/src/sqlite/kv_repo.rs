use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{KeyInfo, KeyValueStore, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl KeyValueStore for SqliteRepository {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM local_storage WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.map(|row| row.try_get::<String, _>("value").map_err(ser))
            .transpose()
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO local_storage (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM local_storage WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        Ok(res.rows_affected() > 0)
    }

    async fn entries_with_prefix(&self, prefix: &str) -> Result<Vec<KeyInfo>, StorageError> {
        let prefix_len = i64::try_from(prefix.chars().count())
            .map_err(|_| StorageError::InvalidKey(prefix.to_string()))?;

        let rows = sqlx::query(
            r"
            SELECT key, length(CAST(value AS BLOB)) AS bytes
            FROM local_storage
            WHERE substr(key, 1, ?2) = ?1
            ORDER BY key ASC
            ",
        )
        .bind(prefix)
        .bind(prefix_len)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let bytes: i64 = row.try_get("bytes").map_err(ser)?;
            out.push(KeyInfo {
                key: row.try_get("key").map_err(ser)?,
                bytes: u64::try_from(bytes)
                    .map_err(|_| StorageError::Serialization(format!("invalid size: {bytes}")))?,
            });
        }
        Ok(out)
    }
}
