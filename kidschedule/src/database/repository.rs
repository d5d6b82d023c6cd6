//! Repository layer for database operations
//!
//! Records are opaque JSON bodies addressed by key. Every write replaces the
//! whole record in a single statement, so readers never see a partial body.

use super::models::StoredRecord;
use crate::error::Result;
use chrono::Utc;
use sqlx::SqlitePool;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a record by key
    pub async fn get_record(&self, key: &str) -> Result<Option<StoredRecord>> {
        let record = sqlx::query_as::<_, StoredRecord>(
            r#"
            SELECT key, body, schema_version, updated_at FROM documents WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Insert or fully overwrite a record
    pub async fn put_record(&self, key: &str, body: &str, schema_version: i64) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO documents (key, body, schema_version, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                schema_version = excluded.schema_version,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(body)
        .bind(schema_version)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Wrote record: {} ({} bytes)", key, body.len());
        Ok(())
    }

    /// Copy a record under `to_key`, leaving the original untouched.
    ///
    /// Nothing is written when the source does not exist or when a record
    /// under `copies_prefix` already holds the same body and version.
    /// Returns whether a new copy was made. Only the body and version columns
    /// of the source are read, so a row with a damaged timestamp still copies.
    pub async fn copy_record(&self, from_key: &str, to_key: &str, copies_prefix: &str) -> Result<bool> {
        let now = Utc::now();

        let rows = sqlx::query(
            r#"
            INSERT OR REPLACE INTO documents (key, body, schema_version, updated_at)
            SELECT ?, src.body, src.schema_version, ? FROM documents src
            WHERE src.key = ?
              AND NOT EXISTS (
                  SELECT 1 FROM documents prior
                  WHERE substr(prior.key, 1, ?) = ?
                    AND prior.body = src.body
                    AND prior.schema_version = src.schema_version
              )
            "#,
        )
        .bind(to_key)
        .bind(now)
        .bind(from_key)
        .bind(copies_prefix.len() as i64)
        .bind(copies_prefix)
        .execute(&self.pool)
        .await?
        .rows_affected();

        tracing::debug!("Copied record {} to {} ({} rows)", from_key, to_key, rows);
        Ok(rows > 0)
    }

    /// List record keys starting with `prefix`, oldest first
    pub async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let keys: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT key FROM documents WHERE substr(key, 1, ?) = ? ORDER BY updated_at ASC
            "#,
        )
        .bind(prefix.len() as i64)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }
}
