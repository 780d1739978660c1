// SPDX-License-Identifier: BUSL-1.1
//! Document persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `documents` table,
//! where each row is one [`Record`] keyed by `(collection, id)`. The body
//! column holds the domain fields only; id and timestamps have their own
//! columns.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use survey_core::{Document, Record};
use uuid::Uuid;

/// Insert or replace a record.
pub async fn upsert<T: Document>(pool: &PgPool, record: &Record<T>) -> Result<(), sqlx::Error> {
    let body = serde_json::to_value(&record.doc).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        "INSERT INTO documents (collection, id, body, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (collection, id)
         DO UPDATE SET body = EXCLUDED.body, updated_at = EXCLUDED.updated_at",
    )
    .bind(T::COLLECTION)
    .bind(record.id)
    .bind(body)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write several records of one collection. Stops at the first failure.
pub async fn upsert_many<T: Document>(
    pool: &PgPool,
    records: &[Record<T>],
) -> Result<(), sqlx::Error> {
    for record in records {
        upsert(pool, record).await?;
    }
    Ok(())
}

/// Delete a record. Returns whether a row existed.
pub async fn delete(pool: &PgPool, collection: &str, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
        .bind(collection)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Load every record of a collection, oldest first.
///
/// Rows whose body no longer deserializes into `T` are skipped with an
/// error log rather than failing startup.
pub async fn load_all<T: Document>(pool: &PgPool) -> Result<Vec<Record<T>>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, body, created_at, updated_at
         FROM documents WHERE collection = $1 ORDER BY created_at, id",
    )
    .bind(T::COLLECTION)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.id;
        match row.into_record::<T>() {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::error!(
                    collection = T::COLLECTION,
                    %id,
                    error = %e,
                    "skipping document row with unreadable body during load_all"
                );
            }
        }
    }
    Ok(records)
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    body: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_record<T: Document>(self) -> Result<Record<T>, serde_json::Error> {
        Ok(Record {
            id: self.id,
            doc: serde_json::from_value(self.body)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
