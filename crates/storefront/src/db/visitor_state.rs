//! Repository for `storefront.visitor_state`.
//!
//! Rows are opaque `(visitor, key) -> value` entries; the shopping session in
//! `ayts-core` owns their encoding.

use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;

/// Repository for per-visitor state entries.
pub struct VisitorStateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VisitorStateRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Read one entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, visitor: Uuid, key: &str) -> Result<Option<String>, RepositoryError> {
        let value = sqlx::query_scalar::<_, String>(
            r"
            SELECT value
            FROM storefront.visitor_state
            WHERE visitor_id = $1 AND key = $2
            ",
        )
        .bind(visitor)
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        Ok(value)
    }

    /// Create or replace one entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn put(&self, visitor: Uuid, key: &str, value: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.visitor_state (visitor_id, key, value, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (visitor_id, key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            ",
        )
        .bind(visitor)
        .bind(key)
        .bind(value)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete one entry. Deleting a missing entry is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, visitor: Uuid, key: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            DELETE FROM storefront.visitor_state
            WHERE visitor_id = $1 AND key = $2
            ",
        )
        .bind(visitor)
        .bind(key)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
