//! Grant table operations.
//!
//! The primary key `(role_id, view_id, permission_id)` makes every insert
//! idempotent.

use segura_authz::Grant;
use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;

use crate::{PgPool, StorageResult};

/// Grant table operations.
pub struct PgGrantStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> PgGrantStorage<'a> {
    /// Create a new grant storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Check whether the exact triple exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn exists(&self, grant: &Grant) -> StorageResult<bool> {
        let exists: bool = query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM authz_grant
                WHERE role_id = $1 AND view_id = $2 AND permission_id = $3
            )
            "#,
        )
        .bind(&grant.role_id)
        .bind(&grant.view_id)
        .bind(&grant.permission_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Check whether any grant exists for (role, view).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn any_exists(&self, role_id: &str, view_id: &str) -> StorageResult<bool> {
        let exists: bool = query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM authz_grant WHERE role_id = $1 AND view_id = $2
            )
            "#,
        )
        .bind(role_id)
        .bind(view_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Insert a grant unless it exists. Returns `true` if a row was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn insert(&self, grant: &Grant) -> StorageResult<bool> {
        let result = query(
            r#"
            INSERT INTO authz_grant (role_id, view_id, permission_id)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&grant.role_id)
        .bind(&grant.view_id)
        .bind(&grant.permission_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete every grant for (role, view).
    ///
    /// # Returns
    ///
    /// Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete_for(&self, role_id: &str, view_id: &str) -> StorageResult<u64> {
        let result = query("DELETE FROM authz_grant WHERE role_id = $1 AND view_id = $2")
            .bind(role_id)
            .bind(view_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Distinct ids of the views a role holds a permission on.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn view_ids_with_permission(
        &self,
        role_id: &str,
        permission_id: &str,
    ) -> StorageResult<Vec<String>> {
        let ids: Vec<String> = query_scalar(
            r#"
            SELECT DISTINCT view_id
            FROM authz_grant
            WHERE role_id = $1 AND permission_id = $2
            ORDER BY view_id
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    /// Count grants for (role, view).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_for(&self, role_id: &str, view_id: &str) -> StorageResult<u64> {
        let count: i64 =
            query_scalar("SELECT COUNT(*) FROM authz_grant WHERE role_id = $1 AND view_id = $2")
                .bind(role_id)
                .bind(view_id)
                .fetch_one(self.pool)
                .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Count every grant row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self) -> StorageResult<u64> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM authz_grant")
            .fetch_one(self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}
