//! Permission table operations.

use segura_authz::Permission;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;

use crate::{PgPool, StorageError, StorageResult};

type PermissionRow = (String, String, Option<String>, bool);

fn permission_from_row((id, name, description, active): PermissionRow) -> Permission {
    Permission {
        id,
        name,
        description,
        active,
    }
}

/// Permission table operations.
pub struct PgPermissionStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> PgPermissionStorage<'a> {
    /// Create a new permission storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find an active permission by its unique name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_active(&self, name: &str) -> StorageResult<Option<Permission>> {
        let row: Option<PermissionRow> = query_as(
            r#"
            SELECT id, name, description, active
            FROM authz_permission
            WHERE name = $1 AND active
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(permission_from_row))
    }

    /// List active permissions ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_active(&self) -> StorageResult<Vec<Permission>> {
        let rows: Vec<PermissionRow> = query_as(
            r#"
            SELECT id, name, description, active
            FROM authz_permission
            WHERE active
            ORDER BY name
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(permission_from_row).collect())
    }

    /// Insert a permission.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id or name is taken.
    pub async fn create(&self, permission: &Permission) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO authz_permission (id, name, description, active)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&permission.id)
        .bind(&permission.name)
        .bind(permission.description.as_deref())
        .bind(permission.active)
        .execute(self.pool)
        .await
        .map_err(|e| {
            StorageError::on_unique_violation(
                e,
                format!("Permission already exists: {}", permission.name),
            )
        })?;

        Ok(())
    }

    /// Return the permission named like `candidate`, inserting it first when
    /// absent. The boolean is `true` when this call inserted the row.
    ///
    /// The unique constraint on `name` decides concurrent callers: the
    /// losing insert does nothing and every caller reads the winning row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert or query fails.
    pub async fn get_or_create(&self, candidate: &Permission) -> StorageResult<(Permission, bool)> {
        let inserted: Option<String> = query_scalar(
            r#"
            INSERT INTO authz_permission (id, name, description, active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&candidate.id)
        .bind(&candidate.name)
        .bind(candidate.description.as_deref())
        .bind(candidate.active)
        .fetch_optional(self.pool)
        .await?;

        let row: PermissionRow = query_as(
            r#"
            SELECT id, name, description, active
            FROM authz_permission
            WHERE name = $1
            "#,
        )
        .bind(&candidate.name)
        .fetch_one(self.pool)
        .await?;

        Ok((permission_from_row(row), inserted.is_some()))
    }
}
