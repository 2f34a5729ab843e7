//! Role table operations.

use segura_authz::Role;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;

use crate::{PgPool, StorageError, StorageResult};

type RoleRow = (String, String, i32, Option<String>, bool, OffsetDateTime);

fn role_from_row((id, name, access_level, description, active, created_at): RoleRow) -> Role {
    Role {
        id,
        name,
        access_level,
        description,
        active,
        created_at,
    }
}

/// Role table operations.
pub struct PgRoleStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> PgRoleStorage<'a> {
    /// Create a new role storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find an active role by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_active(&self, role_id: &str) -> StorageResult<Option<Role>> {
        let row: Option<RoleRow> = query_as(
            r#"
            SELECT id, name, access_level, description, active, created_at
            FROM authz_role
            WHERE id = $1 AND active
            "#,
        )
        .bind(role_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(role_from_row))
    }

    /// List active roles ordered by access level, then name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_active(&self) -> StorageResult<Vec<Role>> {
        let rows: Vec<RoleRow> = query_as(
            r#"
            SELECT id, name, access_level, description, active, created_at
            FROM authz_role
            WHERE active
            ORDER BY access_level, name
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(role_from_row).collect())
    }

    /// Insert a role.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id or name is taken.
    pub async fn create(&self, role: &Role) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO authz_role (id, name, access_level, description, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&role.id)
        .bind(&role.name)
        .bind(role.access_level)
        .bind(role.description.as_deref())
        .bind(role.active)
        .bind(role.created_at)
        .execute(self.pool)
        .await
        .map_err(|e| StorageError::on_unique_violation(e, format!("Role already exists: {}", role.name)))?;

        Ok(())
    }

    /// Set the active flag.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no role has this id.
    pub async fn set_active(&self, role_id: &str, active: bool) -> StorageResult<()> {
        let result = query("UPDATE authz_role SET active = $2 WHERE id = $1")
            .bind(role_id)
            .bind(active)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("Role {role_id}")));
        }
        Ok(())
    }
}
