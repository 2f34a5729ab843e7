//! User → role binding reads.
//!
//! Users are owned by the identity layer; this table only mirrors the role
//! each user holds.

use segura_authz::User;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;

use crate::{PgPool, StorageResult};

type UserRow = (String, String, Option<String>, bool);

fn user_from_row((id, username, role_id, active): UserRow) -> User {
    User {
        id,
        username,
        role_id,
        active,
    }
}

/// User table operations.
pub struct PgUserStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> PgUserStorage<'a> {
    /// Create a new user storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find an active user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_active(&self, user_id: &str) -> StorageResult<Option<User>> {
        let row: Option<UserRow> = query_as(
            r#"
            SELECT id, username, role_id, active
            FROM authz_user
            WHERE id = $1 AND active
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    /// Insert or replace a user row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn upsert(&self, user: &User) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO authz_user (id, username, role_id, active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET username = EXCLUDED.username,
                role_id = EXCLUDED.role_id,
                active = EXCLUDED.active
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(user.role_id.as_deref())
        .bind(user.active)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
