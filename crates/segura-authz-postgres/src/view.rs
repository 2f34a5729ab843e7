//! View table operations.

use segura_authz::View;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;

use crate::{PgPool, StorageError, StorageResult};

type ViewRow = (String, String, String, String, bool);

fn view_from_row((id, name, description, route, active): ViewRow) -> View {
    View {
        id,
        name,
        description,
        route,
        active,
    }
}

/// View table operations.
pub struct PgViewStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> PgViewStorage<'a> {
    /// Create a new view storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find an active view by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_active(&self, view_id: &str) -> StorageResult<Option<View>> {
        let row: Option<ViewRow> = query_as(
            r#"
            SELECT id, name, description, route, active
            FROM authz_view
            WHERE id = $1 AND active
            "#,
        )
        .bind(view_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(view_from_row))
    }

    /// Active views registered at exactly `route`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_active_by_route(&self, route: &str) -> StorageResult<Vec<View>> {
        let rows: Vec<ViewRow> = query_as(
            r#"
            SELECT id, name, description, route, active
            FROM authz_view
            WHERE route = $1 AND active
            ORDER BY name
            "#,
        )
        .bind(route)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(view_from_row).collect())
    }

    /// List active views ordered by route, then name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_active(&self) -> StorageResult<Vec<View>> {
        let rows: Vec<ViewRow> = query_as(
            r#"
            SELECT id, name, description, route, active
            FROM authz_view
            WHERE active
            ORDER BY route, name
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(view_from_row).collect())
    }

    /// Insert a view.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id or name is taken.
    pub async fn create(&self, view: &View) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO authz_view (id, name, description, route, active)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&view.id)
        .bind(&view.name)
        .bind(&view.description)
        .bind(&view.route)
        .bind(view.active)
        .execute(self.pool)
        .await
        .map_err(|e| StorageError::on_unique_violation(e, format!("View already exists: {}", view.name)))?;

        Ok(())
    }

    /// Set the active flag.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no view has this id.
    pub async fn set_active(&self, view_id: &str, active: bool) -> StorageResult<()> {
        let result = query("UPDATE authz_view SET active = $2 WHERE id = $1")
            .bind(view_id)
            .bind(active)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("View {view_id}")));
        }
        Ok(())
    }
}
