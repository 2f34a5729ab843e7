//! PostgreSQL directory backend for Segura authorization.
//!
//! Provides persistent storage for:
//!
//! - Users (role binding only)
//! - Roles, permissions and views
//! - Role × View × Permission grants
//! - The administrative audit trail
//!
//! Tables live in the public schema and are created by the embedded
//! migrations in [`migrations`]. Name uniqueness and the grant primary key
//! are enforced by the database, which is what makes the lazy creation of
//! the access permission and concurrent grant inserts safe across server
//! instances.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use segura_authz::{AuthorizationEngine, AuthzConfig, Directory};
//! use segura_authz_postgres::PgDirectory;
//!
//! let directory = PgDirectory::connect("postgres://localhost/segura", 10).await?;
//! directory.migrate().await?;
//!
//! let engine = AuthorizationEngine::new(
//!     Directory::from_backend(Arc::new(directory)),
//!     AuthzConfig::default(),
//! );
//! ```

pub mod audit;
mod directory;
pub mod grant;
pub mod migrations;
pub mod permission;
pub mod role;
pub mod user;
pub mod view;

use std::sync::Arc;

use segura_authz::AuthzError;
use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use audit::PgAuditStorage;
pub use grant::PgGrantStorage;
pub use permission::PgPermissionStorage;
pub use role::PgRoleStorage;
pub use user::PgUserStorage;
pub use view::PgViewStorage;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during directory storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Requested row was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored row could not be decoded.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(String),
}

impl StorageError {
    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create an `InvalidRow` error.
    #[must_use]
    pub fn invalid_row(message: impl Into<String>) -> Self {
        Self::InvalidRow(message.into())
    }

    /// Maps a unique violation to `Conflict`, leaving other errors as they
    /// are.
    #[must_use]
    pub fn on_unique_violation(err: sqlx_core::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx_core::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(message.into())
            }
            _ => Self::Database(err),
        }
    }

    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Returns `true` if this is a client error (4xx equivalent).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Conflict(_))
    }

    /// Returns `true` if this is a server error (5xx equivalent).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::InvalidRow(_) | Self::Migration(_)
        )
    }
}

impl From<StorageError> for AuthzError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(message) => AuthzError::conflict(message),
            other => AuthzError::storage(other.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Directory
// =============================================================================

/// PostgreSQL directory backend.
///
/// Holds a connection pool and hands out table-scoped storage types. The
/// `segura-authz` storage traits are implemented on this type.
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: Arc<PgPool>,
}

impl PgDirectory {
    /// Create a directory over an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create a directory by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str, pool_size: u32) -> StorageResult<Self> {
        use sqlx_core::pool::PoolOptions;
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(pool_size)
            .connect(database_url)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Migration` if a migration fails.
    pub async fn migrate(&self) -> StorageResult<()> {
        migrations::run(&self.pool).await
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // -------------------------------------------------------------------------
    // Storage Accessors
    // -------------------------------------------------------------------------

    /// User table operations.
    #[must_use]
    pub fn users(&self) -> PgUserStorage<'_> {
        PgUserStorage::new(&self.pool)
    }

    /// Role table operations.
    #[must_use]
    pub fn roles(&self) -> PgRoleStorage<'_> {
        PgRoleStorage::new(&self.pool)
    }

    /// Permission table operations.
    #[must_use]
    pub fn permissions(&self) -> PgPermissionStorage<'_> {
        PgPermissionStorage::new(&self.pool)
    }

    /// View table operations.
    #[must_use]
    pub fn views(&self) -> PgViewStorage<'_> {
        PgViewStorage::new(&self.pool)
    }

    /// Grant table operations.
    #[must_use]
    pub fn grants(&self) -> PgGrantStorage<'_> {
        PgGrantStorage::new(&self.pool)
    }

    /// Audit table operations.
    #[must_use]
    pub fn audit(&self) -> PgAuditStorage<'_> {
        PgAuditStorage::new(&self.pool)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_not_found() {
        let err = StorageError::not_found("Role r1");
        assert!(err.is_not_found());
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert_eq!(err.to_string(), "Not found: Role r1");
    }

    #[test]
    fn test_conflict_maps_to_authz_conflict() {
        let err = AuthzError::from(StorageError::conflict("name taken"));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_other_errors_map_to_storage() {
        let err = AuthzError::from(StorageError::invalid_row("bad action"));
        assert!(matches!(err, AuthzError::Storage { .. }));
        assert!(err.is_server_error());
    }

    #[test]
    fn test_non_database_error_is_not_a_conflict() {
        let err = StorageError::on_unique_violation(sqlx_core::Error::RowNotFound, "dup");
        assert!(err.is_database_error());
    }
}
