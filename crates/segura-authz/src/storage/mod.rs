//! Storage traits for the authorization directory.
//!
//! The directory owns every row the engine reads: users (role binding only),
//! roles, permissions, views, grants and the audit trail. Each collection is
//! exposed through a small async trait so that backends can be swapped.
//!
//! # Implementations
//!
//! Storage implementations are provided in separate crates:
//!
//! - `segura-authz-memory` - lock-free in-memory backend
//! - `segura-authz-postgres` - PostgreSQL backend
//!
//! # Inactive records
//!
//! Lookups named `find_active_*` and `list_active` never return inactive
//! rows. Roles, permissions and views are soft-deactivated; callers treat an
//! inactive record exactly like a missing one.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthzResult;
use crate::audit::{AuditEntry, AuditFilter};
use crate::types::{Grant, Permission, Role, User, View};

/// Outcome of an idempotent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// An identical row already existed; nothing was written.
    AlreadyExists,
}

impl InsertOutcome {
    /// Returns `true` if a row was written.
    #[must_use]
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}

// =============================================================================
// Entity Storage Traits
// =============================================================================

/// Read access to the user → role binding.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Find an active user by id.
    async fn find_active_user(&self, user_id: &str) -> AuthzResult<Option<User>>;
}

/// Storage operations for roles.
#[async_trait]
pub trait RoleStorage: Send + Sync {
    /// Find an active role by id.
    async fn find_active_role(&self, role_id: &str) -> AuthzResult<Option<Role>>;

    /// List every active role, ordered by access level then name.
    async fn list_active_roles(&self) -> AuthzResult<Vec<Role>>;

    /// Create a role.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Conflict` if a role with the same name exists.
    async fn create_role(&self, role: &Role) -> AuthzResult<()>;

    /// Set the active flag of a role.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::NotFound` if the role does not exist.
    async fn set_role_active(&self, role_id: &str, active: bool) -> AuthzResult<()>;
}

/// Storage operations for permissions.
#[async_trait]
pub trait PermissionStorage: Send + Sync {
    /// Find an active permission by its unique name.
    async fn find_active_permission(&self, name: &str) -> AuthzResult<Option<Permission>>;

    /// List every active permission, ordered by name.
    async fn list_active_permissions(&self) -> AuthzResult<Vec<Permission>>;

    /// Create a permission.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Conflict` if the name is taken.
    async fn create_permission(&self, permission: &Permission) -> AuthzResult<()>;

    /// Return the permission named `candidate.name`, inserting `candidate`
    /// when no permission with that name exists.
    ///
    /// Must be safe under concurrent callers: the name uniqueness of the
    /// store decides the winner and every caller observes the same row.
    /// The boolean is `true` when this call created the row.
    async fn get_or_create_permission(
        &self,
        candidate: &Permission,
    ) -> AuthzResult<(Permission, bool)>;
}

/// Storage operations for views.
#[async_trait]
pub trait ViewStorage: Send + Sync {
    /// Find an active view by id.
    async fn find_active_view(&self, view_id: &str) -> AuthzResult<Option<View>>;

    /// Find every active view whose route equals `route` verbatim.
    async fn find_active_views_by_route(&self, route: &str) -> AuthzResult<Vec<View>>;

    /// List every active view, ordered by route then name.
    async fn list_active_views(&self) -> AuthzResult<Vec<View>>;

    /// Create a view.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Conflict` if the name is taken.
    async fn create_view(&self, view: &View) -> AuthzResult<()>;

    /// Set the active flag of a view.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::NotFound` if the view does not exist.
    async fn set_view_active(&self, view_id: &str, active: bool) -> AuthzResult<()>;
}

/// Storage operations for grants.
#[async_trait]
pub trait GrantStorage: Send + Sync {
    /// Returns `true` if the exact triple exists.
    async fn grant_exists(&self, grant: &Grant) -> AuthzResult<bool>;

    /// Returns `true` if any grant exists for (role, view).
    async fn any_grant_exists(&self, role_id: &str, view_id: &str) -> AuthzResult<bool>;

    /// Insert a grant unless the triple already exists.
    async fn insert_grant(&self, grant: &Grant) -> AuthzResult<InsertOutcome>;

    /// Delete every grant for (role, view), returning how many were removed.
    async fn delete_grants(&self, role_id: &str, view_id: &str) -> AuthzResult<u64>;

    /// Ids of the views a role holds `permission_id` on, without duplicates.
    async fn view_ids_with_permission(
        &self,
        role_id: &str,
        permission_id: &str,
    ) -> AuthzResult<Vec<String>>;

    /// Number of grants for (role, view).
    async fn count_grants_for(&self, role_id: &str, view_id: &str) -> AuthzResult<u64>;

    /// Total number of grant rows.
    async fn count_grants(&self) -> AuthzResult<u64>;
}

/// Storage operations for the audit trail.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Append an entry.
    async fn record(&self, entry: &AuditEntry) -> AuthzResult<()>;

    /// Query entries, newest first.
    async fn search(&self, filter: &AuditFilter) -> AuthzResult<Vec<AuditEntry>>;
}

// =============================================================================
// Directory
// =============================================================================

/// Everything a single backend must provide to serve as a directory.
pub trait DirectoryBackend:
    UserStorage
    + RoleStorage
    + PermissionStorage
    + ViewStorage
    + GrantStorage
    + AuditStorage
    + 'static
{
}

impl<T> DirectoryBackend for T where
    T: UserStorage
        + RoleStorage
        + PermissionStorage
        + ViewStorage
        + GrantStorage
        + AuditStorage
        + 'static
{
}

/// Handles to every directory collection.
///
/// Collections may come from different backends; [`Directory::from_backend`]
/// wires all of them to a single one.
#[derive(Clone)]
pub struct Directory {
    /// User → role binding.
    pub users: Arc<dyn UserStorage>,
    /// Roles.
    pub roles: Arc<dyn RoleStorage>,
    /// Permissions.
    pub permissions: Arc<dyn PermissionStorage>,
    /// Views.
    pub views: Arc<dyn ViewStorage>,
    /// Grants.
    pub grants: Arc<dyn GrantStorage>,
    /// Audit trail.
    pub audit: Arc<dyn AuditStorage>,
}

impl Directory {
    /// Uses one backend for every collection.
    #[must_use]
    pub fn from_backend<B: DirectoryBackend>(backend: Arc<B>) -> Self {
        Self {
            users: backend.clone(),
            roles: backend.clone(),
            permissions: backend.clone(),
            views: backend.clone(),
            grants: backend.clone(),
            audit: backend,
        }
    }
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory").finish_non_exhaustive()
    }
}
