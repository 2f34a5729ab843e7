use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use tokio::sync::RwLock;

use segura_authz::storage::{
    AuditStorage, GrantStorage, InsertOutcome, PermissionStorage, RoleStorage, UserStorage,
    ViewStorage,
};
use segura_authz::{
    AuditEntry, AuditFilter, AuthzError, AuthzResult, Grant, Permission, Role, User, View,
};

/// A record with an id, a unique name and an active flag.
trait NamedRecord: Clone + Send + Sync + 'static {
    const ENTITY: &'static str;

    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn is_active(&self) -> bool;
    fn with_active_flag(&self, active: bool) -> Self;
}

impl NamedRecord for Role {
    const ENTITY: &'static str = "Role";

    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn is_active(&self) -> bool {
        self.active
    }
    fn with_active_flag(&self, active: bool) -> Self {
        Self {
            active,
            ..self.clone()
        }
    }
}

impl NamedRecord for View {
    const ENTITY: &'static str = "View";

    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn is_active(&self) -> bool {
        self.active
    }
    fn with_active_flag(&self, active: bool) -> Self {
        Self {
            active,
            ..self.clone()
        }
    }
}

/// Rows keyed by id plus a name → id index enforcing name uniqueness.
#[derive(Debug)]
struct NamedTable<T> {
    rows: PapayaHashMap<String, T>,
    names: PapayaHashMap<String, String>,
}

impl<T: NamedRecord> NamedTable<T> {
    fn new() -> Self {
        Self {
            rows: PapayaHashMap::new(),
            names: PapayaHashMap::new(),
        }
    }

    fn create(&self, record: &T) -> AuthzResult<()> {
        let names = self.names.pin();
        if names
            .try_insert(record.name().to_string(), record.id().to_string())
            .is_err()
        {
            tracing::debug!(entity = T::ENTITY, name = record.name(), "duplicate name rejected");
            return Err(AuthzError::conflict(format!(
                "{} name already exists: {}",
                T::ENTITY,
                record.name()
            )));
        }

        let rows = self.rows.pin();
        if rows
            .try_insert(record.id().to_string(), record.clone())
            .is_err()
        {
            names.remove(record.name());
            tracing::debug!(entity = T::ENTITY, id = record.id(), "duplicate id rejected");
            return Err(AuthzError::conflict(format!(
                "{} id already exists: {}",
                T::ENTITY,
                record.id()
            )));
        }
        Ok(())
    }

    fn find_active(&self, id: &str) -> Option<T> {
        self.rows
            .pin()
            .get(id)
            .filter(|row| row.is_active())
            .cloned()
    }

    fn active(&self) -> Vec<T> {
        self.rows
            .pin()
            .iter()
            .filter(|(_, row)| row.is_active())
            .map(|(_, row)| row.clone())
            .collect()
    }

    fn set_active(&self, id: &str, active: bool) -> AuthzResult<()> {
        self.rows
            .pin()
            .update(id.to_string(), |row| row.with_active_flag(active))
            .map(|_| ())
            .ok_or_else(|| AuthzError::not_found(T::ENTITY, id))
    }
}

/// In-memory directory using papaya lock-free HashMaps.
///
/// This backend provides:
/// - Lock-free concurrent reads and writes for every collection
/// - Name uniqueness for roles, views and permissions
/// - Atomic get-or-create of permissions by name
/// - Grant triples as a set, so concurrent inserts of the same triple
///   store exactly one row
/// - An audit trail bounded by [`DEFAULT_AUDIT_RETENTION`] entries (or the
///   value given to [`with_audit_retention`](Self::with_audit_retention));
///   the oldest entries are discarded first
#[derive(Debug)]
pub struct InMemoryDirectory {
    users: Arc<PapayaHashMap<String, User>>,
    roles: NamedTable<Role>,
    views: NamedTable<View>,
    /// Permissions keyed by their unique name.
    permissions: Arc<PapayaHashMap<String, Permission>>,
    grants: Arc<PapayaHashMap<Grant, ()>>,
    audit: Arc<RwLock<VecDeque<AuditEntry>>>,
    audit_retention: usize,
}

/// Audit entries kept in memory when no other retention is configured.
pub const DEFAULT_AUDIT_RETENTION: usize = 10_000;

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: Arc::new(PapayaHashMap::new()),
            roles: NamedTable::new(),
            views: NamedTable::new(),
            permissions: Arc::new(PapayaHashMap::new()),
            grants: Arc::new(PapayaHashMap::new()),
            audit: Arc::new(RwLock::new(VecDeque::new())),
            audit_retention: DEFAULT_AUDIT_RETENTION,
        }
    }

    /// Keeps at most `retention` audit entries (at least one).
    #[must_use]
    pub fn with_audit_retention(mut self, retention: usize) -> Self {
        self.audit_retention = retention.max(1);
        self
    }

    /// Inserts or replaces a user.
    ///
    /// Users are owned by the identity layer; the directory only mirrors
    /// their role binding.
    pub fn upsert_user(&self, user: User) {
        self.users.pin().insert(user.id.clone(), user);
    }

    /// Removes a user, returning `true` if it existed.
    pub fn remove_user(&self, user_id: &str) -> bool {
        self.users.pin().remove(user_id).is_some()
    }

    /// Number of stored grant rows.
    #[must_use]
    pub fn grant_count(&self) -> usize {
        self.grants.pin().len()
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserStorage for InMemoryDirectory {
    async fn find_active_user(&self, user_id: &str) -> AuthzResult<Option<User>> {
        Ok(self
            .users
            .pin()
            .get(user_id)
            .filter(|user| user.active)
            .cloned())
    }
}

// =============================================================================
// Roles
// =============================================================================

#[async_trait]
impl RoleStorage for InMemoryDirectory {
    async fn find_active_role(&self, role_id: &str) -> AuthzResult<Option<Role>> {
        Ok(self.roles.find_active(role_id))
    }

    async fn list_active_roles(&self) -> AuthzResult<Vec<Role>> {
        let mut roles = self.roles.active();
        roles.sort_by(|a, b| {
            a.access_level
                .cmp(&b.access_level)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(roles)
    }

    async fn create_role(&self, role: &Role) -> AuthzResult<()> {
        self.roles.create(role)
    }

    async fn set_role_active(&self, role_id: &str, active: bool) -> AuthzResult<()> {
        self.roles.set_active(role_id, active)
    }
}

// =============================================================================
// Permissions
// =============================================================================

#[async_trait]
impl PermissionStorage for InMemoryDirectory {
    async fn find_active_permission(&self, name: &str) -> AuthzResult<Option<Permission>> {
        Ok(self
            .permissions
            .pin()
            .get(name)
            .filter(|permission| permission.active)
            .cloned())
    }

    async fn list_active_permissions(&self) -> AuthzResult<Vec<Permission>> {
        let mut permissions: Vec<Permission> = self
            .permissions
            .pin()
            .iter()
            .filter(|(_, permission)| permission.active)
            .map(|(_, permission)| permission.clone())
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn create_permission(&self, permission: &Permission) -> AuthzResult<()> {
        let guard = self.permissions.pin();
        if guard
            .values()
            .any(|existing| existing.id == permission.id)
        {
            return Err(AuthzError::conflict(format!(
                "Permission id already exists: {}",
                permission.id
            )));
        }
        guard
            .try_insert(permission.name.clone(), permission.clone())
            .map(|_| ())
            .map_err(|_| {
                AuthzError::conflict(format!(
                    "Permission name already exists: {}",
                    permission.name
                ))
            })
    }

    async fn get_or_create_permission(
        &self,
        candidate: &Permission,
    ) -> AuthzResult<(Permission, bool)> {
        let guard = self.permissions.pin();
        match guard.try_insert(candidate.name.clone(), candidate.clone()) {
            Ok(inserted) => Ok((inserted.clone(), true)),
            Err(occupied) => {
                tracing::trace!(
                    permission.name = %candidate.name,
                    permission.id = %occupied.current.id,
                    "permission already present"
                );
                Ok((occupied.current.clone(), false))
            }
        }
    }
}

// =============================================================================
// Views
// =============================================================================

#[async_trait]
impl ViewStorage for InMemoryDirectory {
    async fn find_active_view(&self, view_id: &str) -> AuthzResult<Option<View>> {
        Ok(self.views.find_active(view_id))
    }

    async fn find_active_views_by_route(&self, route: &str) -> AuthzResult<Vec<View>> {
        let mut views: Vec<View> = self
            .views
            .active()
            .into_iter()
            .filter(|view| view.route == route)
            .collect();
        views.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(views)
    }

    async fn list_active_views(&self) -> AuthzResult<Vec<View>> {
        let mut views = self.views.active();
        views.sort_by(|a, b| a.route.cmp(&b.route).then_with(|| a.name.cmp(&b.name)));
        Ok(views)
    }

    async fn create_view(&self, view: &View) -> AuthzResult<()> {
        self.views.create(view)
    }

    async fn set_view_active(&self, view_id: &str, active: bool) -> AuthzResult<()> {
        self.views.set_active(view_id, active)
    }
}

// =============================================================================
// Grants
// =============================================================================

#[async_trait]
impl GrantStorage for InMemoryDirectory {
    async fn grant_exists(&self, grant: &Grant) -> AuthzResult<bool> {
        Ok(self.grants.pin().contains_key(grant))
    }

    async fn any_grant_exists(&self, role_id: &str, view_id: &str) -> AuthzResult<bool> {
        Ok(self
            .grants
            .pin()
            .keys()
            .any(|grant| grant.is_for(role_id, view_id)))
    }

    async fn insert_grant(&self, grant: &Grant) -> AuthzResult<InsertOutcome> {
        match self.grants.pin().try_insert(grant.clone(), ()) {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(_) => Ok(InsertOutcome::AlreadyExists),
        }
    }

    async fn delete_grants(&self, role_id: &str, view_id: &str) -> AuthzResult<u64> {
        let guard = self.grants.pin();
        let matching: Vec<Grant> = guard
            .keys()
            .filter(|grant| grant.is_for(role_id, view_id))
            .cloned()
            .collect();

        let mut removed = 0;
        for grant in &matching {
            if guard.remove(grant).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn view_ids_with_permission(
        &self,
        role_id: &str,
        permission_id: &str,
    ) -> AuthzResult<Vec<String>> {
        let mut view_ids: Vec<String> = self
            .grants
            .pin()
            .keys()
            .filter(|grant| grant.role_id == role_id && grant.permission_id == permission_id)
            .map(|grant| grant.view_id.clone())
            .collect();
        view_ids.sort();
        view_ids.dedup();
        Ok(view_ids)
    }

    async fn count_grants_for(&self, role_id: &str, view_id: &str) -> AuthzResult<u64> {
        let count = self
            .grants
            .pin()
            .keys()
            .filter(|grant| grant.is_for(role_id, view_id))
            .count();
        Ok(count as u64)
    }

    async fn count_grants(&self) -> AuthzResult<u64> {
        Ok(self.grants.pin().len() as u64)
    }
}

// =============================================================================
// Audit
// =============================================================================

#[async_trait]
impl AuditStorage for InMemoryDirectory {
    async fn record(&self, entry: &AuditEntry) -> AuthzResult<()> {
        let mut entries = self.audit.write().await;
        entries.push_back(entry.clone());
        while entries.len() > self.audit_retention {
            if let Some(dropped) = entries.pop_front() {
                tracing::trace!(audit.id = %dropped.id, "audit entry evicted");
            }
        }
        Ok(())
    }

    async fn search(&self, filter: &AuditFilter) -> AuthzResult<Vec<AuditEntry>> {
        let entries = self.audit.read().await;
        Ok(filter.apply(entries.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segura_authz::RoleKind;

    #[tokio::test]
    async fn test_role_names_are_unique() {
        let directory = InMemoryDirectory::new();
        directory
            .create_role(&Role::builder("Broker", 2).id("r1").build())
            .await
            .unwrap();

        let err = directory
            .create_role(&Role::builder("Broker", 2).id("r2").build())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(directory.find_active_role("r2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deactivated_role_is_hidden() {
        let directory = InMemoryDirectory::new();
        let role = Role::from_kind(RoleKind::Vendedor);
        directory.create_role(&role).await.unwrap();

        directory.set_role_active(&role.id, false).await.unwrap();
        assert!(directory.find_active_role(&role.id).await.unwrap().is_none());
        assert!(directory.list_active_roles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_active_on_unknown_view() {
        let directory = InMemoryDirectory::new();
        let err = directory.set_view_active("missing", false).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_or_create_returns_existing_row() {
        let directory = InMemoryDirectory::new();
        let (first, created) = directory
            .get_or_create_permission(&Permission::new("acceso"))
            .await
            .unwrap();
        assert!(created);

        let (second, created) = directory
            .get_or_create_permission(&Permission::new("acceso"))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_audit_keeps_the_newest_entries() {
        use segura_authz::{AuditAction, AuditTable};

        let directory = InMemoryDirectory::new().with_audit_retention(2);
        for record_id in ["a", "b", "c"] {
            directory
                .record(&AuditEntry::new(AuditTable::Grant, AuditAction::Assign, record_id))
                .await
                .unwrap();
        }

        let entries = directory.search(&AuditFilter::default()).await.unwrap();
        let mut ids: Vec<&str> = entries.iter().map(|e| e.record_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, ["b", "c"]);
    }

    #[tokio::test]
    async fn test_delete_grants_counts_only_the_pair() {
        let directory = InMemoryDirectory::new();
        for grant in [
            Grant::new("r1", "v1", "p1"),
            Grant::new("r1", "v1", "p2"),
            Grant::new("r1", "v2", "p1"),
        ] {
            directory.insert_grant(&grant).await.unwrap();
        }

        assert_eq!(directory.delete_grants("r1", "v1").await.unwrap(), 2);
        assert_eq!(directory.delete_grants("r1", "v1").await.unwrap(), 0);
        assert_eq!(directory.grant_count(), 1);
    }
}
