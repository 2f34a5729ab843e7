//! `segura-authz` storage traits for [`PgDirectory`].

use async_trait::async_trait;
use segura_authz::storage::{
    AuditStorage, GrantStorage, InsertOutcome, PermissionStorage, RoleStorage, UserStorage,
    ViewStorage,
};
use segura_authz::{
    AuditEntry, AuditFilter, AuthzError, AuthzResult, Grant, Permission, Role, User, View,
};

use crate::{PgDirectory, StorageError};

/// Not-found rows map to the engine's `NotFound` with the entity name.
fn not_found_as(entity: &'static str, id: &str) -> impl FnOnce(StorageError) -> AuthzError {
    move |err| {
        if err.is_not_found() {
            AuthzError::not_found(entity, id)
        } else {
            AuthzError::from(err)
        }
    }
}

#[async_trait]
impl UserStorage for PgDirectory {
    async fn find_active_user(&self, user_id: &str) -> AuthzResult<Option<User>> {
        Ok(self.users().find_active(user_id).await?)
    }
}

#[async_trait]
impl RoleStorage for PgDirectory {
    async fn find_active_role(&self, role_id: &str) -> AuthzResult<Option<Role>> {
        Ok(self.roles().find_active(role_id).await?)
    }

    async fn list_active_roles(&self) -> AuthzResult<Vec<Role>> {
        Ok(self.roles().list_active().await?)
    }

    async fn create_role(&self, role: &Role) -> AuthzResult<()> {
        Ok(self.roles().create(role).await?)
    }

    async fn set_role_active(&self, role_id: &str, active: bool) -> AuthzResult<()> {
        self.roles()
            .set_active(role_id, active)
            .await
            .map_err(not_found_as("Role", role_id))
    }
}

#[async_trait]
impl PermissionStorage for PgDirectory {
    async fn find_active_permission(&self, name: &str) -> AuthzResult<Option<Permission>> {
        Ok(self.permissions().find_active(name).await?)
    }

    async fn list_active_permissions(&self) -> AuthzResult<Vec<Permission>> {
        Ok(self.permissions().list_active().await?)
    }

    async fn create_permission(&self, permission: &Permission) -> AuthzResult<()> {
        Ok(self.permissions().create(permission).await?)
    }

    async fn get_or_create_permission(
        &self,
        candidate: &Permission,
    ) -> AuthzResult<(Permission, bool)> {
        Ok(self.permissions().get_or_create(candidate).await?)
    }
}

#[async_trait]
impl ViewStorage for PgDirectory {
    async fn find_active_view(&self, view_id: &str) -> AuthzResult<Option<View>> {
        Ok(self.views().find_active(view_id).await?)
    }

    async fn find_active_views_by_route(&self, route: &str) -> AuthzResult<Vec<View>> {
        Ok(self.views().find_active_by_route(route).await?)
    }

    async fn list_active_views(&self) -> AuthzResult<Vec<View>> {
        Ok(self.views().list_active().await?)
    }

    async fn create_view(&self, view: &View) -> AuthzResult<()> {
        Ok(self.views().create(view).await?)
    }

    async fn set_view_active(&self, view_id: &str, active: bool) -> AuthzResult<()> {
        self.views()
            .set_active(view_id, active)
            .await
            .map_err(not_found_as("View", view_id))
    }
}

#[async_trait]
impl GrantStorage for PgDirectory {
    async fn grant_exists(&self, grant: &Grant) -> AuthzResult<bool> {
        Ok(self.grants().exists(grant).await?)
    }

    async fn any_grant_exists(&self, role_id: &str, view_id: &str) -> AuthzResult<bool> {
        Ok(self.grants().any_exists(role_id, view_id).await?)
    }

    async fn insert_grant(&self, grant: &Grant) -> AuthzResult<InsertOutcome> {
        if self.grants().insert(grant).await? {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    async fn delete_grants(&self, role_id: &str, view_id: &str) -> AuthzResult<u64> {
        Ok(self.grants().delete_for(role_id, view_id).await?)
    }

    async fn view_ids_with_permission(
        &self,
        role_id: &str,
        permission_id: &str,
    ) -> AuthzResult<Vec<String>> {
        Ok(self
            .grants()
            .view_ids_with_permission(role_id, permission_id)
            .await?)
    }

    async fn count_grants_for(&self, role_id: &str, view_id: &str) -> AuthzResult<u64> {
        Ok(self.grants().count_for(role_id, view_id).await?)
    }

    async fn count_grants(&self) -> AuthzResult<u64> {
        Ok(self.grants().count().await?)
    }
}

#[async_trait]
impl AuditStorage for PgDirectory {
    async fn record(&self, entry: &AuditEntry) -> AuthzResult<()> {
        Ok(self.audit().record(entry).await?)
    }

    async fn search(&self, filter: &AuditFilter) -> AuthzResult<Vec<AuditEntry>> {
        Ok(self.audit().search(filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_carries_entity() {
        let err = not_found_as("Role", "r1")(StorageError::not_found("Role r1"));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Role not found: r1");
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = not_found_as("Role", "r1")(StorageError::conflict("dup"));
        assert!(err.is_conflict());
    }
}
