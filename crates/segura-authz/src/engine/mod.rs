//! The authorization engine.
//!
//! [`AuthorizationEngine`] composes the directory, the [`ViewResolver`] and
//! the [`GrantEvaluator`] into the public contract:
//!
//! - three verifications returning an [`AccessDecision`]
//!   ([`verify_permission`](AuthorizationEngine::verify_permission),
//!   [`verify_view`](AuthorizationEngine::verify_view),
//!   [`verify_route`](AuthorizationEngine::verify_route))
//! - administrative operations on grants, which fail with
//!   [`AuthzError::NotFound`] when they reference an unknown role or view
//! - listings, statistics and the audit trail
//!
//! The engine keeps no mutable state: every call re-reads the directory, so
//! a revoked grant takes effect on the very next check. It is cheap to clone
//! and safe to share across tasks.
//!
//! # Example
//!
//! ```ignore
//! let engine = AuthorizationEngine::new(directory, AuthzConfig::default());
//! engine.assign_view_to_role(&role.id, &view.id).await?;
//!
//! let decision = engine.verify_route(&user.id, "/leads/42/editar").await?;
//! assert!(decision.has_access);
//! ```

mod decision;

pub use decision::{AccessDecision, DecisionOutcome};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit::{AuditAction, AuditEntry, AuditFilter, AuditTable};
use crate::config::AuthzConfig;
use crate::grants::GrantEvaluator;
use crate::resolver::ViewResolver;
use crate::storage::{Directory, InsertOutcome};
use crate::types::{Grant, Permission, Role, View};
use crate::{AuthzError, AuthzResult};

// Inner result of an evaluation step: `Err` short-circuits with a denial.
type Step<T> = Result<T, DecisionOutcome>;

// =============================================================================
// Listing and Statistics
// =============================================================================

/// A list of records with its total count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing<T> {
    /// The records.
    pub items: Vec<T>,
    /// Number of records.
    pub total: usize,
}

impl<T> Listing<T> {
    /// Wraps a vector, counting it.
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

/// Directory counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthzStats {
    /// Active views.
    pub active_views: usize,
    /// Active permissions.
    pub active_permissions: usize,
    /// Active roles.
    pub active_roles: usize,
    /// Grant rows, regardless of the state of the records they reference.
    pub total_grants: u64,
}

// =============================================================================
// Engine
// =============================================================================

/// Stateless authorization evaluator over a [`Directory`].
#[derive(Clone)]
pub struct AuthorizationEngine {
    directory: Directory,
    resolver: ViewResolver,
    evaluator: GrantEvaluator,
    config: AuthzConfig,
}

impl AuthorizationEngine {
    /// Creates an engine over a directory.
    #[must_use]
    pub fn new(directory: Directory, config: AuthzConfig) -> Self {
        let resolver = ViewResolver::new(directory.views.clone(), &config.resolver);
        let evaluator = GrantEvaluator::new(directory.grants.clone());
        Self {
            directory,
            resolver,
            evaluator,
            config,
        }
    }

    /// The underlying directory.
    #[must_use]
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    /// The view resolver used by [`verify_route`](Self::verify_route).
    #[must_use]
    pub fn resolver(&self) -> &ViewResolver {
        &self.resolver
    }

    // -------------------------------------------------------------------------
    // Verification
    // -------------------------------------------------------------------------

    /// Checks whether the user's role holds `permission_name` on the view
    /// registered at exactly `view_route`.
    ///
    /// Wildcards are not applied: the caller must name the registered route.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Verification` if the directory fails. Missing
    /// users, views or permissions are denials, not errors.
    pub async fn verify_permission(
        &self,
        user_id: &str,
        view_route: &str,
        permission_name: &str,
    ) -> AuthzResult<AccessDecision> {
        let result = self
            .evaluate_permission(user_id, view_route, permission_name)
            .await;
        Self::conclude("permission", user_id, view_route, result)
    }

    /// Checks whether the user's role holds any permission on the view
    /// registered at exactly `view_route`.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Verification` if the directory fails.
    pub async fn verify_view(&self, user_id: &str, view_route: &str) -> AuthzResult<AccessDecision> {
        let result = self.evaluate_view(user_id, view_route).await;
        Self::conclude("view", user_id, view_route, result)
    }

    /// Checks whether the user may open `full_path`, which may contain
    /// segments that are not registered verbatim.
    ///
    /// The path is resolved to candidate views (exact match first, then
    /// progressively broader wildcard patterns). Access to any one candidate
    /// is enough.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Verification` if the directory fails.
    pub async fn verify_route(&self, user_id: &str, full_path: &str) -> AuthzResult<AccessDecision> {
        let result = self.evaluate_route(user_id, full_path).await;
        Self::conclude("route", user_id, full_path, result)
    }

    async fn evaluate_permission(
        &self,
        user_id: &str,
        view_route: &str,
        permission_name: &str,
    ) -> AuthzResult<DecisionOutcome> {
        let role_id = match self.role_of(user_id).await? {
            Ok(role_id) => role_id,
            Err(denial) => return Ok(denial),
        };
        let views = match self.views_at(view_route).await? {
            Ok(views) => views,
            Err(denial) => return Ok(denial),
        };
        let Some(permission) = self
            .directory
            .permissions
            .find_active_permission(permission_name)
            .await?
        else {
            return Ok(DecisionOutcome::PermissionNotFound);
        };

        for view in &views {
            if self
                .evaluator
                .has_grant(&role_id, &view.id, Some(&permission.id))
                .await?
            {
                return Ok(DecisionOutcome::PermissionGranted);
            }
        }
        Ok(DecisionOutcome::PermissionDenied)
    }

    async fn evaluate_view(&self, user_id: &str, view_route: &str) -> AuthzResult<DecisionOutcome> {
        let role_id = match self.role_of(user_id).await? {
            Ok(role_id) => role_id,
            Err(denial) => return Ok(denial),
        };
        let views = match self.views_at(view_route).await? {
            Ok(views) => views,
            Err(denial) => return Ok(denial),
        };

        for view in &views {
            if self.evaluator.has_grant(&role_id, &view.id, None).await? {
                return Ok(DecisionOutcome::ViewGranted);
            }
        }
        Ok(DecisionOutcome::ViewDenied)
    }

    async fn evaluate_route(&self, user_id: &str, full_path: &str) -> AuthzResult<DecisionOutcome> {
        let role_id = match self.role_of(user_id).await? {
            Ok(role_id) => role_id,
            Err(denial) => return Ok(denial),
        };

        let candidates = self.resolver.resolve_views(full_path).await?;
        if candidates.is_empty() {
            return Ok(DecisionOutcome::RouteNotFound);
        }

        for view in &candidates {
            if self.evaluator.has_grant(&role_id, &view.id, None).await? {
                tracing::trace!(view.id = %view.id, view.route = %view.route, "route granted by view");
                return Ok(DecisionOutcome::RouteGranted);
            }
        }
        Ok(DecisionOutcome::RouteDenied)
    }

    /// Resolves an active user to its active role id.
    ///
    /// A role that is missing or deactivated counts as no role.
    async fn role_of(&self, user_id: &str) -> AuthzResult<Step<String>> {
        let Some(user) = self.directory.users.find_active_user(user_id).await? else {
            return Ok(Err(DecisionOutcome::UserNotFound));
        };
        let Some(role_id) = user.assigned_role() else {
            return Ok(Err(DecisionOutcome::UserWithoutRole));
        };
        match self.directory.roles.find_active_role(role_id).await? {
            Some(role) => Ok(Ok(role.id)),
            None => {
                tracing::debug!(user.id = %user_id, role.id = %role_id, "user role is inactive or missing");
                Ok(Err(DecisionOutcome::UserWithoutRole))
            }
        }
    }

    /// Active views registered at exactly `route`.
    async fn views_at(&self, route: &str) -> AuthzResult<Step<Vec<View>>> {
        let views = self.directory.views.find_active_views_by_route(route).await?;
        if views.is_empty() {
            Ok(Err(DecisionOutcome::ViewNotFound))
        } else {
            Ok(Ok(views))
        }
    }

    fn conclude(
        operation: &'static str,
        user_id: &str,
        target: &str,
        result: AuthzResult<DecisionOutcome>,
    ) -> AuthzResult<AccessDecision> {
        match result {
            Ok(outcome) => {
                tracing::debug!(
                    operation,
                    user.id = %user_id,
                    target,
                    outcome = %outcome,
                    "authorization decision"
                );
                Ok(AccessDecision::from_outcome(outcome))
            }
            Err(e) => {
                tracing::error!(
                    operation,
                    user.id = %user_id,
                    target,
                    error = %e,
                    "authorization check failed"
                );
                Err(AuthzError::verification(operation, &e))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Grant administration
    // -------------------------------------------------------------------------

    /// Grants the baseline access permission on a view to a role.
    ///
    /// The access permission is created on first use. Assigning twice is a
    /// no-op and reports [`InsertOutcome::AlreadyExists`].
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::NotFound` if the role or view does not exist or
    /// is inactive, `AuthzError::Conflict` if the access permission exists
    /// but is inactive; propagates storage errors.
    pub async fn assign_view_to_role(
        &self,
        role_id: &str,
        view_id: &str,
    ) -> AuthzResult<InsertOutcome> {
        let role = self.require_role(role_id).await?;
        let view = self.require_view(view_id).await?;
        let access = self.access_permission().await?;

        let grant = Grant::new(&role.id, &view.id, &access.id);
        let outcome = self.directory.grants.insert_grant(&grant).await?;

        if outcome.is_inserted() {
            tracing::info!(
                role.id = %role.id,
                role.name = %role.name,
                view.id = %view.id,
                view.route = %view.route,
                "view assigned to role"
            );
            self.record(
                AuditEntry::new(AuditTable::Grant, AuditAction::Assign, grant_key(&grant))
                    .with_details(json!({
                        "roleId": role.id,
                        "viewId": view.id,
                        "permissionId": access.id,
                    })),
            )
            .await;
        } else {
            tracing::debug!(role.id = %role.id, view.id = %view.id, "view already assigned to role");
        }
        Ok(outcome)
    }

    /// Removes every grant a role holds on a view, whatever the permission.
    ///
    /// Returns the number of removed grants; zero is not an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::NotFound` if the role or view does not exist or
    /// is inactive; propagates storage errors.
    pub async fn unassign_view_from_role(&self, role_id: &str, view_id: &str) -> AuthzResult<u64> {
        let role = self.require_role(role_id).await?;
        let view = self.require_view(view_id).await?;

        let removed = self.directory.grants.delete_grants(&role.id, &view.id).await?;
        if removed > 0 {
            tracing::info!(
                role.id = %role.id,
                view.id = %view.id,
                removed,
                "view unassigned from role"
            );
            self.record(
                AuditEntry::new(
                    AuditTable::Grant,
                    AuditAction::Unassign,
                    format!("{}/{}", role.id, view.id),
                )
                .with_details(json!({
                    "roleId": role.id,
                    "viewId": view.id,
                    "removed": removed,
                })),
            )
            .await;
        }
        Ok(removed)
    }

    /// Grants a named, existing permission on a view to a role.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::NotFound` if the role, view or permission does
    /// not exist or is inactive; propagates storage errors.
    pub async fn grant_permission(
        &self,
        role_id: &str,
        view_id: &str,
        permission_name: &str,
    ) -> AuthzResult<InsertOutcome> {
        let role = self.require_role(role_id).await?;
        let view = self.require_view(view_id).await?;
        let permission = self
            .directory
            .permissions
            .find_active_permission(permission_name)
            .await?
            .ok_or_else(|| AuthzError::not_found("Permission", permission_name))?;

        let grant = Grant::new(&role.id, &view.id, &permission.id);
        let outcome = self.directory.grants.insert_grant(&grant).await?;
        if outcome.is_inserted() {
            tracing::info!(
                role.id = %role.id,
                view.id = %view.id,
                permission = %permission.name,
                "permission granted"
            );
            self.record(
                AuditEntry::new(AuditTable::Grant, AuditAction::Grant, grant_key(&grant))
                    .with_details(json!({
                        "roleId": role.id,
                        "viewId": view.id,
                        "permission": permission.name,
                    })),
            )
            .await;
        }
        Ok(outcome)
    }

    /// Active views a role holds the baseline access permission on.
    ///
    /// Empty when the access permission has never been created.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::NotFound` if the role does not exist or is
    /// inactive; propagates storage errors.
    pub async fn get_views_for_role(&self, role_id: &str) -> AuthzResult<Vec<View>> {
        let role = self.require_role(role_id).await?;
        let Some(access) = self
            .directory
            .permissions
            .find_active_permission(&self.config.access_permission.name)
            .await?
        else {
            return Ok(Vec::new());
        };

        let view_ids = self
            .directory
            .grants
            .view_ids_with_permission(&role.id, &access.id)
            .await?;

        let mut views = Vec::with_capacity(view_ids.len());
        for view_id in view_ids {
            if let Some(view) = self.directory.views.find_active_view(&view_id).await? {
                if !views.iter().any(|v: &View| v.id == view.id) {
                    views.push(view);
                }
            }
        }
        Ok(views)
    }

    /// Number of grants a role holds on a view.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn count_grants(&self, role_id: &str, view_id: &str) -> AuthzResult<u64> {
        self.directory.grants.count_grants_for(role_id, view_id).await
    }

    // -------------------------------------------------------------------------
    // Directory records
    // -------------------------------------------------------------------------

    /// Registers a role.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Conflict` if the name is taken.
    pub async fn create_role(&self, role: Role) -> AuthzResult<Role> {
        self.directory.roles.create_role(&role).await?;
        tracing::info!(role.id = %role.id, role.name = %role.name, "role created");
        Ok(role)
    }

    /// Soft-deactivates a role. Its grants stay but no longer resolve.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::NotFound` if the role does not exist.
    pub async fn deactivate_role(&self, role_id: &str) -> AuthzResult<()> {
        self.directory.roles.set_role_active(role_id, false).await?;
        tracing::info!(role.id = %role_id, "role deactivated");
        Ok(())
    }

    /// Registers a view.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Conflict` if the name is taken.
    pub async fn create_view(&self, view: View) -> AuthzResult<View> {
        self.directory.views.create_view(&view).await?;
        tracing::info!(view.id = %view.id, view.route = %view.route, "view created");
        Ok(view)
    }

    /// Soft-deactivates a view.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::NotFound` if the view does not exist.
    pub async fn deactivate_view(&self, view_id: &str) -> AuthzResult<()> {
        self.directory.views.set_view_active(view_id, false).await?;
        tracing::info!(view.id = %view_id, "view deactivated");
        Ok(())
    }

    /// Registers a permission.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Conflict` if the name is taken.
    pub async fn create_permission(&self, permission: Permission) -> AuthzResult<Permission> {
        self.directory.permissions.create_permission(&permission).await?;
        tracing::info!(permission.id = %permission.id, permission.name = %permission.name, "permission created");
        Ok(permission)
    }

    // -------------------------------------------------------------------------
    // Listings
    // -------------------------------------------------------------------------

    /// Every active role.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn list_active_roles(&self) -> AuthzResult<Listing<Role>> {
        Ok(Listing::new(self.directory.roles.list_active_roles().await?))
    }

    /// Every active permission.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn list_active_permissions(&self) -> AuthzResult<Listing<Permission>> {
        Ok(Listing::new(
            self.directory.permissions.list_active_permissions().await?,
        ))
    }

    /// Every active view.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn list_active_views(&self) -> AuthzResult<Listing<View>> {
        Ok(Listing::new(self.directory.views.list_active_views().await?))
    }

    /// Directory counters.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn stats(&self) -> AuthzResult<AuthzStats> {
        let (views, permissions, roles, grants) = tokio::try_join!(
            self.directory.views.list_active_views(),
            self.directory.permissions.list_active_permissions(),
            self.directory.roles.list_active_roles(),
            self.directory.grants.count_grants(),
        )?;
        Ok(AuthzStats {
            active_views: views.len(),
            active_permissions: permissions.len(),
            active_roles: roles.len(),
            total_grants: grants,
        })
    }

    /// Queries the audit trail, newest first.
    ///
    /// The configured default limit applies when the filter sets none.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn audit_log(&self, filter: &AuditFilter) -> AuthzResult<Listing<AuditEntry>> {
        let mut filter = filter.clone();
        filter.limit.get_or_insert(self.config.audit.default_limit);
        Ok(Listing::new(self.directory.audit.search(&filter).await?))
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn require_role(&self, role_id: &str) -> AuthzResult<Role> {
        self.directory
            .roles
            .find_active_role(role_id)
            .await?
            .ok_or_else(|| AuthzError::not_found("Role", role_id))
    }

    async fn require_view(&self, view_id: &str) -> AuthzResult<View> {
        self.directory
            .views
            .find_active_view(view_id)
            .await?
            .ok_or_else(|| AuthzError::not_found("View", view_id))
    }

    /// Finds the baseline access permission, creating it on first use.
    ///
    /// A deactivated access permission is never granted through: the
    /// assignment fails with `Conflict`, so assign and
    /// [`get_views_for_role`](Self::get_views_for_role) agree that an inactive
    /// `acceso` carries no access.
    async fn access_permission(&self) -> AuthzResult<Permission> {
        let settings = &self.config.access_permission;
        let candidate =
            Permission::new(settings.name.as_str()).with_description(settings.description.as_str());
        let (permission, created) = self
            .directory
            .permissions
            .get_or_create_permission(&candidate)
            .await?;

        if created {
            tracing::info!(
                permission.id = %permission.id,
                permission.name = %permission.name,
                "access permission created"
            );
            self.record(
                AuditEntry::new(AuditTable::Permission, AuditAction::Create, &permission.id)
                    .with_details(json!({ "name": permission.name })),
            )
            .await;
        }
        if !permission.active {
            tracing::warn!(
                permission.id = %permission.id,
                permission.name = %permission.name,
                "access permission is inactive"
            );
            return Err(AuthzError::conflict(format!(
                "Access permission '{}' is inactive",
                permission.name
            )));
        }
        Ok(permission)
    }

    async fn record(&self, entry: AuditEntry) {
        if !self.config.audit.enabled {
            return;
        }
        if let Err(e) = self.directory.audit.record(&entry).await {
            tracing::warn!(
                error = %e,
                table = %entry.table,
                action = %entry.action,
                "failed to record audit entry"
            );
        }
    }
}

impl std::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn grant_key(grant: &Grant) -> String {
    format!("{}/{}/{}", grant.role_id, grant.view_id, grant.permission_id)
}
