//! # segura-authz
//!
//! Role, view and permission authorization for the Segura insurance CRM.
//!
//! This crate provides:
//! - The directory model (users, roles, permissions, views and grants)
//! - Storage traits that backends implement
//! - Hierarchical route resolution with wildcard fallback
//! - The [`AuthorizationEngine`], which answers access questions and
//!   administers grants
//! - An audit trail of administrative changes
//!
//! ## Overview
//!
//! A [`User`] holds at most one [`Role`]. A role reaches a [`View`] (a named,
//! routed screen of the CRM) through grants, each of which names a
//! [`Permission`]. Assigning a view to a role grants the baseline `acceso`
//! permission, created on first use.
//!
//! Verifications never fail on missing data: an unknown user, view or route
//! is reported as a denied [`AccessDecision`] with a stable message. Errors
//! are reserved for storage faults and administrative misuse.
//!
//! ## Modules
//!
//! - [`config`] - Engine configuration
//! - [`types`] - Directory entities
//! - [`storage`] - Storage traits and the [`Directory`] bundle
//! - [`matcher`] - Route normalization and wildcard patterns
//! - [`resolver`] - Path to view resolution
//! - [`grants`] - Grant existence checks
//! - [`engine`] - The authorization engine
//! - [`audit`] - Audit entries and queries

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod grants;
pub mod matcher;
pub mod resolver;
pub mod storage;
pub mod types;

pub use audit::{AuditAction, AuditEntry, AuditFilter, AuditTable};
pub use config::{AuthzConfig, ConfigError};
pub use engine::{AccessDecision, AuthorizationEngine, AuthzStats, DecisionOutcome, Listing};
pub use error::{AuthzError, ErrorCategory};
pub use grants::GrantEvaluator;
pub use matcher::{RoutePattern, normalize_route, route_patterns};
pub use resolver::ViewResolver;
pub use storage::{
    AuditStorage, Directory, DirectoryBackend, GrantStorage, InsertOutcome, PermissionStorage,
    RoleStorage, UserStorage, ViewStorage,
};
pub use types::{Grant, Permission, Role, RoleBuilder, RoleKind, UnknownRoleKind, User, View};

/// Type alias for authorization results.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use segura_authz::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthzResult;
    pub use crate::audit::{AuditAction, AuditEntry, AuditFilter, AuditTable};
    pub use crate::config::AuthzConfig;
    pub use crate::engine::{AccessDecision, AuthorizationEngine, DecisionOutcome, Listing};
    pub use crate::error::AuthzError;
    pub use crate::storage::{Directory, InsertOutcome};
    pub use crate::types::{Grant, Permission, Role, RoleKind, User, View};
}
