//! Role type and the closed set of well-known role kinds.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Role Type
// =============================================================================

/// A named authority level assigned to users.
///
/// Grants are attached to roles. Roles are soft-deactivated and never
/// removed; an inactive role is invisible to every directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Stable opaque identifier.
    pub id: String,

    /// Unique, human-readable name (e.g. "Vendedor").
    pub name: String,

    /// Informational ordering; lower values carry broader authority.
    pub access_level: i32,

    /// Human-readable description of the role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the role is active.
    pub active: bool,

    /// When the role was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Role {
    /// Creates a new active role with a generated identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, access_level: i32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            access_level,
            description: None,
            active: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Creates a new role builder.
    #[must_use]
    pub fn builder(name: impl Into<String>, access_level: i32) -> RoleBuilder {
        RoleBuilder {
            role: Role::new(name, access_level),
        }
    }

    /// Creates the role for a well-known kind, using its canonical name and level.
    #[must_use]
    pub fn from_kind(kind: RoleKind) -> Self {
        Self::new(kind.as_str(), kind.access_level())
    }

    /// Returns the well-known kind for this role, if its name is one.
    #[must_use]
    pub fn kind(&self) -> Option<RoleKind> {
        self.name.parse().ok()
    }
}

// =============================================================================
// Role Builder
// =============================================================================

/// Builder for creating `Role` instances.
pub struct RoleBuilder {
    role: Role,
}

impl RoleBuilder {
    /// Sets the role ID.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.role.id = id.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.role.description = Some(description.into());
        self
    }

    /// Sets whether the role is active.
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.role.active = active;
        self
    }

    /// Builds the role.
    #[must_use]
    pub fn build(self) -> Role {
        self.role
    }
}

// =============================================================================
// Role Kind
// =============================================================================

/// The closed set of roles the CRM ships with.
///
/// Kinds are totally ordered by access level: `Administrador < Broker <
/// Vendedor`, where "less" means broader authority. The engine itself does
/// not enforce the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    /// Full administrative access.
    Administrador,
    /// Manages a portfolio of sellers.
    Broker,
    /// Front-line seller.
    Vendedor,
}

impl RoleKind {
    /// All kinds, broadest authority first.
    pub const ALL: [RoleKind; 3] = [Self::Administrador, Self::Broker, Self::Vendedor];

    /// Canonical role name as stored in the directory.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administrador => "Administrador",
            Self::Broker => "Broker",
            Self::Vendedor => "Vendedor",
        }
    }

    /// Access level of the kind (1 = broadest).
    #[must_use]
    pub fn access_level(&self) -> i32 {
        match self {
            Self::Administrador => 1,
            Self::Broker => 2,
            Self::Vendedor => 3,
        }
    }

    /// Returns `true` if this kind has at least the authority of `other`.
    #[must_use]
    pub fn at_least(&self, other: RoleKind) -> bool {
        *self <= other
    }
}

impl PartialOrd for RoleKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RoleKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.access_level().cmp(&other.access_level())
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not one of the well-known kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role kind: {0}")]
pub struct UnknownRoleKind(pub String);

impl FromStr for RoleKind {
    type Err = UnknownRoleKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRoleKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_new() {
        let role = Role::new("Vendedor", 3);
        assert_eq!(role.name, "Vendedor");
        assert_eq!(role.access_level, 3);
        assert!(role.active);
        assert!(role.description.is_none());
        assert!(!role.id.is_empty());
    }

    #[test]
    fn test_role_builder() {
        let role = Role::builder("Broker", 2)
            .id("role-broker")
            .description("Gestiona vendedores")
            .active(false)
            .build();

        assert_eq!(role.id, "role-broker");
        assert_eq!(role.description.as_deref(), Some("Gestiona vendedores"));
        assert!(!role.active);
        assert_eq!(role.kind(), Some(RoleKind::Broker));
    }

    #[test]
    fn test_role_kind_ordering() {
        assert!(RoleKind::Administrador < RoleKind::Broker);
        assert!(RoleKind::Broker < RoleKind::Vendedor);
        assert!(RoleKind::Administrador.at_least(RoleKind::Vendedor));
        assert!(!RoleKind::Vendedor.at_least(RoleKind::Broker));
        assert!(RoleKind::Broker.at_least(RoleKind::Broker));
    }

    #[test]
    fn test_role_kind_parse() {
        assert_eq!("Vendedor".parse::<RoleKind>(), Ok(RoleKind::Vendedor));
        assert_eq!(" administrador ".parse::<RoleKind>(), Ok(RoleKind::Administrador));
        assert!("Gerente".parse::<RoleKind>().is_err());
        assert_eq!(Role::new("Gerente", 5).kind(), None);
    }

    #[test]
    fn test_role_from_kind() {
        let role = Role::from_kind(RoleKind::Administrador);
        assert_eq!(role.name, "Administrador");
        assert_eq!(role.access_level, 1);
    }
}
