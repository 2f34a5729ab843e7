//! The slice of a user account the engine reads.

use serde::{Deserialize, Serialize};

/// A user as seen by the authorization engine.
///
/// Accounts are owned by the authentication service; only the role binding
/// and the active flag matter here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable opaque identifier, taken from a verified identity token.
    pub id: String,

    /// Login name, for logs only.
    pub username: String,

    /// Role assigned to the user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,

    /// Whether the account is active.
    pub active: bool,
}

impl User {
    /// Creates an active user without a role.
    #[must_use]
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            role_id: None,
            active: true,
        }
    }

    /// Set the assigned role.
    #[must_use]
    pub fn with_role(mut self, role_id: impl Into<String>) -> Self {
        self.role_id = Some(role_id.into());
        self
    }

    /// Set whether the account is active.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Returns the role id, treating an empty string as "no role".
    #[must_use]
    pub fn assigned_role(&self) -> Option<&str> {
        self.role_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigned_role_ignores_blank_ids() {
        assert_eq!(User::new("u1", "ana").assigned_role(), None);
        assert_eq!(User::new("u1", "ana").with_role("  ").assigned_role(), None);
        assert_eq!(
            User::new("u1", "ana").with_role("r1").assigned_role(),
            Some("r1")
        );
    }
}
