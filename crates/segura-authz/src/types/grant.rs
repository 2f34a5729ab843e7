//! Role × View × Permission grant.

use serde::{Deserialize, Serialize};

/// "This role may exercise this permission on this view."
///
/// The triple is the whole identity of a grant: grants are inserted and
/// deleted, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    /// Role the grant is attached to.
    pub role_id: String,
    /// View the grant is scoped to.
    pub view_id: String,
    /// Permission being granted.
    pub permission_id: String,
}

impl Grant {
    /// Creates a new grant triple.
    #[must_use]
    pub fn new(
        role_id: impl Into<String>,
        view_id: impl Into<String>,
        permission_id: impl Into<String>,
    ) -> Self {
        Self {
            role_id: role_id.into(),
            view_id: view_id.into(),
            permission_id: permission_id.into(),
        }
    }

    /// Returns `true` if the grant belongs to the (role, view) pair.
    #[must_use]
    pub fn is_for(&self, role_id: &str, view_id: &str) -> bool {
        self.role_id == role_id && self.view_id == view_id
    }
}
