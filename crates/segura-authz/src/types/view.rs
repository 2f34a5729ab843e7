//! View type: a protected screen addressed by a route.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A protected resource addressed by a route string such as `/usuarios`.
///
/// Routes are not required to be unique. The wildcard matching used for
/// route authorization is synthesized at lookup time and never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    /// Stable opaque identifier.
    pub id: String,

    /// Unique display name.
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Registered route, e.g. `/companias`.
    pub route: String,

    /// Whether the view is active.
    pub active: bool,
}

impl View {
    /// Create a new active view with a generated identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            route: route.into(),
            active: true,
        }
    }

    /// Set the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set whether the view is active.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}
