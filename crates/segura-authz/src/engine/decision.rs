//! Verification results.
//!
//! A verification never fails because something was not found; missing
//! users, views, permissions or routes are ordinary denials carrying a
//! stable message.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Decision Outcome
// =============================================================================

/// Every outcome a verification can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionOutcome {
    /// The user does not exist or is inactive.
    UserNotFound,
    /// The user has no role assigned.
    UserWithoutRole,
    /// No active view is registered at the route.
    ViewNotFound,
    /// No active permission has the requested name.
    PermissionNotFound,
    /// No active view governs the requested path.
    RouteNotFound,
    /// The role holds the requested permission on the view.
    PermissionGranted,
    /// The role does not hold the requested permission on the view.
    PermissionDenied,
    /// The role holds some permission on the view.
    ViewGranted,
    /// The role holds no permission on the view.
    ViewDenied,
    /// The role holds some permission on a view governing the path.
    RouteGranted,
    /// The role holds no permission on any view governing the path.
    RouteDenied,
}

impl DecisionOutcome {
    /// Returns `true` if the outcome grants access.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(
            self,
            Self::PermissionGranted | Self::ViewGranted | Self::RouteGranted
        )
    }

    /// Stable, user-facing message.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::UserNotFound => "Usuario no encontrado",
            Self::UserWithoutRole => "Usuario sin rol asignado",
            Self::ViewNotFound => "Vista no encontrada",
            Self::PermissionNotFound => "Permiso no encontrado",
            Self::RouteNotFound => "Ruta no encontrada",
            Self::PermissionGranted => "Permiso concedido",
            Self::PermissionDenied => "Permiso denegado",
            Self::ViewGranted => "Acceso a la vista concedido",
            Self::ViewDenied => "Acceso a la vista denegado",
            Self::RouteGranted => "Acceso a la ruta concedido",
            Self::RouteDenied => "Acceso denegado a la ruta",
        }
    }

    /// Machine-readable code, for logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound => "user-not-found",
            Self::UserWithoutRole => "user-without-role",
            Self::ViewNotFound => "view-not-found",
            Self::PermissionNotFound => "permission-not-found",
            Self::RouteNotFound => "route-not-found",
            Self::PermissionGranted => "permission-granted",
            Self::PermissionDenied => "permission-denied",
            Self::ViewGranted => "view-granted",
            Self::ViewDenied => "view-denied",
            Self::RouteGranted => "route-granted",
            Self::RouteDenied => "route-denied",
        }
    }
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Access Decision
// =============================================================================

/// Result of a verification: `{ "hasAccess": bool, "message": string }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    /// Whether access is granted.
    pub has_access: bool,

    /// Human-readable explanation.
    pub message: String,

    /// Outcome that produced this decision. Not serialized.
    #[serde(skip)]
    pub outcome: Option<DecisionOutcome>,
}

impl AccessDecision {
    /// Builds the decision for an outcome.
    #[must_use]
    pub fn from_outcome(outcome: DecisionOutcome) -> Self {
        Self {
            has_access: outcome.is_granted(),
            message: outcome.message().to_string(),
            outcome: Some(outcome),
        }
    }

    /// Returns `true` if access was granted.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.has_access
    }

    /// Returns `true` if access was denied.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        !self.has_access
    }
}

impl From<DecisionOutcome> for AccessDecision {
    fn from(outcome: DecisionOutcome) -> Self {
        Self::from_outcome(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_grant_outcomes_allow() {
        assert!(AccessDecision::from_outcome(DecisionOutcome::ViewGranted).is_allowed());
        assert!(AccessDecision::from_outcome(DecisionOutcome::RouteGranted).is_allowed());
        assert!(AccessDecision::from_outcome(DecisionOutcome::PermissionGranted).is_allowed());

        for denial in [
            DecisionOutcome::UserNotFound,
            DecisionOutcome::UserWithoutRole,
            DecisionOutcome::ViewNotFound,
            DecisionOutcome::PermissionNotFound,
            DecisionOutcome::RouteNotFound,
            DecisionOutcome::PermissionDenied,
            DecisionOutcome::ViewDenied,
            DecisionOutcome::RouteDenied,
        ] {
            assert!(AccessDecision::from(denial).is_denied(), "{denial}");
        }
    }

    #[test]
    fn test_serialized_shape() {
        let decision = AccessDecision::from_outcome(DecisionOutcome::PermissionDenied);
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"hasAccess": false, "message": "Permiso denegado"})
        );
    }

    #[test]
    fn test_route_not_found_message() {
        assert_eq!(DecisionOutcome::RouteNotFound.message(), "Ruta no encontrada");
    }
}
