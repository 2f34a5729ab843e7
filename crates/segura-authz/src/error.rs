//! Authorization error types.
//!
//! Denials produced by the verification operations are *not* errors; they are
//! returned as [`AccessDecision`](crate::engine::AccessDecision) values. The
//! types in this module cover administrative misuse (unknown role or view)
//! and infrastructure faults.

use std::fmt;

/// Errors that can occur during authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// A referenced entity does not exist or is inactive.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity (e.g. "Role", "View").
        entity: &'static str,
        /// Identifier or unique key that was looked up.
        id: String,
    },

    /// A uniqueness constraint was violated.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflicting value.
        message: String,
    },

    /// An error occurred while storing or retrieving directory data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// A verification operation failed for a reason other than a denial.
    #[error("Error verifying {operation}: {message}")]
    Verification {
        /// The verification that failed ("permission", "view", "route").
        operation: &'static str,
        /// Description of the underlying fault.
        message: String,
    },

    /// The authorization configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthzError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Verification` error wrapping an underlying fault.
    #[must_use]
    pub fn verification(operation: &'static str, source: &AuthzError) -> Self {
        Self::Verification {
            operation,
            message: source.to_string(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` if the caller is at fault (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Conflict { .. })
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } | Self::Conflict { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Verification { .. } => ErrorCategory::Authorization,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of authorization errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Authorization evaluation faults.
    Authorization,
    /// Caller referenced something that does not exist or conflicts.
    Validation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorization => write!(f, "authorization"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthzError::not_found("Role", "r-1");
        assert_eq!(err.to_string(), "Role not found: r-1");

        let err = AuthzError::storage("connection refused");
        assert_eq!(err.to_string(), "Storage error: connection refused");

        let err = AuthzError::verification("route", &AuthzError::storage("timeout"));
        assert_eq!(
            err.to_string(),
            "Error verifying route: Storage error: timeout"
        );
    }

    #[test]
    fn test_error_predicates() {
        let err = AuthzError::not_found("View", "v-1");
        assert!(err.is_not_found());
        assert!(err.is_client_error());
        assert!(!err.is_server_error());

        let err = AuthzError::conflict("permission name 'acceso' already exists");
        assert!(err.is_conflict());
        assert!(err.is_client_error());

        let err = AuthzError::storage("database down");
        assert!(!err.is_client_error());
        assert!(err.is_server_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthzError::not_found("Role", "x").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            AuthzError::storage("x").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            AuthzError::verification("view", &AuthzError::internal("x")).category(),
            ErrorCategory::Authorization
        );
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}
