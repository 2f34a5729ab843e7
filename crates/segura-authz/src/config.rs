//! Authorization engine configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [authz.access_permission]
//! name = "acceso"
//! description = "Permiso base de acceso a la vista"
//!
//! [authz.resolver]
//! generic_fallback = true
//!
//! [authz.audit]
//! enabled = true
//! default_limit = 100
//! ```

use serde::{Deserialize, Serialize};

use crate::audit::DEFAULT_AUDIT_LIMIT;

/// Name of the baseline "may open this view" permission.
pub const ACCESS_PERMISSION_NAME: &str = "acceso";

/// Description given to the baseline permission when the engine creates it.
pub const ACCESS_PERMISSION_DESCRIPTION: &str = "Permiso base de acceso a la vista";

/// Root authorization configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthzConfig {
    /// The baseline access permission.
    pub access_permission: AccessPermissionConfig,

    /// Route resolution.
    pub resolver: ResolverConfig,

    /// Audit trail.
    pub audit: AuditConfig,
}

/// The permission that `assign_view_to_role` grants.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessPermissionConfig {
    /// Unique permission name.
    pub name: String,

    /// Description used when the permission is created lazily.
    pub description: String,
}

impl Default for AccessPermissionConfig {
    fn default() -> Self {
        Self {
            name: ACCESS_PERMISSION_NAME.to_string(),
            description: ACCESS_PERMISSION_DESCRIPTION.to_string(),
        }
    }
}

/// Wildcard route resolution.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Consult the fully generic `%` pattern when nothing more specific
    /// matches. When enabled, every unregistered route resolves to all
    /// active views.
    pub generic_fallback: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            generic_fallback: true,
        }
    }
}

/// Audit trail recording.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Record administrative changes.
    pub enabled: bool,

    /// Entries returned by an audit query without an explicit limit.
    pub default_limit: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_limit: DEFAULT_AUDIT_LIMIT,
        }
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl AuthzConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The access permission name is empty or contains whitespace only
    /// - The audit default limit is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_permission.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "access_permission.name cannot be empty".to_string(),
            ));
        }

        if self.audit.default_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "audit.default_limit must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthzConfig::default();
        assert_eq!(config.access_permission.name, "acceso");
        assert!(config.resolver.generic_fallback);
        assert!(config.audit.enabled);
        assert_eq!(config.audit.default_limit, 100);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(AuthzConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_permission_name_fails_validation() {
        let mut config = AuthzConfig::default();
        config.access_permission.name = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_zero_audit_limit_fails_validation() {
        let mut config = AuthzConfig::default();
        config.audit.default_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AuthzConfig =
            serde_json::from_str(r#"{"resolver": {"generic_fallback": false}}"#).unwrap();
        assert!(!config.resolver.generic_fallback);
        assert_eq!(config.access_permission.name, "acceso");
        assert!(config.audit.enabled);
    }
}
