//! Audit trail for administrative authorization changes.
//!
//! Every mutation the engine performs on the directory (assigning or
//! unassigning a view, granting a permission, lazily creating the baseline
//! access permission) is recorded as an [`AuditEntry`]. Entries are queried
//! with an explicit [`AuditFilter`].

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Default number of entries returned by an audit query.
pub const DEFAULT_AUDIT_LIMIT: usize = 100;

// =============================================================================
// Audit Entry
// =============================================================================

/// Table an audited change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditTable {
    /// Role × View × Permission grants.
    Grant,
    /// Permissions.
    Permission,
}

impl AuditTable {
    /// Table name as stored.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grant => "grant",
            Self::Permission => "permission",
        }
    }

    /// Parses a stored table name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "grant" => Some(Self::Grant),
            "permission" => Some(Self::Permission),
            _ => None,
        }
    }
}

impl fmt::Display for AuditTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of audited change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// Baseline view access assigned to a role.
    Assign,
    /// All grants on a view removed from a role.
    Unassign,
    /// A named permission granted on a view.
    Grant,
    /// A record created by the engine itself.
    Create,
}

impl AuditAction {
    /// Action name as stored.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::Unassign => "unassign",
            Self::Grant => "grant",
            Self::Create => "create",
        }
    }

    /// Parses a stored action name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assign" => Some(Self::Assign),
            "unassign" => Some(Self::Unassign),
            "grant" => Some(Self::Grant),
            "create" => Some(Self::Create),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded administrative change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Entry identifier.
    pub id: String,
    /// Table that changed.
    pub table: AuditTable,
    /// What happened.
    pub action: AuditAction,
    /// Key of the affected record (e.g. `role_id/view_id`).
    pub record_id: String,
    /// Structured detail of the change.
    #[serde(default)]
    pub details: serde_json::Value,
    /// When the change happened.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AuditEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(table: AuditTable, action: AuditAction, record_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            table,
            action,
            record_id: record_id.into(),
            details: serde_json::Value::Null,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

// =============================================================================
// Audit Filter
// =============================================================================

/// Query options for the audit trail.
///
/// Every field is optional; unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilter {
    /// Exact table name.
    #[serde(default)]
    pub table: Option<AuditTable>,

    /// Exact action.
    #[serde(default)]
    pub action: Option<AuditAction>,

    /// Inclusive lower bound on `created_at`.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date_from: Option<OffsetDateTime>,

    /// Inclusive upper bound on `created_at`.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date_to: Option<OffsetDateTime>,

    /// Maximum number of entries; [`DEFAULT_AUDIT_LIMIT`] when unset.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl AuditFilter {
    /// Returns `true` if the entry satisfies every set field.
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if self.table.is_some_and(|t| t != entry.table) {
            return false;
        }
        if self.action.is_some_and(|a| a != entry.action) {
            return false;
        }
        if self.date_from.is_some_and(|from| entry.created_at < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| entry.created_at > to) {
            return false;
        }
        true
    }

    /// Effective result limit.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_AUDIT_LIMIT)
    }

    /// Applies the filter to an in-memory set of entries, newest first.
    #[must_use]
    pub fn apply<'a>(&self, entries: impl IntoIterator<Item = &'a AuditEntry>) -> Vec<AuditEntry> {
        let mut matched: Vec<AuditEntry> = entries
            .into_iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(self.effective_limit());
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn entry_at(action: AuditAction, offset_secs: i64) -> AuditEntry {
        let mut entry = AuditEntry::new(AuditTable::Grant, action, "r/v");
        entry.created_at = OffsetDateTime::UNIX_EPOCH + Duration::seconds(offset_secs);
        entry
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = AuditFilter::default();
        assert!(filter.matches(&entry_at(AuditAction::Assign, 10)));
        assert_eq!(filter.effective_limit(), DEFAULT_AUDIT_LIMIT);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let filter = AuditFilter {
            date_from: Some(OffsetDateTime::UNIX_EPOCH + Duration::seconds(10)),
            date_to: Some(OffsetDateTime::UNIX_EPOCH + Duration::seconds(20)),
            ..Default::default()
        };
        assert!(filter.matches(&entry_at(AuditAction::Assign, 10)));
        assert!(filter.matches(&entry_at(AuditAction::Assign, 20)));
        assert!(!filter.matches(&entry_at(AuditAction::Assign, 9)));
        assert!(!filter.matches(&entry_at(AuditAction::Assign, 21)));
    }

    #[test]
    fn test_apply_filters_sorts_and_limits() {
        let entries = vec![
            entry_at(AuditAction::Assign, 1),
            entry_at(AuditAction::Unassign, 2),
            entry_at(AuditAction::Assign, 3),
            entry_at(AuditAction::Assign, 4),
        ];
        let filter = AuditFilter {
            table: Some(AuditTable::Grant),
            action: Some(AuditAction::Assign),
            limit: Some(2),
            ..Default::default()
        };

        let result = filter.apply(&entries);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].created_at.unix_timestamp(), 4);
        assert_eq!(result[1].created_at.unix_timestamp(), 3);
    }

    #[test]
    fn test_table_and_action_round_trip_names() {
        assert_eq!(AuditTable::parse("grant"), Some(AuditTable::Grant));
        assert_eq!(AuditTable::parse("role"), None);
        assert_eq!(AuditAction::parse(AuditAction::Unassign.as_str()), Some(AuditAction::Unassign));
    }
}
