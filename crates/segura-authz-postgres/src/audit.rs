//! Audit trail storage.

use segura_authz::{AuditAction, AuditEntry, AuditFilter, AuditTable};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;

use crate::{PgPool, StorageError, StorageResult};

type AuditRow = (
    String,
    String,
    String,
    String,
    serde_json::Value,
    OffsetDateTime,
);

fn entry_from_row(
    (id, table, action, record_id, details, created_at): AuditRow,
) -> StorageResult<AuditEntry> {
    let table = AuditTable::parse(&table)
        .ok_or_else(|| StorageError::invalid_row(format!("unknown audit table '{table}'")))?;
    let action = AuditAction::parse(&action)
        .ok_or_else(|| StorageError::invalid_row(format!("unknown audit action '{action}'")))?;

    Ok(AuditEntry {
        id,
        table,
        action,
        record_id,
        details,
        created_at,
    })
}

/// Audit table operations.
pub struct PgAuditStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> PgAuditStorage<'a> {
    /// Create a new audit storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn record(&self, entry: &AuditEntry) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO authz_audit (id, table_name, action, record_id, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.table.as_str())
        .bind(entry.action.as_str())
        .bind(&entry.record_id)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Query entries matching a filter, newest first.
    ///
    /// Unset filter fields bind as NULL and match every row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or a stored row names
    /// an unknown table or action.
    pub async fn search(&self, filter: &AuditFilter) -> StorageResult<Vec<AuditEntry>> {
        let limit = i64::try_from(filter.effective_limit()).unwrap_or(i64::MAX);

        let rows: Vec<AuditRow> = query_as(
            r#"
            SELECT id, table_name, action, record_id, details, created_at
            FROM authz_audit
            WHERE ($1::text IS NULL OR table_name = $1)
              AND ($2::text IS NULL OR action = $2)
              AND ($3::timestamptz IS NULL OR created_at >= $3)
              AND ($4::timestamptz IS NULL OR created_at <= $4)
            ORDER BY created_at DESC
            LIMIT $5
            "#,
        )
        .bind(filter.table.map(|t| t.as_str()))
        .bind(filter.action.map(|a| a.as_str()))
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_with_unknown_action_is_rejected() {
        let row: AuditRow = (
            "a1".into(),
            "grant".into(),
            "rename".into(),
            "r/v".into(),
            serde_json::Value::Null,
            OffsetDateTime::UNIX_EPOCH,
        );
        let err = entry_from_row(row).unwrap_err();
        assert!(matches!(err, StorageError::InvalidRow(_)));
    }

    #[test]
    fn test_row_decodes() {
        let row: AuditRow = (
            "a1".into(),
            "permission".into(),
            "create".into(),
            "p1".into(),
            serde_json::json!({"name": "acceso"}),
            OffsetDateTime::UNIX_EPOCH,
        );
        let entry = entry_from_row(row).unwrap();
        assert_eq!(entry.table, AuditTable::Permission);
        assert_eq!(entry.action, AuditAction::Create);
    }
}
