//! # Audit Repository
//!
//! Append-only audit trail: who changed what, with a human-readable delta.
//!
//! ## Transactional Coupling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_on() only ever runs inside the CALLER'S transaction.           │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    ... mutation ...                                                     │
//! │    INSERT INTO audit_log ...   ← same transaction                       │
//! │  COMMIT / ROLLBACK             ← entry exists iff the mutation does     │
//! │                                                                         │
//! │  A mutation that happened but wasn't logged is unacceptable, so an     │
//! │  audit insert failure fails the whole parent operation.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;
use medledger_core::AuditEntry;

/// Action names recorded in the audit trail.
pub mod actions {
    pub const ADMIT: &str = "admission.admit";
    pub const DISCHARGE: &str = "admission.discharge";
    pub const DISPENSE_ITEM: &str = "prescription.dispense_item";
    pub const SETTLE: &str = "billing.settle";
}

/// Read side of the audit trail. Writes go through [`record_on`] only.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Most recent entries, newest first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT id, actor_ref, action, target_ref, details, recorded_at \
             FROM audit_log ORDER BY id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Entries for one target (an admission, a prescription item, ...),
    /// oldest first.
    pub async fn for_target(&self, target_ref: &str) -> DbResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT id, actor_ref, action, target_ref, details, recorded_at \
             FROM audit_log WHERE target_ref = ?1 ORDER BY id",
        )
        .bind(target_ref)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Total number of entries (for tests and diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Appends one audit entry inside the caller's transaction.
///
/// Deliberately takes a connection, never a pool: the entry must commit and
/// roll back with the mutation it describes.
pub(crate) async fn record_on(
    conn: &mut SqliteConnection,
    actor_ref: &str,
    action: &str,
    target_ref: Option<&str>,
    details: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (actor_ref, action, target_ref, details, recorded_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(actor_ref)
    .bind(action)
    .bind(target_ref)
    .bind(details)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_record_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        record_on(
            &mut conn,
            "staff-7",
            actions::SETTLE,
            Some("acct-1"),
            "settled 2 transactions (cash)",
        )
        .await
        .unwrap();
        drop(conn);

        let entries = db.audit().for_target("acct-1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor_ref, "staff-7");
        assert_eq!(entries[0].action, actions::SETTLE);

        assert_eq!(db.audit().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recent_orders_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        record_on(&mut conn, "a1", actions::ADMIT, Some("t1"), "first")
            .await
            .unwrap();
        record_on(&mut conn, "a1", actions::DISCHARGE, Some("t1"), "second")
            .await
            .unwrap();
        drop(conn);

        let recent = db.audit().recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].details, "second");
    }
}
