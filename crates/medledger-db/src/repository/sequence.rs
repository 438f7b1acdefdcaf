//! # Sequence Repository
//!
//! Collision-free sequential display identifiers per role category.
//!
//! ## Allocation Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    allocate("D")  (counter at 41)                       │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    UPDATE sequence_counters                                             │
//! │       SET last_value = last_value + 1                                   │
//! │     WHERE category = 'D'          ← acquires the row's write lock;      │
//! │                                     concurrent allocators serialize     │
//! │                                     here (select-for-update equivalent) │
//! │    SELECT last_value ...          ← reads 42 under the same lock        │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  → "D0042"                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The increment and the read happen under one transaction holding the write
//! lock, so no two callers ever observe the same value and the sequence has
//! no gaps. A zero-row update means the category was never registered.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbResult, LedgerError};
use medledger_core::{format_display_id, Role};

/// Repository for sequence counter operations.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Registers a counter row for a category, starting at `start`.
    ///
    /// Used by setup/seeding flows; allocation never creates counters
    /// implicitly, so a typo'd category fails loudly instead of forking a
    /// fresh sequence.
    pub async fn register(&self, category: &str, start: i64) -> DbResult<()> {
        debug!(category = %category, start = %start, "Registering sequence counter");

        sqlx::query("INSERT INTO sequence_counters (category, last_value) VALUES (?1, ?2)")
            .bind(category)
            .bind(start)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Allocates the next display id for a category.
    ///
    /// ## Contract
    /// - Unique: no two concurrent callers observe the same value
    /// - Gap-free: N successful calls advance the counter by exactly N
    /// - `UnknownCategory` if no counter row exists for `category`
    /// - `Transient` on lock/commit failure; safe to retry immediately
    ///
    /// ## Example
    /// Counter for "D" at 41 → returns `"D0042"`, counter becomes 42.
    pub async fn allocate(&self, category: &str) -> DbResult<String> {
        let mut tx = self.pool.begin().await?;

        // The UPDATE takes the write lock first; the read below then cannot
        // race with another allocator's increment.
        let result = sqlx::query(
            "UPDATE sequence_counters SET last_value = last_value + 1 WHERE category = ?1",
        )
        .bind(category)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::UnknownCategory(category.to_string()));
        }

        let next: i64 =
            sqlx::query_scalar("SELECT last_value FROM sequence_counters WHERE category = ?1")
                .bind(category)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        let id = format_display_id(category, next);
        debug!(category = %category, value = %next, id = %id, "Allocated display id");
        Ok(id)
    }

    /// Allocates the next display id for a role (e.g. `Role::Doctor` → "D0042").
    pub async fn allocate_for_role(&self, role: Role) -> DbResult<String> {
        self.allocate(role.prefix()).await
    }

    /// Reads the current counter value without advancing it.
    pub async fn current(&self, category: &str) -> DbResult<i64> {
        let value: Option<i64> =
            sqlx::query_scalar("SELECT last_value FROM sequence_counters WHERE category = ?1")
                .bind(category)
                .fetch_optional(&self.pool)
                .await?;

        value.ok_or_else(|| LedgerError::UnknownCategory(category.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use crate::LedgerError;
    use medledger_core::Role;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_allocate_formats_and_advances() {
        let db = test_db().await;
        let seq = db.sequences();

        seq.register("D", 41).await.unwrap();

        assert_eq!(seq.allocate("D").await.unwrap(), "D0042");
        assert_eq!(seq.current("D").await.unwrap(), 42);
        assert_eq!(seq.allocate("D").await.unwrap(), "D0043");
    }

    #[tokio::test]
    async fn test_allocate_unknown_category() {
        let db = test_db().await;
        let err = db.sequences().allocate("X").await.unwrap_err();
        assert!(matches!(err, LedgerError::UnknownCategory(c) if c == "X"));
    }

    #[tokio::test]
    async fn test_allocate_for_role() {
        let db = test_db().await;
        let seq = db.sequences();
        seq.register(Role::Patient.prefix(), 0).await.unwrap();

        assert_eq!(seq.allocate_for_role(Role::Patient).await.unwrap(), "P0001");
    }

    #[tokio::test]
    async fn test_concurrent_allocations_are_distinct_and_gap_free() {
        let db = test_db().await;
        db.sequences().register("P", 100).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let seq = db.sequences();
            handles.push(tokio::spawn(async move { seq.allocate("P").await }));
        }

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            let id = handle.await.unwrap().unwrap();
            assert!(ids.insert(id), "duplicate display id allocated");
        }

        assert_eq!(ids.len(), 20);
        // Gap-free: counter advanced by exactly the number of allocations.
        assert_eq!(db.sequences().current("P").await.unwrap(), 120);
        for n in 101..=120 {
            assert!(ids.contains(&format!("P{:04}", n)));
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let db = test_db().await;
        let seq = db.sequences();
        seq.register("N", 0).await.unwrap();
        let err = seq.register("N", 5).await.unwrap_err();
        assert!(matches!(err, LedgerError::UniqueViolation { .. }));
    }
}
