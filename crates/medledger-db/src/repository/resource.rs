//! # Resource Repository
//!
//! Occupancy ledger for allocable physical resources (beds and rooms).
//!
//! ## The Reserve Race
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │          Two staff admit into the same bed at the same time             │
//! │                                                                         │
//! │  ❌ WRONG: check-then-act (race window between the two statements)     │
//! │     SELECT status FROM resources WHERE id = ?     -- both see available │
//! │     UPDATE resources SET status = 'occupied' ...  -- both "succeed"     │
//! │                                                                         │
//! │  ✅ CORRECT: conditional single-statement update (compare-and-swap)    │
//! │     UPDATE resources                                                    │
//! │        SET status = 'occupied', occupant_ref = ?, occupied_since = ?    │
//! │      WHERE id = ? AND status = 'available'                              │
//! │                                                                         │
//! │  Exactly one UPDATE matches a row; the loser's rows_affected is 0 and  │
//! │  surfaces as Conflict, never a corrupted double occupancy.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbResult, LedgerError};
use medledger_core::{Resource, ResourceCategory, ResourceStatus};

const RESOURCE_COLUMNS: &str =
    "id, category, label, status, occupant_ref, occupied_since, created_at, updated_at";

/// Repository for bed/room occupancy operations.
#[derive(Debug, Clone)]
pub struct ResourceRepository {
    pool: SqlitePool,
}

impl ResourceRepository {
    /// Creates a new ResourceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ResourceRepository { pool }
    }

    /// Adds a resource in `available` state.
    pub async fn add(&self, category: ResourceCategory, label: &str) -> DbResult<Resource> {
        let now = Utc::now();
        let resource = Resource {
            id: Uuid::new_v4().to_string(),
            category,
            label: label.to_string(),
            status: ResourceStatus::Available,
            occupant_ref: None,
            occupied_since: None,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %resource.id, label = %label, "Adding resource");

        sqlx::query(
            r#"
            INSERT INTO resources (id, category, label, status, occupant_ref, occupied_since, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, NULL, NULL, ?5, ?5)
            "#,
        )
        .bind(&resource.id)
        .bind(resource.category)
        .bind(&resource.label)
        .bind(resource.status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(resource)
    }

    /// Gets a resource by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Resource>> {
        let resource = sqlx::query_as::<_, Resource>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(resource)
    }

    /// Lists available resources of a category, ordered by ward label.
    pub async fn list_available(&self, category: ResourceCategory) -> DbResult<Vec<Resource>> {
        let resources = sqlx::query_as::<_, Resource>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources \
             WHERE status = 'available' AND category = ?1 ORDER BY label"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(resources)
    }

    /// Reserves a resource for an occupant.
    ///
    /// Conditional update: succeeds only if the resource is currently
    /// `available`. Under two concurrent calls for the same resource,
    /// exactly one wins; the loser gets `Conflict`.
    pub async fn reserve(
        &self,
        resource_id: &str,
        occupant_ref: &str,
        since: DateTime<Utc>,
    ) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        reserve_on(&mut conn, resource_id, occupant_ref, since).await
    }

    /// Releases a resource back to `cleaning` and clears the occupant.
    /// Idempotent: releasing an already-released resource is a no-op.
    pub async fn release(&self, resource_id: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        release_on(&mut conn, resource_id).await
    }

    /// Housekeeping sign-off: `cleaning → available`.
    ///
    /// Conditional so a bed that was re-occupied in the meantime (it can't
    /// be, but the statement shouldn't assume) is never silently reset.
    pub async fn mark_available(&self, resource_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE resources SET status = 'available', updated_at = ?2 \
             WHERE id = ?1 AND status = 'cleaning'",
        )
        .bind(resource_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(resource_id).await? {
                Some(_) => Err(LedgerError::conflict("Resource", resource_id)),
                None => Err(LedgerError::not_found("Resource", resource_id)),
            };
        }

        Ok(())
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Reserve inside the caller's transaction. See [`ResourceRepository::reserve`].
pub(crate) async fn reserve_on(
    conn: &mut SqliteConnection,
    resource_id: &str,
    occupant_ref: &str,
    since: DateTime<Utc>,
) -> DbResult<()> {
    debug!(resource_id = %resource_id, occupant = %occupant_ref, "Reserving resource");

    // The predicate and the write are one atomic statement; there is no
    // window for a second admission to observe `available` after we did.
    let result = sqlx::query(
        r#"
        UPDATE resources
           SET status = 'occupied', occupant_ref = ?2, occupied_since = ?3, updated_at = ?3
         WHERE id = ?1 AND status = 'available'
        "#,
    )
    .bind(resource_id)
    .bind(occupant_ref)
    .bind(since)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        // Zero rows: either the bed was taken, or the id is wrong.
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM resources WHERE id = ?1")
            .bind(resource_id)
            .fetch_optional(&mut *conn)
            .await?;
        return match exists {
            Some(_) => Err(LedgerError::conflict("Resource", resource_id)),
            None => Err(LedgerError::not_found("Resource", resource_id)),
        };
    }

    Ok(())
}

/// Release inside the caller's transaction. See [`ResourceRepository::release`].
pub(crate) async fn release_on(conn: &mut SqliteConnection, resource_id: &str) -> DbResult<()> {
    debug!(resource_id = %resource_id, "Releasing resource");

    let result = sqlx::query(
        r#"
        UPDATE resources
           SET status = 'cleaning', occupant_ref = NULL, occupied_since = NULL, updated_at = ?2
         WHERE id = ?1 AND status = 'occupied'
        "#,
    )
    .bind(resource_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        // Already released is fine; a missing resource is not.
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM resources WHERE id = ?1")
            .bind(resource_id)
            .fetch_optional(&mut *conn)
            .await?;
        if exists.is_none() {
            return Err(LedgerError::not_found("Resource", resource_id));
        }
    }

    Ok(())
}

/// Picks the first available resource of a category inside the caller's
/// transaction. A plain read: the actual claim is the conditional update in
/// [`reserve_on`].
pub(crate) async fn first_available_on(
    conn: &mut SqliteConnection,
    category: ResourceCategory,
) -> DbResult<Option<String>> {
    let id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM resources WHERE status = 'available' AND category = ?1 \
         ORDER BY label LIMIT 1",
    )
    .bind(category)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(id)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_reserve_then_conflict() {
        let db = test_db().await;
        let repo = db.resources();
        let bed = repo.add(ResourceCategory::Bed, "ICU-1").await.unwrap();

        repo.reserve(&bed.id, "P0001", Utc::now()).await.unwrap();

        let reserved = repo.get_by_id(&bed.id).await.unwrap().unwrap();
        assert_eq!(reserved.status, ResourceStatus::Occupied);
        assert_eq!(reserved.occupant_ref.as_deref(), Some("P0001"));
        assert!(reserved.occupied_since.is_some());

        // Second admission into the occupied bed loses.
        let err = repo.reserve(&bed.id, "P0002", Utc::now()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));

        // Winner's state is untouched by the losing attempt.
        let after = repo.get_by_id(&bed.id).await.unwrap().unwrap();
        assert_eq!(after.occupant_ref.as_deref(), Some("P0001"));
    }

    #[tokio::test]
    async fn test_concurrent_reserves_have_one_winner() {
        let db = test_db().await;
        let repo = db.resources();
        let bed = repo.add(ResourceCategory::Bed, "ICU-2").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let repo = db.resources();
            let id = bed.id.clone();
            handles.push(tokio::spawn(async move {
                repo.reserve(&id, &format!("P{:04}", i), Utc::now()).await
            }));
        }

        let mut wins = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => wins += 1,
                Err(LedgerError::Conflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 7);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let db = test_db().await;
        let repo = db.resources();
        let room = repo.add(ResourceCategory::Room, "W2-R14").await.unwrap();

        repo.reserve(&room.id, "P0003", Utc::now()).await.unwrap();
        repo.release(&room.id).await.unwrap();
        repo.release(&room.id).await.unwrap(); // second release: no-op

        let released = repo.get_by_id(&room.id).await.unwrap().unwrap();
        assert_eq!(released.status, ResourceStatus::Cleaning);
        assert!(released.occupant_ref.is_none());
    }

    #[tokio::test]
    async fn test_mark_available_only_from_cleaning() {
        let db = test_db().await;
        let repo = db.resources();
        let bed = repo.add(ResourceCategory::Bed, "W1-B1").await.unwrap();

        // available → available is a conflict, not a silent success
        let err = repo.mark_available(&bed.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));

        repo.reserve(&bed.id, "P0004", Utc::now()).await.unwrap();
        repo.release(&bed.id).await.unwrap();
        repo.mark_available(&bed.id).await.unwrap();

        let bed = repo.get_by_id(&bed.id).await.unwrap().unwrap();
        assert_eq!(bed.status, ResourceStatus::Available);
    }

    #[tokio::test]
    async fn test_reserve_missing_resource_is_not_found() {
        let db = test_db().await;
        let err = db
            .resources()
            .reserve("no-such-id", "P0005", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_available_filters_by_category_and_status() {
        let db = test_db().await;
        let repo = db.resources();
        let b1 = repo.add(ResourceCategory::Bed, "W1-B1").await.unwrap();
        repo.add(ResourceCategory::Bed, "W1-B2").await.unwrap();
        repo.add(ResourceCategory::Room, "W1-R1").await.unwrap();

        repo.reserve(&b1.id, "P0006", Utc::now()).await.unwrap();

        let beds = repo.list_available(ResourceCategory::Bed).await.unwrap();
        assert_eq!(beds.len(), 1);
        assert_eq!(beds[0].label, "W1-B2");
    }
}
