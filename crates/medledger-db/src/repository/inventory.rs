//! # Inventory Repository
//!
//! Stock ledger for countable items (medicines, blood units).
//!
//! ## Debit Semantics
//! The debit is the same compare-and-swap shape as the resource reserve:
//! `quantity = quantity - N` applied only where `quantity >= N`, in one
//! statement. A failed predicate affects zero rows and surfaces as
//! `InsufficientStock`; the quantity is never clamped and no compensating
//! credit is ever attempted.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbResult, LedgerError};
use medledger_core::StockItem;

const STOCK_COLUMNS: &str =
    "id, name, item_group, quantity, low_stock_threshold, created_at, updated_at";

/// Repository for stock operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Adds a stock item to the catalog.
    pub async fn add(
        &self,
        name: &str,
        item_group: Option<&str>,
        quantity: i64,
        low_stock_threshold: i64,
    ) -> DbResult<StockItem> {
        let now = Utc::now();
        let item = StockItem {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            item_group: item_group.map(str::to_string),
            quantity,
            low_stock_threshold,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %item.id, name = %name, quantity = %quantity, "Adding stock item");

        sqlx::query(
            r#"
            INSERT INTO stock_items (id, name, item_group, quantity, low_stock_threshold, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.item_group)
        .bind(item.quantity)
        .bind(item.low_stock_threshold)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets a stock item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockItem>> {
        let item = sqlx::query_as::<_, StockItem>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Debits stock, rejecting the operation if it would go below zero.
    pub async fn debit(&self, item_id: &str, quantity: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        debit_on(&mut conn, item_id, quantity).await
    }

    /// Credits (restocks) an item unconditionally.
    ///
    /// Used by the stock-management flows; dispensing only ever debits.
    pub async fn credit(&self, item_id: &str, quantity: i64) -> DbResult<()> {
        debug!(item_id = %item_id, quantity = %quantity, "Crediting stock");

        let result = sqlx::query(
            "UPDATE stock_items SET quantity = quantity + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(item_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::not_found("StockItem", item_id));
        }

        Ok(())
    }

    /// Items at or below their reorder threshold, most depleted first.
    pub async fn list_low_stock(&self) -> DbResult<Vec<StockItem>> {
        let items = sqlx::query_as::<_, StockItem>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_items \
             WHERE quantity <= low_stock_threshold ORDER BY quantity, name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Debit inside the caller's transaction.
///
/// Single conditional statement; zero rows affected means the predicate
/// failed (insufficient stock) or the item doesn't exist, distinguished by
/// a follow-up read for the error message only.
pub(crate) async fn debit_on(
    conn: &mut SqliteConnection,
    item_id: &str,
    quantity: i64,
) -> DbResult<()> {
    debug!(item_id = %item_id, quantity = %quantity, "Debiting stock");

    let result = sqlx::query(
        r#"
        UPDATE stock_items
           SET quantity = quantity - ?2, updated_at = ?3
         WHERE id = ?1 AND quantity >= ?2
        "#,
    )
    .bind(item_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let on_hand: Option<(String, i64)> =
            sqlx::query_as("SELECT name, quantity FROM stock_items WHERE id = ?1")
                .bind(item_id)
                .fetch_optional(&mut *conn)
                .await?;
        return match on_hand {
            Some((name, available)) => Err(LedgerError::InsufficientStock {
                name,
                available,
                requested: quantity,
            }),
            None => Err(LedgerError::not_found("StockItem", item_id)),
        };
    }

    Ok(())
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
    async fn test_debit_decrements_exactly() {
        let db = test_db().await;
        let inv = db.inventory();
        let item = inv.add("Paracetamol 500mg", None, 20, 5).await.unwrap();

        inv.debit(&item.id, 7).await.unwrap();

        let after = inv.get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 13);
    }

    #[tokio::test]
    async fn test_debit_insufficient_stock_leaves_quantity_unchanged() {
        let db = test_db().await;
        let inv = db.inventory();
        let item = inv.add("O+ blood unit", Some("O+"), 3, 2).await.unwrap();

        let err = inv.debit(&item.id, 5).await.unwrap_err();
        match err {
            LedgerError::InsufficientStock {
                name,
                available,
                requested,
            } => {
                assert_eq!(name, "O+ blood unit");
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other}"),
        }

        let after = inv.get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 3);
    }

    #[tokio::test]
    async fn test_debit_to_exactly_zero_is_allowed() {
        let db = test_db().await;
        let inv = db.inventory();
        let item = inv.add("Insulin pen", None, 4, 2).await.unwrap();

        inv.debit(&item.id, 4).await.unwrap();

        let after = inv.get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 0);
    }

    #[tokio::test]
    async fn test_credit_restocks() {
        let db = test_db().await;
        let inv = db.inventory();
        let item = inv.add("Gauze roll", None, 1, 10).await.unwrap();

        inv.credit(&item.id, 49).await.unwrap();

        let after = inv.get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 50);
    }

    #[tokio::test]
    async fn test_debit_missing_item_is_not_found() {
        let db = test_db().await;
        let err = db.inventory().debit("no-such-item", 1).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_low_stock_threshold_boundary() {
        let db = test_db().await;
        let inv = db.inventory();
        inv.add("Amoxicillin 500mg", None, 10, 10).await.unwrap(); // at threshold
        inv.add("Ibuprofen 200mg", None, 2, 10).await.unwrap(); // below
        inv.add("Saline 1L", None, 50, 10).await.unwrap(); // healthy

        let low = inv.list_low_stock().await.unwrap();
        let names: Vec<_> = low.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Ibuprofen 200mg", "Amoxicillin 500mg"]);
    }
}
