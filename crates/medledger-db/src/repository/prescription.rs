//! # Prescription Repository
//!
//! Row operations for prescriptions and their lines. The dispensing
//! transaction itself is composed by the dispense coordinator; everything
//! here that mutates exists as a `*_on(conn, ...)` function so it joins
//! that transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DbResult, LedgerError};
use medledger_core::{Prescription, PrescriptionItem, PrescriptionStatus};

const PRESCRIPTION_COLUMNS: &str = "id, patient_ref, doctor_ref, status, created_at, updated_at";
const ITEM_COLUMNS: &str =
    "id, prescription_id, stock_item_id, quantity_prescribed, is_dispensed, created_at";

/// Read side for prescriptions and their lines.
#[derive(Debug, Clone)]
pub struct PrescriptionRepository {
    pool: SqlitePool,
}

impl PrescriptionRepository {
    /// Creates a new PrescriptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PrescriptionRepository { pool }
    }

    /// Gets a prescription by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Prescription>> {
        let prescription = sqlx::query_as::<_, Prescription>(&format!(
            "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prescription)
    }

    /// Gets a single prescription line by ID.
    pub async fn get_item(&self, item_id: &str) -> DbResult<Option<PrescriptionItem>> {
        let item = sqlx::query_as::<_, PrescriptionItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM prescription_items WHERE id = ?1"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// All lines of a prescription, in creation order.
    pub async fn items_for(&self, prescription_id: &str) -> DbResult<Vec<PrescriptionItem>> {
        let items = sqlx::query_as::<_, PrescriptionItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM prescription_items \
             WHERE prescription_id = ?1 ORDER BY created_at, id"
        ))
        .bind(prescription_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

pub(crate) async fn insert_prescription_on(
    conn: &mut SqliteConnection,
    prescription: &Prescription,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO prescriptions (id, patient_ref, doctor_ref, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&prescription.id)
    .bind(&prescription.patient_ref)
    .bind(&prescription.doctor_ref)
    .bind(prescription.status)
    .bind(prescription.created_at)
    .bind(prescription.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_item_on(
    conn: &mut SqliteConnection,
    item: &PrescriptionItem,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO prescription_items
            (id, prescription_id, stock_item_id, quantity_prescribed, is_dispensed, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&item.id)
    .bind(&item.prescription_id)
    .bind(&item.stock_item_id)
    .bind(item.quantity_prescribed)
    .bind(item.is_dispensed)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Fetches a line inside the caller's transaction.
pub(crate) async fn fetch_item_on(
    conn: &mut SqliteConnection,
    item_id: &str,
) -> DbResult<PrescriptionItem> {
    let item = sqlx::query_as::<_, PrescriptionItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM prescription_items WHERE id = ?1"
    ))
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?;

    item.ok_or_else(|| LedgerError::not_found("PrescriptionItem", item_id))
}

/// Flips a line to dispensed, conditionally.
///
/// The `is_dispensed = 0` predicate backs up the coordinator's fetch-time
/// guard with the same zero-rows CAS shape used everywhere else.
pub(crate) async fn mark_dispensed_on(conn: &mut SqliteConnection, item_id: &str) -> DbResult<()> {
    let result =
        sqlx::query("UPDATE prescription_items SET is_dispensed = 1 WHERE id = ?1 AND is_dispensed = 0")
            .bind(item_id)
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::AlreadyDispensed(item_id.to_string()));
    }

    Ok(())
}

/// (total, dispensed) line counts for a prescription, inside the caller's
/// transaction so the aggregate is computed against the current picture.
pub(crate) async fn item_counts_on(
    conn: &mut SqliteConnection,
    prescription_id: &str,
) -> DbResult<(i64, i64)> {
    let counts: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(is_dispensed), 0) \
         FROM prescription_items WHERE prescription_id = ?1",
    )
    .bind(prescription_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(counts)
}

/// Persists the recomputed aggregate status.
pub(crate) async fn set_status_on(
    conn: &mut SqliteConnection,
    prescription_id: &str,
    status: PrescriptionStatus,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE prescriptions SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(prescription_id)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::not_found("Prescription", prescription_id));
    }

    Ok(())
}
