//! # Dispense Coordinator
//!
//! Composes prescription-item fulfillment with the stock debit and the
//! parent status recomputation.
//!
//! ## Dispense Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    dispense_item() transaction                          │
//! │                                                                         │
//! │  1. fetch line            → AlreadyDispensed guard (a resubmitted      │
//! │                             request must not double-debit stock)       │
//! │  2. debit stock           → conditional update; InsufficientStock      │
//! │                             aborts the whole transaction               │
//! │  3. flip is_dispensed     → conditional update; 0 rows means another   │
//! │                             writer won the race                        │
//! │  4. recompute parent      → counts read in THIS transaction, so a      │
//! │     status                  concurrent sibling dispense can never      │
//! │                             compute against a stale picture            │
//! │  5. append audit entry                                                 │
//! │  COMMIT - or ROLLBACK on any failure                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbResult, LedgerError};
use crate::repository::audit::{self, actions};
use crate::repository::{inventory, prescription};
use medledger_core::validation::{validate_quantity, validate_ref};
use medledger_core::{Prescription, PrescriptionItem, PrescriptionStatus};

/// One requested line when creating a prescription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionLine {
    pub stock_item_id: String,
    pub quantity: i64,
}

/// Result of a successful dispense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseOutcome {
    pub item_id: String,
    pub prescription_id: String,
    /// Aggregate status after this dispense (`partial` or `dispensed`).
    pub prescription_status: PrescriptionStatus,
}

/// Coordinator for prescription creation and dispensing.
#[derive(Debug, Clone)]
pub struct DispenseCoordinator {
    pool: SqlitePool,
}

impl DispenseCoordinator {
    /// Creates a new DispenseCoordinator.
    pub fn new(pool: SqlitePool) -> Self {
        DispenseCoordinator { pool }
    }

    /// Creates a prescription with its lines, status `pending`, in one
    /// transaction. Stock is not touched until each line is dispensed.
    pub async fn create_prescription(
        &self,
        patient_ref: &str,
        doctor_ref: &str,
        lines: &[PrescriptionLine],
    ) -> DbResult<Prescription> {
        validate_ref("patient_ref", patient_ref)?;
        validate_ref("doctor_ref", doctor_ref)?;
        if lines.is_empty() {
            return Err(medledger_core::ValidationError::Required {
                field: "lines".to_string(),
            }
            .into());
        }
        for line in lines {
            validate_quantity("quantity", line.quantity)?;
        }

        let now = chrono::Utc::now();
        let prescription = Prescription {
            id: Uuid::new_v4().to_string(),
            patient_ref: patient_ref.to_string(),
            doctor_ref: doctor_ref.to_string(),
            status: PrescriptionStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        prescription::insert_prescription_on(&mut tx, &prescription).await?;
        for line in lines {
            let item = PrescriptionItem {
                id: Uuid::new_v4().to_string(),
                prescription_id: prescription.id.clone(),
                stock_item_id: line.stock_item_id.clone(),
                quantity_prescribed: line.quantity,
                is_dispensed: false,
                created_at: now,
            };
            prescription::insert_item_on(&mut tx, &item).await?;
        }

        tx.commit().await?;

        info!(
            prescription_id = %prescription.id,
            lines = lines.len(),
            "Prescription created"
        );
        Ok(prescription)
    }

    /// Dispenses one prescription line: debits stock, flips the line, and
    /// recomputes the parent's aggregate status, all in one transaction.
    pub async fn dispense_item(&self, item_id: &str, actor_ref: &str) -> DbResult<DispenseOutcome> {
        validate_ref("actor_ref", actor_ref)?;

        let mut tx = self.pool.begin().await?;

        let item = prescription::fetch_item_on(&mut tx, item_id).await?;
        if item.is_dispensed {
            return Err(LedgerError::AlreadyDispensed(item_id.to_string()));
        }

        inventory::debit_on(&mut tx, &item.stock_item_id, item.quantity_prescribed).await?;
        prescription::mark_dispensed_on(&mut tx, item_id).await?;

        let (total, dispensed) =
            prescription::item_counts_on(&mut tx, &item.prescription_id).await?;
        let status = PrescriptionStatus::from_counts(total, dispensed);
        prescription::set_status_on(&mut tx, &item.prescription_id, status).await?;

        audit::record_on(
            &mut tx,
            actor_ref,
            actions::DISPENSE_ITEM,
            Some(item_id),
            &format!(
                "dispensed {} x stock item {} for prescription {}",
                item.quantity_prescribed, item.stock_item_id, item.prescription_id
            ),
        )
        .await?;

        tx.commit().await?;

        info!(
            item_id = %item_id,
            prescription_id = %item.prescription_id,
            status = ?status,
            "Prescription item dispensed"
        );
        Ok(DispenseOutcome {
            item_id: item_id.to_string(),
            prescription_id: item.prescription_id,
            prescription_status: status,
        })
    }
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

    /// Catalog item + 3-line prescription against it.
    async fn three_line_prescription(db: &Database) -> (String, Vec<String>) {
        let item = db
            .inventory()
            .add("Amoxicillin 500mg", Some("antibiotic"), 100, 10)
            .await
            .unwrap();

        let lines: Vec<PrescriptionLine> = (0..3)
            .map(|_| PrescriptionLine {
                stock_item_id: item.id.clone(),
                quantity: 2,
            })
            .collect();
        let prescription = db
            .dispensing()
            .create_prescription("P0001", "D0001", &lines)
            .await
            .unwrap();

        let item_ids = db
            .prescriptions()
            .items_for(&prescription.id)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        (prescription.id, item_ids)
    }

    #[tokio::test]
    async fn test_status_progression_partial_then_dispensed() {
        let db = test_db().await;
        let (prescription_id, items) = three_line_prescription(&db).await;

        let outcome = db
            .dispensing()
            .dispense_item(&items[0], "pharm-1")
            .await
            .unwrap();
        assert_eq!(outcome.prescription_status, PrescriptionStatus::Partial);

        db.dispensing()
            .dispense_item(&items[1], "pharm-1")
            .await
            .unwrap();
        let outcome = db
            .dispensing()
            .dispense_item(&items[2], "pharm-1")
            .await
            .unwrap();
        assert_eq!(outcome.prescription_status, PrescriptionStatus::Dispensed);

        let parent = db
            .prescriptions()
            .get_by_id(&prescription_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(parent.status, PrescriptionStatus::Dispensed);
    }

    #[tokio::test]
    async fn test_double_dispense_debits_stock_once() {
        let db = test_db().await;
        let stock = db
            .inventory()
            .add("Ibuprofen 200mg", None, 10, 2)
            .await
            .unwrap();
        let prescription = db
            .dispensing()
            .create_prescription(
                "P0002",
                "D0001",
                &[PrescriptionLine {
                    stock_item_id: stock.id.clone(),
                    quantity: 4,
                }],
            )
            .await
            .unwrap();
        let item_id = db.prescriptions().items_for(&prescription.id).await.unwrap()[0]
            .id
            .clone();

        db.dispensing()
            .dispense_item(&item_id, "pharm-1")
            .await
            .unwrap();
        let err = db
            .dispensing()
            .dispense_item(&item_id, "pharm-1")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyDispensed(_)));

        // Debited exactly once in total.
        let stock = db.inventory().get_by_id(&stock.id).await.unwrap().unwrap();
        assert_eq!(stock.quantity, 6);
    }

    #[tokio::test]
    async fn test_insufficient_stock_aborts_whole_dispense() {
        let db = test_db().await;
        let stock = db.inventory().add("Insulin pen", None, 1, 1).await.unwrap();
        let prescription = db
            .dispensing()
            .create_prescription(
                "P0003",
                "D0002",
                &[PrescriptionLine {
                    stock_item_id: stock.id.clone(),
                    quantity: 3,
                }],
            )
            .await
            .unwrap();
        let item_id = db.prescriptions().items_for(&prescription.id).await.unwrap()[0]
            .id
            .clone();

        let err = db
            .dispensing()
            .dispense_item(&item_id, "pharm-2")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { .. }));

        // Nothing moved: stock intact, line not flipped, parent still
        // pending, no audit entry.
        let stock = db.inventory().get_by_id(&stock.id).await.unwrap().unwrap();
        assert_eq!(stock.quantity, 1);
        let item = db.prescriptions().get_item(&item_id).await.unwrap().unwrap();
        assert!(!item.is_dispensed);
        let parent = db
            .prescriptions()
            .get_by_id(&prescription.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(parent.status, PrescriptionStatus::Pending);
        assert_eq!(db.audit().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_each_dispense_audits_actor_and_target() {
        let db = test_db().await;
        let (_, items) = three_line_prescription(&db).await;

        db.dispensing()
            .dispense_item(&items[0], "pharm-7")
            .await
            .unwrap();

        let trail = db.audit().for_target(&items[0]).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].actor_ref, "pharm-7");
        assert_eq!(trail[0].action, actions::DISPENSE_ITEM);
    }

    #[tokio::test]
    async fn test_create_prescription_rejects_empty_lines() {
        let db = test_db().await;
        let err = db
            .dispensing()
            .create_prescription("P0004", "D0001", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_dispense_unknown_item_is_not_found() {
        let db = test_db().await;
        let err = db
            .dispensing()
            .dispense_item("no-such-line", "pharm-1")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }
}
