//! # Billing Repository
//!
//! Billable transactions and atomic bulk settlement.
//!
//! ## Settlement Races Are Expected
//! Two staff can be looking at the same unpaid list; both hit "settle".
//! The design favors idempotent "settle what you can" over all-or-nothing
//! rejection: one conditional bulk update flips only the rows still
//! `pending`, already-paid rows are silently skipped, and the returned
//! count reflects rows actually transitioned. Status only ever moves
//! `pending → paid`.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::audit::{self, actions};
use medledger_core::validation::{validate_amount_cents, validate_ref};
use medledger_core::{BillingTransaction, PaymentMode, PaymentStatus};

const BILLING_COLUMNS: &str =
    "id, account_ref, description, amount_cents, status, payment_mode, paid_at, created_at";

/// Repository for billing operations.
#[derive(Debug, Clone)]
pub struct BillingRepository {
    pool: SqlitePool,
}

impl BillingRepository {
    /// Creates a new BillingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillingRepository { pool }
    }

    /// Adds a pending billable transaction to an account.
    pub async fn add(
        &self,
        account_ref: &str,
        description: &str,
        amount_cents: i64,
    ) -> DbResult<BillingTransaction> {
        validate_ref("account_ref", account_ref)?;
        validate_amount_cents(amount_cents)?;

        let now = Utc::now();
        let txn = BillingTransaction {
            id: Uuid::new_v4().to_string(),
            account_ref: account_ref.to_string(),
            description: description.to_string(),
            amount_cents,
            status: PaymentStatus::Pending,
            payment_mode: None,
            paid_at: None,
            created_at: now,
        };

        debug!(id = %txn.id, account = %account_ref, amount = %amount_cents, "Adding billing transaction");

        sqlx::query(
            r#"
            INSERT INTO billing_transactions
                (id, account_ref, description, amount_cents, status, payment_mode, paid_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL, ?6)
            "#,
        )
        .bind(&txn.id)
        .bind(&txn.account_ref)
        .bind(&txn.description)
        .bind(txn.amount_cents)
        .bind(txn.status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(txn)
    }

    /// Gets a transaction by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<BillingTransaction>> {
        let txn = sqlx::query_as::<_, BillingTransaction>(&format!(
            "SELECT {BILLING_COLUMNS} FROM billing_transactions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(txn)
    }

    /// Pending transactions for an account, oldest first.
    pub async fn list_pending(&self, account_ref: &str) -> DbResult<Vec<BillingTransaction>> {
        let txns = sqlx::query_as::<_, BillingTransaction>(&format!(
            "SELECT {BILLING_COLUMNS} FROM billing_transactions \
             WHERE account_ref = ?1 AND status = 'pending' ORDER BY created_at"
        ))
        .bind(account_ref)
        .fetch_all(&self.pool)
        .await?;

        Ok(txns)
    }

    /// Settles a batch of transactions in one transaction.
    ///
    /// ## Contract
    /// - One conditional bulk update: `status = 'paid'` only for rows still
    ///   `pending` among `ids`
    /// - Already-paid rows (e.g. concurrently settled by another session)
    ///   are skipped, not errors
    /// - Returns the number of rows actually transitioned
    /// - One audit entry summarizes the batch; zero transitions still commit
    ///   the (empty) batch with no audit row
    pub async fn settle(
        &self,
        ids: &[String],
        mode: PaymentMode,
        actor_ref: &str,
    ) -> DbResult<u64> {
        validate_ref("actor_ref", actor_ref)?;

        if ids.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "UPDATE billing_transactions SET status = 'paid', payment_mode = ",
        );
        builder.push_bind(mode);
        builder.push(", paid_at = ");
        builder.push_bind(now);
        builder.push(" WHERE status = 'pending' AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        builder.push(")");

        let settled = builder.build().execute(&mut *tx).await?.rows_affected();

        if settled > 0 {
            audit::record_on(
                &mut tx,
                actor_ref,
                actions::SETTLE,
                None,
                &format!(
                    "settled {} of {} transactions ({:?})",
                    settled,
                    ids.len(),
                    mode
                ),
            )
            .await?;
        }

        tx.commit().await?;

        info!(settled = %settled, requested = %ids.len(), actor = %actor_ref, "Settled billing batch");
        Ok(settled)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_settle_flips_pending_rows() {
        let db = test_db().await;
        let billing = db.billing();
        let t1 = billing.add("acct-1", "X-ray", 12_000).await.unwrap();
        let t2 = billing.add("acct-1", "Ward stay", 45_000).await.unwrap();

        let settled = billing
            .settle(&[t1.id.clone(), t2.id.clone()], PaymentMode::Cash, "staff-3")
            .await
            .unwrap();
        assert_eq!(settled, 2);

        let t1 = billing.get_by_id(&t1.id).await.unwrap().unwrap();
        assert_eq!(t1.status, PaymentStatus::Paid);
        assert_eq!(t1.payment_mode, Some(PaymentMode::Cash));
        assert!(t1.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_settle_skips_already_paid() {
        let db = test_db().await;
        let billing = db.billing();
        let t1 = billing.add("acct-2", "Lab panel", 8_000).await.unwrap();
        let t2 = billing.add("acct-2", "Pharmacy", 3_000).await.unwrap();
        let t3 = billing.add("acct-2", "Consult", 15_000).await.unwrap();

        // t2 settled by "another session" first.
        billing
            .settle(std::slice::from_ref(&t2.id), PaymentMode::Card, "staff-1")
            .await
            .unwrap();

        // Batch containing the already-paid id settles the rest, count=2.
        let settled = billing
            .settle(
                &[t1.id.clone(), t2.id.clone(), t3.id.clone()],
                PaymentMode::Cash,
                "staff-2",
            )
            .await
            .unwrap();
        assert_eq!(settled, 2);

        // t2 keeps its original mode; never reversed or re-stamped.
        let t2 = billing.get_by_id(&t2.id).await.unwrap().unwrap();
        assert_eq!(t2.payment_mode, Some(PaymentMode::Card));
    }

    #[tokio::test]
    async fn test_settle_empty_set_is_a_no_op() {
        let db = test_db().await;
        let settled = db
            .billing()
            .settle(&[], PaymentMode::Cash, "staff-1")
            .await
            .unwrap();
        assert_eq!(settled, 0);
        assert_eq!(db.audit().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_settle_writes_one_audit_entry_per_batch() {
        let db = test_db().await;
        let billing = db.billing();
        let t1 = billing.add("acct-3", "ECG", 5_000).await.unwrap();
        let t2 = billing.add("acct-3", "MRI", 90_000).await.unwrap();

        billing
            .settle(&[t1.id, t2.id], PaymentMode::Insurance, "staff-9")
            .await
            .unwrap();

        let entries = db.audit().recent(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor_ref, "staff-9");
        assert!(entries[0].details.contains("settled 2 of 2"));
    }

    #[tokio::test]
    async fn test_add_rejects_non_positive_amount() {
        let db = test_db().await;
        let err = db.billing().add("acct-4", "Nothing", 0).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_pending_excludes_paid() {
        let db = test_db().await;
        let billing = db.billing();
        let t1 = billing.add("acct-5", "Dressing", 1_000).await.unwrap();
        billing.add("acct-5", "Vaccine", 2_000).await.unwrap();

        billing
            .settle(std::slice::from_ref(&t1.id), PaymentMode::Cash, "staff-1")
            .await
            .unwrap();

        let pending = billing.list_pending("acct-5").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].description, "Vaccine");
    }
}
