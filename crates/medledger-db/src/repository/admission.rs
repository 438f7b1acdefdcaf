//! # Admission Repository
//!
//! Row operations for admission records. The admit/discharge transactions
//! are composed by the admission coordinator.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DbResult, LedgerError};
use medledger_core::Admission;

const ADMISSION_COLUMNS: &str =
    "id, patient_ref, doctor_ref, resource_id, admission_date, discharge_date, created_at";

/// Read side for admissions.
#[derive(Debug, Clone)]
pub struct AdmissionRepository {
    pool: SqlitePool,
}

impl AdmissionRepository {
    /// Creates a new AdmissionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AdmissionRepository { pool }
    }

    /// Gets an admission by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Admission>> {
        let admission = sqlx::query_as::<_, Admission>(&format!(
            "SELECT {ADMISSION_COLUMNS} FROM admissions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(admission)
    }

    /// Admissions for a patient, newest first.
    pub async fn for_patient(&self, patient_ref: &str) -> DbResult<Vec<Admission>> {
        let admissions = sqlx::query_as::<_, Admission>(&format!(
            "SELECT {ADMISSION_COLUMNS} FROM admissions \
             WHERE patient_ref = ?1 ORDER BY admission_date DESC"
        ))
        .bind(patient_ref)
        .fetch_all(&self.pool)
        .await?;

        Ok(admissions)
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

pub(crate) async fn insert_on(conn: &mut SqliteConnection, admission: &Admission) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO admissions
            (id, patient_ref, doctor_ref, resource_id, admission_date, discharge_date, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6)
        "#,
    )
    .bind(&admission.id)
    .bind(&admission.patient_ref)
    .bind(&admission.doctor_ref)
    .bind(&admission.resource_id)
    .bind(admission.admission_date)
    .bind(admission.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Fetches an admission inside the caller's transaction.
pub(crate) async fn fetch_on(conn: &mut SqliteConnection, id: &str) -> DbResult<Admission> {
    let admission = sqlx::query_as::<_, Admission>(&format!(
        "SELECT {ADMISSION_COLUMNS} FROM admissions WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    admission.ok_or_else(|| LedgerError::not_found("Admission", id))
}

/// Stamps the discharge date, conditionally: an already-discharged
/// admission matches zero rows and trips the idempotency guard.
pub(crate) async fn set_discharged_on(
    conn: &mut SqliteConnection,
    id: &str,
    when: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE admissions SET discharge_date = ?2 WHERE id = ?1 AND discharge_date IS NULL",
    )
    .bind(id)
    .bind(when)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::AlreadyDischarged(id.to_string()));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::coordinator::admission::AdmitRequest;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use medledger_core::{ResourceCategory, ResourceSelector};

    #[tokio::test]
    async fn test_for_patient_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let b1 = db
            .resources()
            .add(ResourceCategory::Bed, "W1-B1")
            .await
            .unwrap();
        let b2 = db
            .resources()
            .add(ResourceCategory::Bed, "W1-B2")
            .await
            .unwrap();

        let first = db
            .admissions()
            .admit(AdmitRequest {
                patient_ref: "P0001".into(),
                doctor_ref: "D0001".into(),
                resource: ResourceSelector::Exact(b1.id),
                admission_date: Utc::now() - chrono::Duration::days(30),
                actor_ref: "staff-1".into(),
            })
            .await
            .unwrap();
        db.admissions()
            .discharge(&first.id, Utc::now() - chrono::Duration::days(20), "staff-1")
            .await
            .unwrap();

        let second = db
            .admissions()
            .admit(AdmitRequest {
                patient_ref: "P0001".into(),
                doctor_ref: "D0002".into(),
                resource: ResourceSelector::Exact(b2.id),
                admission_date: Utc::now(),
                actor_ref: "staff-1".into(),
            })
            .await
            .unwrap();

        let history = db.admission_records().for_patient("P0001").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].id, first.id);

        let fetched = db
            .admission_records()
            .get_by_id(&first.id)
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.discharge_date.is_some());
    }
}
