//! # Admission Coordinator
//!
//! Composes the admission record with the bed/room reservation in one
//! atomic unit.
//!
//! ## Admit Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       admit() transaction                               │
//! │                                                                         │
//! │  1. resolve resource  (exact id, or first available of category)       │
//! │  2. INSERT admission row                                               │
//! │  3. reserve resource  (conditional update; loser → Conflict)           │
//! │  4. append audit entry                                                 │
//! │  COMMIT - or ROLLBACK on any failure                                   │
//! │                                                                         │
//! │  Inserting the admission before confirming the reservation is safe     │
//! │  precisely because both live in one transaction: a lost reservation    │
//! │  rolls the insert back too, so a failed admit never leaves an orphan   │
//! │  admission row.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbResult, LedgerError};
use crate::repository::audit::{self, actions};
use crate::repository::{admission, resource};
use medledger_core::validation::validate_ref;
use medledger_core::{Admission, ResourceCategory, ResourceSelector};

/// Arguments for one admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmitRequest {
    pub patient_ref: String,
    pub doctor_ref: String,
    pub resource: ResourceSelector,
    pub admission_date: DateTime<Utc>,
    /// Staff member performing the admission, for audit attribution.
    pub actor_ref: String,
}

/// Coordinator for patient admission and discharge.
#[derive(Debug, Clone)]
pub struct AdmissionCoordinator {
    pool: SqlitePool,
}

impl AdmissionCoordinator {
    /// Creates a new AdmissionCoordinator.
    pub fn new(pool: SqlitePool) -> Self {
        AdmissionCoordinator { pool }
    }

    /// Admits a patient into a bed or room.
    ///
    /// All four effects (admission insert, resource reservation, audit
    /// entry, commit) are all-or-nothing. A reservation lost to a
    /// concurrent admission surfaces as [`LedgerError::Conflict`] with no
    /// residue.
    pub async fn admit(&self, req: AdmitRequest) -> DbResult<Admission> {
        validate_ref("patient_ref", &req.patient_ref)?;
        validate_ref("doctor_ref", &req.doctor_ref)?;
        validate_ref("actor_ref", &req.actor_ref)?;

        let mut tx = self.pool.begin().await?;

        let resource_id = match &req.resource {
            ResourceSelector::Exact(id) => id.clone(),
            ResourceSelector::FirstAvailable(category) => {
                // A plain read; the claim itself is the conditional update
                // below. If the candidate is snapped up in between, the
                // reserve reports Conflict and the caller retries.
                resource::first_available_on(&mut tx, *category)
                    .await?
                    .ok_or_else(|| {
                        LedgerError::conflict("Resource", category_label(*category))
                    })?
            }
        };

        let admission = Admission {
            id: Uuid::new_v4().to_string(),
            patient_ref: req.patient_ref.clone(),
            doctor_ref: req.doctor_ref.clone(),
            resource_id: resource_id.clone(),
            admission_date: req.admission_date,
            discharge_date: None,
            created_at: Utc::now(),
        };

        admission::insert_on(&mut tx, &admission).await?;
        resource::reserve_on(&mut tx, &resource_id, &req.patient_ref, req.admission_date).await?;

        audit::record_on(
            &mut tx,
            &req.actor_ref,
            actions::ADMIT,
            Some(&admission.id),
            &format!(
                "admitted patient {} under doctor {} into resource {}",
                req.patient_ref, req.doctor_ref, resource_id
            ),
        )
        .await?;

        tx.commit().await?;

        info!(
            admission_id = %admission.id,
            patient = %admission.patient_ref,
            resource = %resource_id,
            "Patient admitted"
        );
        Ok(admission)
    }

    /// Discharges a patient: stamps the discharge date and releases the
    /// resource to `cleaning`, in one transaction.
    ///
    /// A second discharge of the same admission trips the
    /// [`LedgerError::AlreadyDischarged`] guard and changes nothing.
    pub async fn discharge(
        &self,
        admission_id: &str,
        when: DateTime<Utc>,
        actor_ref: &str,
    ) -> DbResult<Admission> {
        validate_ref("actor_ref", actor_ref)?;

        let mut tx = self.pool.begin().await?;

        let mut admission = admission::fetch_on(&mut tx, admission_id).await?;
        admission::set_discharged_on(&mut tx, admission_id, when).await?;
        resource::release_on(&mut tx, &admission.resource_id).await?;

        audit::record_on(
            &mut tx,
            actor_ref,
            actions::DISCHARGE,
            Some(admission_id),
            &format!(
                "discharged patient {} from resource {}",
                admission.patient_ref, admission.resource_id
            ),
        )
        .await?;

        tx.commit().await?;

        admission.discharge_date = Some(when);
        info!(admission_id = %admission_id, "Patient discharged");
        Ok(admission)
    }
}

fn category_label(category: ResourceCategory) -> &'static str {
    match category {
        ResourceCategory::Bed => "any available bed",
        ResourceCategory::Room => "any available room",
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
