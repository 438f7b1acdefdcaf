//! # Domain Types
//!
//! Core domain types used throughout the MedLedger consistency core.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Resource     │   │    Admission    │   │    StockItem    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  category       │   │  patient_ref    │   │  name           │       │
//! │  │  status         │   │  resource_id    │   │  quantity       │       │
//! │  │  occupant_ref   │   │  discharge_date │   │  low threshold  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────────┐   ┌──────────────┐      │
//! │  │  Prescription   │   │ BillingTransaction  │   │  AuditEntry  │      │
//! │  │  + items        │   │  pending → paid     │   │  append-only │      │
//! │  └─────────────────┘   └─────────────────────┘   └──────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Display id (e.g. "D0042"): human-readable, issued by the sequence
//!   allocator, carried by the surrounding application as `*_ref` strings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Role
// =============================================================================

/// Entity category a display id is allocated for.
///
/// Each role maps to one `sequence_counters` row keyed by [`Role::prefix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Nurse,
    Admin,
}

impl Role {
    /// The counter category and display-id prefix for this role.
    #[inline]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Role::Patient => "P",
            Role::Doctor => "D",
            Role::Nurse => "N",
            Role::Admin => "A",
        }
    }

    /// All roles, in seeding order.
    pub const ALL: [Role; 4] = [Role::Patient, Role::Doctor, Role::Nurse, Role::Admin];
}

// =============================================================================
// Resource
// =============================================================================

/// Kind of allocable physical resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Bed,
    Room,
}

/// Occupancy state of a resource.
///
/// Transitions: `available → occupied` (reserve), `occupied → cleaning`
/// (release), `cleaning → available` (housekeeping sign-off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Available,
    Occupied,
    Cleaning,
}

/// An allocable physical resource (bed or room).
///
/// Invariant: `occupant_ref` is non-null iff `status == Occupied`, and no
/// occupant holds two resources at once. Enforced by the schema and by the
/// conditional-update reserve path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Resource {
    pub id: String,
    pub category: ResourceCategory,
    /// Ward label shown to staff ("ICU-3", "W2-R14").
    pub label: String,
    pub status: ResourceStatus,
    pub occupant_ref: Option<String>,
    pub occupied_since: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    #[inline]
    pub fn is_available(&self) -> bool {
        self.status == ResourceStatus::Available
    }
}

/// How the admission coordinator picks a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceSelector {
    /// A specific bed/room chosen by staff.
    Exact(String),
    /// Any available resource of the given category.
    FirstAvailable(ResourceCategory),
}

// =============================================================================
// Admission
// =============================================================================

/// A patient admission. Immutable after insert except `discharge_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Admission {
    pub id: String,
    pub patient_ref: String,
    pub doctor_ref: String,
    pub resource_id: String,
    pub admission_date: DateTime<Utc>,
    pub discharge_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Admission {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.discharge_date.is_none()
    }
}

// =============================================================================
// Stock
// =============================================================================

/// A countable stock item (medicine or blood unit).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockItem {
    pub id: String,
    pub name: String,
    /// Medicine category or blood group ("antibiotic", "O+").
    pub item_group: Option<String>,
    /// On-hand quantity. Never negative; debits that would cross zero are
    /// rejected, not clamped.
    pub quantity: i64,
    pub low_stock_threshold: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    /// Whether the item should appear on the reorder dashboard.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}

// =============================================================================
// Prescription
// =============================================================================

/// Aggregate dispensing state of a prescription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    /// No item dispensed yet.
    Pending,
    /// Some, but not all, items dispensed.
    Partial,
    /// Every item dispensed.
    Dispensed,
}

impl PrescriptionStatus {
    /// Derives the aggregate status from item counts.
    ///
    /// Pure so the dispense coordinator can recompute it inside the same
    /// transaction that flips an item, with no second opinion possible.
    ///
    /// ## Example
    /// ```rust
    /// use medledger_core::PrescriptionStatus;
    ///
    /// assert_eq!(PrescriptionStatus::from_counts(3, 0), PrescriptionStatus::Pending);
    /// assert_eq!(PrescriptionStatus::from_counts(3, 1), PrescriptionStatus::Partial);
    /// assert_eq!(PrescriptionStatus::from_counts(3, 3), PrescriptionStatus::Dispensed);
    /// ```
    pub fn from_counts(total: i64, dispensed: i64) -> Self {
        debug_assert!(dispensed <= total);
        if total > 0 && dispensed == total {
            PrescriptionStatus::Dispensed
        } else if dispensed > 0 {
            PrescriptionStatus::Partial
        } else {
            PrescriptionStatus::Pending
        }
    }
}

impl Default for PrescriptionStatus {
    fn default() -> Self {
        PrescriptionStatus::Pending
    }
}

/// A prescription written by a doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Prescription {
    pub id: String,
    pub patient_ref: String,
    pub doctor_ref: String,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a prescription, tied to a stock item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PrescriptionItem {
    pub id: String,
    pub prescription_id: String,
    pub stock_item_id: String,
    pub quantity_prescribed: i64,
    pub is_dispensed: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Billing
// =============================================================================

/// Settlement state of a billable transaction.
/// Only ever moves `Pending → Paid`; this subsystem never reverses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    Card,
    Insurance,
}

/// A billable transaction against a patient account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillingTransaction {
    pub id: String,
    pub account_ref: String,
    pub description: String,
    /// Amount in cents (smallest currency unit).
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub payment_mode: Option<PaymentMode>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Audit
// =============================================================================

/// One immutable audit trail row: who changed what, and a human-readable
/// delta description. Written in the same transaction as the mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditEntry {
    pub id: i64,
    pub actor_ref: String,
    pub action: String,
    pub target_ref: Option<String>,
    pub details: String,
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_prefixes_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for role in Role::ALL {
            assert!(seen.insert(role.prefix()));
        }
    }

    #[test]
    fn test_prescription_status_from_counts() {
        assert_eq!(
            PrescriptionStatus::from_counts(3, 0),
            PrescriptionStatus::Pending
        );
        assert_eq!(
            PrescriptionStatus::from_counts(3, 1),
            PrescriptionStatus::Partial
        );
        assert_eq!(
            PrescriptionStatus::from_counts(3, 2),
            PrescriptionStatus::Partial
        );
        assert_eq!(
            PrescriptionStatus::from_counts(3, 3),
            PrescriptionStatus::Dispensed
        );
    }

    #[test]
    fn test_low_stock_boundary() {
        let item = StockItem {
            id: "i1".into(),
            name: "Amoxicillin 500mg".into(),
            item_group: Some("antibiotic".into()),
            quantity: 10,
            low_stock_threshold: 10,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(item.is_low_stock());
    }
}
