//! # medledger-db: Database Layer for MedLedger
//!
//! This crate is the transactional consistency core of the hospital system.
//! It uses SQLite via sqlx and owns every transaction boundary.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       MedLedger Data Flow                               │
//! │                                                                         │
//! │  Web handler (admission form, pharmacy desk, billing desk)             │
//! │       │  one coordinator call per user action                          │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   medledger-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐   │   │
//! │  │   │   Database    │   │  Repositories  │   │  Coordinators │   │   │
//! │  │   │   (pool.rs)   │   │  sequence      │   │  admission    │   │   │
//! │  │   │               │   │  resource      │   │  dispense     │   │   │
//! │  │   │ SqlitePool    │◄──│  inventory     │◄──│               │   │   │
//! │  │   │ Migrations    │   │  billing       │   │  (one tx per  │   │   │
//! │  │   │               │   │  audit         │   │   operation)  │   │   │
//! │  │   └───────────────┘   └────────────────┘   └───────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL mode, foreign keys on)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Error taxonomy (conflicts, stock, guards, transient)
//! - [`repository`] - Repository implementations
//! - [`coordinator`] - Atomic multi-step operations + audit
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medledger_db::{Database, DbConfig};
//! use medledger_core::Role;
//!
//! let db = Database::new(DbConfig::new("path/to/medledger.db")).await?;
//!
//! // Allocate a display id
//! let id = db.sequences().allocate_for_role(Role::Doctor).await?;
//!
//! // Admit a patient (admission + bed reservation + audit, atomically)
//! let admission = db.admissions().admit(request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coordinator;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbResult, LedgerError};
pub use pool::{Database, DbConfig};

// Coordinator re-exports for convenience
pub use coordinator::admission::{AdmissionCoordinator, AdmitRequest};
pub use coordinator::dispense::{DispenseCoordinator, DispenseOutcome, PrescriptionLine};

// Repository re-exports for convenience
pub use repository::admission::AdmissionRepository;
pub use repository::audit::AuditRepository;
pub use repository::billing::BillingRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::prescription::PrescriptionRepository;
pub use repository::resource::ResourceRepository;
pub use repository::sequence::SequenceRepository;
