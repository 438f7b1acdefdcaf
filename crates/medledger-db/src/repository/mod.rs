//! # Repository Module
//!
//! Database repository implementations for MedLedger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Web layer / coordinator                                               │
//! │       │                                                                 │
//! │       │  db.inventory().debit("item-id", 2)                            │
//! │       ▼                                                                 │
//! │  InventoryRepository                                                   │
//! │  ├── debit(&self, id, qty)        ← pool-scoped, own transaction       │
//! │  └── debit_on(conn, id, qty)      ← runs inside a caller's transaction │
//! │       │                                                                 │
//! │       │  SQL (conditional single-statement update)                     │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The `*_on(conn, ...)` Convention
//! Every mutating operation a coordinator composes exists as a free function
//! taking `&mut SqliteConnection`, so it joins the coordinator's transaction
//! and rolls back with it. The repository methods on the pool are thin
//! wrappers for callers that don't need to compose.
//!
//! ## Available Repositories
//!
//! - [`sequence::SequenceRepository`] - Display id allocation
//! - [`resource::ResourceRepository`] - Bed/room occupancy
//! - [`inventory::InventoryRepository`] - Stock debit/credit
//! - [`prescription::PrescriptionRepository`] - Prescriptions and lines
//! - [`billing::BillingRepository`] - Transaction settlement
//! - [`audit::AuditRepository`] - Append-only audit trail

pub mod admission;
pub mod audit;
pub mod billing;
pub mod inventory;
pub mod prescription;
pub mod resource;
pub mod sequence;
