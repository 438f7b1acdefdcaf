//! # Coordinator Module
//!
//! Coordinators compose repository operations into the atomic units the web
//! layer calls: one coordinator operation per user action.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 One user action = one transaction                       │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    checks and writes (repository *_on functions)                        │
//! │    audit entry (same transaction)                                       │
//! │  COMMIT           ← all effects visible at once                         │
//! │    - or -                                                               │
//! │  ROLLBACK         ← no effects at all, typed error returned             │
//! │                                                                         │
//! │  Coordinators never span multiple round-trips to the caller and never  │
//! │  surface partial effects.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Coordinators
//!
//! - [`admission::AdmissionCoordinator`] - admit / discharge
//! - [`dispense::DispenseCoordinator`] - prescription creation / dispensing

pub mod admission;
pub mod dispense;
