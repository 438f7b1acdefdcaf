//! # medledger-core: Pure Domain Logic for MedLedger
//!
//! This crate is the **heart** of the MedLedger consistency core. It contains
//! the domain types and the pure rules (display id formatting, prescription
//! status derivation, low-stock checks) with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MedLedger Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Hospital Web Application                        │   │
//! │  │    admission forms ──► pharmacy desk ──► billing desk           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ one coordinator call per user action   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                medledger-db (SQLite layer)                      │   │
//! │  │    repositories, coordinators, audit, transactions              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ medledger-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Resource, Admission, StockItem, etc.)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::ValidationError;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Width of the numeric part of a display id ("D0042" → 4).
///
/// Values past 9999 widen naturally; padding only guarantees a minimum.
pub const DISPLAY_ID_WIDTH: usize = 4;

/// Maximum quantity a single prescription line may carry.
///
/// ## Business Reason
/// Prevents accidental over-dispensing (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum length of an external reference (patient/doctor/account ids).
pub const MAX_REF_LEN: usize = 64;

/// Formats a sequence value as a human-readable display id.
///
/// ## Example
/// ```rust
/// use medledger_core::{format_display_id, Role};
///
/// assert_eq!(format_display_id(Role::Doctor.prefix(), 42), "D0042");
/// assert_eq!(format_display_id("P", 12345), "P12345");
/// ```
pub fn format_display_id(prefix: &str, value: i64) -> String {
    format!("{}{:0width$}", prefix, value, width = DISPLAY_ID_WIDTH)
}
