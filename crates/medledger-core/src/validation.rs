//! # Validation Module
//!
//! Input validation for coordinator arguments.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web application forms                                        │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE, before any transaction opens                    │
//! │  └── Reference / quantity / amount rules                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  └── NOT NULL, CHECK, UNIQUE, foreign key constraints                  │
//! │                                                                         │
//! │  Defense in depth: each layer catches different errors                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::{MAX_LINE_QUANTITY, MAX_REF_LEN};

/// Validates an external reference (patient/doctor/account/actor id).
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - Must be at most [`MAX_REF_LEN`] characters
pub fn validate_ref(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.len() > MAX_REF_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_REF_LEN,
        });
    }
    Ok(())
}

/// Validates a stock/dispense quantity: 1..=MAX_LINE_QUANTITY.
pub fn validate_quantity(field: &str, value: i64) -> ValidationResult<()> {
    if value < 1 || value > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a billable amount in cents.
pub fn validate_amount_cents(value: i64) -> ValidationResult<()> {
    if value <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount_cents".to_string(),
        });
    }
    Ok(())
}
