//! # Ledger Error Types
//!
//! Error types for storage operations and concurrency outcomes.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerError (this module) ← Adds context and categorization           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Web layer translates to a user-facing message                         │
//! │  (Conflict / InsufficientStock / AlreadyDispensed are expected under   │
//! │   contention and are NOT retried; Transient may be retried once)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Taxonomy
//! Some variants are not faults at all: `Conflict` means another staff
//! member won a race this operation was always allowed to lose. Every
//! coordinator either fully commits or fully rolls back, so no variant
//! ever describes a partial effect.

use thiserror::Error;

/// Storage and concurrency errors for ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Entity not found in the store.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Optimistic-concurrency loss: the conditional update matched zero
    /// rows because another session got there first.
    ///
    /// ## When This Occurs
    /// - Two staff admit into the same bed; the loser sees this
    /// - Settling a transaction that another session just settled is NOT
    ///   this error (settlement silently skips already-paid rows)
    #[error("{entity} no longer available: {id}")]
    Conflict { entity: String, id: String },

    /// A debit would take stock below zero. The quantity is left unchanged.
    #[error("insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Idempotency guard: this prescription item was already dispensed.
    /// A resubmitted request must not double-debit stock.
    #[error("prescription item already dispensed: {0}")]
    AlreadyDispensed(String),

    /// Idempotency guard: this admission was already discharged.
    #[error("admission already discharged: {0}")]
    AlreadyDischarged(String),

    /// No sequence counter row exists for the category.
    /// Configuration/data error, not a concurrency outcome.
    #[error("unknown sequence category: {0}")]
    UnknownCategory(String),

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate ward label
    /// - Admitting a patient who already occupies another resource
    #[error("duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Infrastructure hiccup (lock contention, pool timeout, commit
    /// failure). Safe for the caller to retry once, immediately.
    #[error("transient storage error: {0}")]
    Transient(String),

    /// Database connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Caller input rejected before any transaction opened.
    #[error("validation error: {0}")]
    Validation(#[from] medledger_core::ValidationError),
}

impl LedgerError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error for a given entity type and ID.
    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        LedgerError::Conflict {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether the caller may retry the operation immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transient(_))
    }
}

/// Convert sqlx errors to LedgerError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → LedgerError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint / busy
/// sqlx::Error::PoolTimedOut   → LedgerError::Transient
/// Other                       → LedgerError::QueryFailed
/// ```
impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => LedgerError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                // Lock contention: "database is locked" / "database table is locked"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    LedgerError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    LedgerError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    LedgerError::Transient(msg.to_string())
                } else {
                    LedgerError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => {
                LedgerError::Transient("connection pool exhausted".to_string())
            }

            sqlx::Error::PoolClosed => LedgerError::ConnectionFailed("pool is closed".to_string()),

            _ => LedgerError::QueryFailed(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for LedgerError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        LedgerError::MigrationFailed(err.to_string())
    }
}

/// Result type for ledger operations.
pub type DbResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LedgerError::InsufficientStock {
            name: "Amoxicillin 500mg".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for Amoxicillin 500mg: available 3, requested 5"
        );
    }

    #[test]
    fn test_transient_is_retryable() {
        assert!(LedgerError::Transient("busy".into()).is_transient());
        assert!(!LedgerError::conflict("Resource", "r1").is_transient());
    }
}
