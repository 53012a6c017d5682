//! # Database Error Types
//!
//! Error types for storage operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← categorized; Busy is the retryable one         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerError ← DbError or a business outcome (CoreError)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ReserveError (vendra-reserve) ← what Order Management sees             │
//! │                                                                         │
//! │  The critical rule: a Busy/lock error is NEVER reported as              │
//! │  "insufficient stock" - infrastructure and business failures keep       │
//! │  separate types all the way up.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use vendra_core::CoreError;

// =============================================================================
// Db Error
// =============================================================================

/// Infrastructure-level storage errors.
///
/// These wrap sqlx errors and categorize them for the retry policy in
/// the coordinator. They carry no business meaning.
#[derive(Debug, Error)]
pub enum DbError {
    /// Row not found where one was required.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Lock contention or serialization failure.
    ///
    /// ## When This Occurs
    /// - SQLITE_BUSY: another connection holds the write lock
    /// - SQLITE_LOCKED: a table is locked within this connection
    /// - WAL snapshot conflict on transaction upgrade
    ///
    /// Transient: callers retry with bounded backoff.
    #[error("storage busy: {0}")]
    Busy(String),

    /// Unique or foreign key constraint violation.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Database connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns true if this error is transient and the operation can be
    /// retried.
    ///
    /// ## Retryable Errors
    /// - Lock contention / serialization failures
    /// - Pool exhaustion
    ///
    /// ## Non-Retryable Errors
    /// - Missing rows, constraint violations
    /// - Connection and migration failures
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Busy(_) | DbError::PoolExhausted)
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Busy for lock errors, ConstraintViolation
///                               for UNIQUE/FK, QueryFailed otherwise
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite reports lock contention as "database is locked"
                // (SQLITE_BUSY, incl. WAL snapshot conflicts) or
                // "database table is locked" (SQLITE_LOCKED).
                if msg.contains("locked") {
                    DbError::Busy(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed")
                    || msg.contains("FOREIGN KEY constraint failed")
                    || msg.contains("CHECK constraint failed")
                {
                    DbError::ConstraintViolation(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for infrastructure-level database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Ledger Error
// =============================================================================

/// Outcome type of the stock ledger primitives: either a business-level
/// decision (shortfall, not found, invariant breach) or an
/// infrastructure failure.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Business-level outcome (never retried).
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Infrastructure failure (retryable when `DbError::is_retryable`).
    #[error(transparent)]
    Db(#[from] DbError),
}

impl LedgerError {
    /// Returns true if the operation can be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Db(e) if e.is_retryable())
    }
}

/// Result type for stock ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(DbError::Busy("database is locked".into()).is_retryable());
        assert!(DbError::PoolExhausted.is_retryable());

        assert!(!DbError::not_found("Product", "p1").is_retryable());
        assert!(!DbError::ConstraintViolation("UNIQUE".into()).is_retryable());
        assert!(!DbError::QueryFailed("syntax".into()).is_retryable());
    }

    #[test]
    fn test_ledger_error_retryable() {
        let err = LedgerError::Db(DbError::Busy("database is locked".into()));
        assert!(err.is_retryable());

        let err = LedgerError::Domain(CoreError::ItemNotFound { item: "p1".into() });
        assert!(!err.is_retryable());
    }
}
