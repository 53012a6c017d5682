//! # Reservation Error Types
//!
//! What Order Management sees. Business outcomes and infrastructure
//! failures keep separate variants all the way out: a storage conflict
//! that exhausted its retries is `RetriesExhausted`, never
//! `InsufficientStock`.

use thiserror::Error;

use vendra_core::{CoreError, Shortfall};
use vendra_db::{DbError, LedgerError};

// =============================================================================
// Reserve Error
// =============================================================================

/// Errors returned by the reservation coordinator.
#[derive(Debug, Error)]
pub enum ReserveError {
    /// The batch could not be reserved: one or more lines exceed
    /// available stock. Carries per-item detail so the caller can present
    /// an actionable message. The batch has been fully rolled back.
    #[error("insufficient stock for {} line(s)", shortfalls.len())]
    InsufficientStock { shortfalls: Vec<Shortfall> },

    /// A business-level outcome other than a shortfall: item not found,
    /// invariant violation, commit/adjust refusals, validation failures.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// A transient storage conflict persisted through every retry.
    ///
    /// The operation may be attempted again by the caller; it was NOT a
    /// stock decision.
    #[error("storage conflict persisted after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: DbError,
    },

    /// A non-transient storage failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl ReserveError {
    /// Returns true if the whole operation can be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReserveError::RetriesExhausted { .. } => true,
            ReserveError::Db(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if this is a business-level outcome the caller must
    /// surface to the user (as opposed to infrastructure trouble).
    pub fn is_business_error(&self) -> bool {
        matches!(
            self,
            ReserveError::InsufficientStock { .. } | ReserveError::Domain(_)
        )
    }
}

impl From<LedgerError> for ReserveError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Domain(e) => ReserveError::Domain(e),
            LedgerError::Db(e) => ReserveError::Db(e),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorization() {
        let err = ReserveError::InsufficientStock { shortfalls: vec![] };
        assert!(err.is_business_error());
        assert!(!err.is_retryable());

        let err = ReserveError::RetriesExhausted {
            attempts: 4,
            source: DbError::Busy("database is locked".into()),
        };
        assert!(!err.is_business_error());
        assert!(err.is_retryable());

        let err = ReserveError::Domain(CoreError::ItemNotFound { item: "p1".into() });
        assert!(err.is_business_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_shortfall_message_counts_lines() {
        let err = ReserveError::InsufficientStock {
            shortfalls: vec![
                Shortfall {
                    product_id: "p1".into(),
                    variant_id: None,
                    requested: 5,
                    available: 3,
                },
                Shortfall {
                    product_id: "p2".into(),
                    variant_id: None,
                    requested: 2,
                    available: 0,
                },
            ],
        };
        assert_eq!(err.to_string(), "insufficient stock for 2 line(s)");
    }
}
