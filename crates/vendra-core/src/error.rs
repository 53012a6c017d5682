//! # Error Types
//!
//! Domain error taxonomy for the reservation subsystem.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vendra-core errors (this file)                                         │
//! │  ├── CoreError        - Business-level outcomes (shortfall, not found)  │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  vendra-db errors (separate crate)                                      │
//! │  ├── DbError          - Infrastructure failures (locks, connections)    │
//! │  └── LedgerError      - CoreError or DbError at the ledger boundary     │
//! │                                                                         │
//! │  vendra-reserve errors (separate crate)                                 │
//! │  └── ReserveError     - What Order Management sees                      │
//! │                                                                         │
//! │  Business errors are never retried; infrastructure errors are retried   │
//! │  internally and must never be reported as "no stock available".         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item id, quantities)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business-level ledger outcomes.
///
/// These represent domain decisions, not infrastructure failures: they are
/// returned to the caller as-is and never retried.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced product/variant does not exist, is inactive, or does
    /// not belong to the business. Fatal for the item; aborts the batch.
    #[error("item not found: {item}")]
    ItemNotFound { item: String },

    /// Requested quantity exceeds available stock at reservation time.
    ///
    /// ## When This Occurs
    /// The atomic conditional update inside `try_reserve` found
    /// `stock - reserved_stock < requested` at the moment of the write.
    /// Carries the quantities the caller needs for an actionable message.
    #[error("insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// A commit asked to deduct more than is currently reserved.
    ///
    /// ## When This Occurs
    /// Order Management tried to fulfill quantities it never reserved
    /// (or released them first). The ledger refuses rather than let the
    /// reservation pairing invariant break.
    #[error("commit of {requested} exceeds reserved stock {reserved} for {item}")]
    CommitExceedsReserved {
        item: String,
        requested: i64,
        reserved: i64,
    },

    /// A manual adjustment would set stock below the currently reserved
    /// quantity, which would leave open orders holding units that no
    /// longer exist.
    #[error("cannot set stock of {item} to {requested}: {reserved} units are reserved")]
    AdjustBelowReserved {
        item: String,
        requested: i64,
        reserved: i64,
    },

    /// Counters were observed in a state that the atomic primitives can
    /// never produce (`reserved_stock < 0` or `reserved_stock > stock`).
    ///
    /// Should never occur. Logged as critical; the item refuses further
    /// mutation pending investigation - never silently clamped.
    #[error("inventory invariant violated for {item}: {detail}")]
    InvariantViolation { item: String, detail: String },

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a caller's input doesn't meet requirements. Used for
/// early validation before any counter is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Too many entries in a collection.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
