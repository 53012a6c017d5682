//! # vendra-reserve: Reservation Coordinator
//!
//! The narrow interface Order Management calls at three lifecycle points:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Order Lifecycle Integration                         │
//! │                                                                         │
//! │  Order created ───────────► reserve_order(lines)                        │
//! │                             │  all-or-nothing; rolls back partial       │
//! │                             │  reservations before reporting failure    │
//! │                             ▼                                           │
//! │  Order cancelled/expired ─► release_order(lines)                        │
//! │  or payment failed          │  idempotent, clamped at zero              │
//! │                             ▼                                           │
//! │  Order fulfilled ─────────► commit_order(lines)                         │
//! │                                per-item atomic deduction + audit row;   │
//! │                                safely retryable after a crash           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`coordinator`] - batch reserve/release/commit with compensation
//! - [`availability`] - advisory pre-flight shortfall reports
//! - [`config`] - coordinator configuration and retry policy
//! - [`retry`] - bounded exponential backoff for transient conflicts
//! - [`error`] - what Order Management sees
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vendra_db::{Database, DbConfig};
//! use vendra_reserve::ReservationCoordinator;
//! use vendra_core::OrderLine;
//!
//! let db = Database::new(DbConfig::new("vendra.db")).await?;
//! let coordinator = ReservationCoordinator::new(db);
//!
//! let lines = vec![OrderLine::product("prod-1", 2)];
//! coordinator.reserve_order("business-1", &lines).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod config;
pub mod coordinator;
pub mod error;
mod retry;

// =============================================================================
// Re-exports
// =============================================================================

pub use availability::AvailabilityChecker;
pub use config::{ReserveConfig, RetryPolicy};
pub use coordinator::ReservationCoordinator;
pub use error::ReserveError;
