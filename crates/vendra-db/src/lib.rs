//! # vendra-db: Database Layer for Vendra Inventory
//!
//! This crate provides storage for the inventory reservation subsystem.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Vendra Inventory Data Flow                         │
//! │                                                                         │
//! │  Reservation Coordinator (vendra-reserve)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     vendra-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │ Repositories  │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │ catalog.rs    │    │  (embedded)  │   │   │
//! │  │   │               │    │ ledger.rs     │    │              │   │   │
//! │  │   │ SqlitePool    │◄───│ activity.rs   │    │ 001_init.sql │   │   │
//! │  │   │ WAL + busy    │    │               │    │              │   │   │
//! │  │   │ timeout       │    │               │    │              │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (one row of counters per product / per variant)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and ledger error types
//! - [`repository`] - Repository implementations (catalog, ledger, activity)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vendra_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/vendra.db")).await?;
//!
//! // Atomic reservation against one item's counters
//! db.ledger().try_reserve("business-1", &item, 3).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, LedgerError};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::activity::{ActivityFilter, ActivityLogRepository};
pub use repository::catalog::CatalogRepository;
pub use repository::ledger::{LedgerConfig, StockLedger};
