//! # vendra-core: Pure Domain Logic for Vendra Inventory
//!
//! This crate is the **heart** of the inventory reservation subsystem. It
//! contains the domain types, error taxonomy, and input validation as pure
//! code with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Vendra Inventory Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Order Management (external)                     │   │
//! │  │    create order ──► cancel order ──► fulfill order              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 vendra-reserve (Coordinator)                    │   │
//! │  │    reserve_order, release_order, commit_order                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vendra-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐      ┌───────────┐      ┌───────────┐          │   │
//! │  │   │   types   │      │   error   │      │ validation│          │   │
//! │  │   │  Product  │      │ CoreError │      │   rules   │          │   │
//! │  │   │ OrderLine │      │ taxonomy  │      │  checks   │          │   │
//! │  │   └───────────┘      └───────────┘      └───────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  vendra-db (Storage Layer)                      │   │
//! │  │        SQLite stock ledger, activity log, migrations            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, ProductVariant, OrderLine, etc.)
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **No counter math in application memory**: availability is *described*
//!    here but *decided* by the storage layer's atomic updates
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

pub use error::{CoreError, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Actor recorded on activity rows written by the subsystem itself
/// (order commits, automated corrections).
pub const SYSTEM_ACTOR: &str = "system";

/// Actor recorded on activity rows written on behalf of third-party
/// stock-sync integrations pushing authoritative counts.
pub const EXTERNAL_SYSTEM_ACTOR: &str = "External System";

/// Maximum line items allowed in a single reservation batch.
///
/// ## Business Reason
/// Bounds the compensation work a failed batch can require and keeps
/// transaction bursts against the counters reasonable.
pub const MAX_ORDER_LINES: usize = 100;
