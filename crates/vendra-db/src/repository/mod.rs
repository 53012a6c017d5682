//! # Repository Module
//!
//! Database repository implementations for the inventory subsystem.
//!
//! ## Division of Labor
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CatalogRepository      products/variants persistence and the           │
//! │                         read-only stock level snapshots                 │
//! │                                                                         │
//! │  StockLedger            the four atomic counter primitives:             │
//! │                         try_reserve / release / commit / manual_adjust  │
//! │                                                                         │
//! │  ActivityLogRepository  append-only audit trail, written inside the     │
//! │                         ledger's transactions, read by reporting        │
//! │                                                                         │
//! │  Only the StockLedger writes `stock`/`reserved_stock`. The catalog      │
//! │  inserts rows with their opening counts and never touches the           │
//! │  counters afterwards.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod activity;
pub mod catalog;
pub mod ledger;
