//! # Domain Types
//!
//! Core domain types for the inventory reservation subsystem.
//!
//! ## Counter Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Stock Counter Model                               │
//! │                                                                         │
//! │   stock ──────────────► total owned units                               │
//! │   reserved_stock ─────► held against open orders, not yet deducted      │
//! │   available_stock ────► stock − reserved_stock (derived, never stored)  │
//! │                                                                         │
//! │   reserve:  reserved_stock += n   (only if available_stock ≥ n)         │
//! │   release:  reserved_stock −= n   (floored at 0)                        │
//! │   commit:   stock −= n  AND  reserved_stock −= n  (one transaction)     │
//! │                                                                         │
//! │   Invariant: 0 ≤ reserved_stock ≤ stock for every tracked item          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku) - human-readable, potentially mutable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Product
// =============================================================================

/// A sellable product owned by one business.
///
/// A product either carries its own counter pair, or - when it has
/// variants - delegates stock accounting entirely to the variants'
/// counters. The `track_inventory` flag applies to the product *and* all
/// of its variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business (tenant) this product belongs to.
    pub business_id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Whether to track inventory for this product.
    /// When false the item has unlimited availability and the ledger
    /// never consults or mutates its counters.
    pub track_inventory: bool,

    /// Total owned units.
    pub stock: i64,

    /// Units held against open orders, not yet deducted.
    pub reserved_stock: i64,

    /// Whether the product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Units that can still be reserved.
    #[inline]
    pub fn available_stock(&self) -> i64 {
        self.stock - self.reserved_stock
    }

    /// Advisory check whether `quantity` could be reserved right now.
    ///
    /// This is a snapshot read for pre-flight UX checks only. The
    /// authoritative decision is the stock ledger's atomic conditional
    /// update - never this method.
    pub fn can_reserve(&self, quantity: i64) -> bool {
        if !self.track_inventory {
            return true;
        }
        self.available_stock() >= quantity
    }
}

// =============================================================================
// Product Variant
// =============================================================================

/// A variant of a product (size, color, ...).
///
/// Belongs to exactly one parent product and carries its own counter
/// pair. Inherits `track_inventory` from the parent: stock checks for a
/// line item that names a variant operate on the **variant's** counters,
/// never the parent product's.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductVariant {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Parent product.
    pub product_id: String,

    /// Business (tenant) this variant belongs to.
    pub business_id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name (e.g. "Large / Red").
    pub name: String,

    /// Total owned units of this variant.
    pub stock: i64,

    /// Units held against open orders, not yet deducted.
    pub reserved_stock: i64,

    /// When the variant was created.
    pub created_at: DateTime<Utc>,

    /// When the variant was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ProductVariant {
    /// Units that can still be reserved.
    #[inline]
    pub fn available_stock(&self) -> i64 {
        self.stock - self.reserved_stock
    }
}

// =============================================================================
// Item Reference
// =============================================================================

/// Reference to the stockable item a ledger operation targets: a product,
/// or one of its variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    /// The product id. Always present, even when a variant is targeted.
    pub product_id: String,

    /// The variant id, when the line targets a specific variant.
    pub variant_id: Option<String>,
}

impl ItemRef {
    /// Reference to a product's own counters.
    pub fn product(product_id: impl Into<String>) -> Self {
        ItemRef {
            product_id: product_id.into(),
            variant_id: None,
        }
    }

    /// Reference to a variant's counters.
    pub fn variant(product_id: impl Into<String>, variant_id: impl Into<String>) -> Self {
        ItemRef {
            product_id: product_id.into(),
            variant_id: Some(variant_id.into()),
        }
    }
}

impl core::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.variant_id {
            Some(v) => write!(f, "{}/{}", self.product_id, v),
            None => write!(f, "{}", self.product_id),
        }
    }
}

// =============================================================================
// Order Line
// =============================================================================

/// One line of an order batch handed to the reservation coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The product being ordered.
    pub product_id: String,

    /// The variant being ordered, when the product has variants.
    pub variant_id: Option<String>,

    /// Requested quantity. Must be positive.
    pub quantity: i64,
}

impl OrderLine {
    /// Builds a line for a product without variants.
    pub fn product(product_id: impl Into<String>, quantity: i64) -> Self {
        OrderLine {
            product_id: product_id.into(),
            variant_id: None,
            quantity,
        }
    }

    /// Builds a line for a specific variant.
    pub fn variant(
        product_id: impl Into<String>,
        variant_id: impl Into<String>,
        quantity: i64,
    ) -> Self {
        OrderLine {
            product_id: product_id.into(),
            variant_id: Some(variant_id.into()),
            quantity,
        }
    }

    /// The item this line targets.
    pub fn item(&self) -> ItemRef {
        ItemRef {
            product_id: self.product_id.clone(),
            variant_id: self.variant_id.clone(),
        }
    }
}

// =============================================================================
// Shortfall Report
// =============================================================================

/// Per-item shortfall detail returned when a reservation cannot be
/// satisfied. Serialized for the caller's user-facing messaging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub product_id: String,
    pub variant_id: Option<String>,
    /// Quantity the order asked for.
    pub requested: i64,
    /// Quantity that was actually available.
    pub available: i64,
}

// =============================================================================
// Stock Level
// =============================================================================

/// Read-only snapshot of one item's counters, exposed to reporting and
/// admin collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockLevel {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub track_inventory: bool,
    pub stock: i64,
    pub reserved_stock: i64,
}

impl StockLevel {
    /// Units that can still be reserved.
    #[inline]
    pub fn available_stock(&self) -> i64 {
        self.stock - self.reserved_stock
    }
}

// =============================================================================
// Activity Type
// =============================================================================

/// Closed enumeration of audited stock mutations.
///
/// Stored as TEXT in the activity table. The set is deliberately closed:
/// loosely-typed activity strings were a defect in the behavior this
/// subsystem replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// Stock raised by a manual adjustment (restock, correction).
    ManualIncrease,
    /// Stock lowered by a manual adjustment.
    ManualDecrease,
    /// Stock deducted by a fulfilled order (reservation committed).
    OrderSale,
    /// Reservation returned on order cancellation. Only written when
    /// release auditing is enabled; counters other than `reserved_stock`
    /// are untouched, so the delta is zero.
    OrderRelease,
}

// =============================================================================
// Inventory Activity
// =============================================================================

/// One append-only audit record of a stock mutation.
///
/// Immutable once written. `new_stock - old_stock == quantity_delta`
/// always holds; the record is inserted in the same transaction as the
/// counter mutation it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryActivity {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business (tenant) scope.
    pub business_id: String,

    /// Product whose stock changed.
    pub product_id: String,

    /// Variant whose stock changed, when the mutation targeted one.
    pub variant_id: Option<String>,

    /// What kind of mutation this was.
    pub activity_type: ActivityType,

    /// Signed stock change (negative for deductions).
    pub quantity_delta: i64,

    /// Stock before the mutation.
    pub old_stock: i64,

    /// Stock after the mutation.
    pub new_stock: i64,

    /// Free-text reason (e.g. "Order completed", "Supplier restock").
    pub reason: String,

    /// Actor: `"system"`, `"External System"`, or a user id.
    pub changed_by: String,

    /// When the mutation happened.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
