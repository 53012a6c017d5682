//! # Stock Ledger
//!
//! Atomic, invariant-preserving primitives over a single item's counters.
//! This is the one component allowed to write `stock`/`reserved_stock`.
//!
//! ## Why Conditional Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              The TOCTOU Race This Module Exists To Kill                 │
//! │                                                                         │
//! │  ❌ WRONG: read counters, decide in application memory, then write     │
//! │                                                                         │
//! │     Worker A: SELECT stock=10, reserved=0   → "6 fits"                  │
//! │     Worker B: SELECT stock=10, reserved=0   → "6 fits"                  │
//! │     Worker A: UPDATE reserved = 6                                       │
//! │     Worker B: UPDATE reserved = 12          → OVERSOLD                  │
//! │                                                                         │
//! │  ✅ CORRECT: one conditional UPDATE, decided under the write lock      │
//! │                                                                         │
//! │     UPDATE products                                                     │
//! │     SET reserved_stock = reserved_stock + 6                             │
//! │     WHERE id = ? AND stock - reserved_stock >= 6                        │
//! │                                                                         │
//! │     rows_affected = 1 → reserved    rows_affected = 0 → shortfall       │
//! │                                                                         │
//! │  Concurrent callers serialize on the storage write lock; the guard      │
//! │  re-evaluates against committed state for each of them in turn, so      │
//! │  two reserves of 6 against 10 can never both win.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commit and manual adjustment run as guarded transactions instead,
//! because they must also append the activity record atomically with the
//! counter change (same unit of work, outbox-style).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{DbError, LedgerError, LedgerResult};
use crate::repository::activity::ActivityLogRepository;
use vendra_core::validation::{validate_quantity, validate_stock_quantity};
use vendra_core::{ActivityType, CoreError, InventoryActivity, ItemRef};

// =============================================================================
// Configuration
// =============================================================================

/// Audit behavior knobs for the stock ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Write an `OrderRelease` activity record when a reservation is
    /// returned. Off by default: releases do not change `stock`.
    pub log_releases: bool,

    /// Write an `OrderSale` activity record when committing an untracked
    /// item. Off by default: untracked commits are counter no-ops.
    pub log_untracked_commits: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            log_releases: false,
            log_untracked_commits: false,
        }
    }
}

// =============================================================================
// Item Resolution
// =============================================================================

/// Which counter row a ledger operation targets.
#[derive(Debug, Clone)]
enum Target {
    /// The product's own counter pair.
    Product { id: String },
    /// A variant's counter pair (parent id kept for the ownership guard).
    Variant { id: String, product_id: String },
}

/// An item reference resolved against the catalog.
#[derive(Debug, Clone)]
struct ResolvedItem {
    target: Target,
    /// Inherited from the product for variant targets.
    track_inventory: bool,
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// The four atomic counter primitives: `try_reserve`, `release`,
/// `commit`, `manual_adjust`.
///
/// Every primitive resolves the item inside the business scope first
/// (missing, inactive, or foreign rows fail with `ItemNotFound`) and
/// bypasses counter logic entirely when the product doesn't track
/// inventory.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
    config: LedgerConfig,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(pool: SqlitePool, config: LedgerConfig) -> Self {
        StockLedger { pool, config }
    }

    // =========================================================================
    // Primitive: try_reserve
    // =========================================================================

    /// Atomically reserves `quantity` units, only if
    /// `stock - reserved_stock >= quantity` at the moment of the write.
    ///
    /// Implemented as a single conditional UPDATE decided by
    /// `rows_affected` - never as a read followed by a write.
    ///
    /// ## Errors
    /// * `CoreError::InsufficientStock` - guard didn't match; carries the
    ///   available quantity observed right after the failed attempt
    /// * `CoreError::ItemNotFound` - item missing/inactive/foreign
    /// * `CoreError::InvariantViolation` - counters found corrupted
    pub async fn try_reserve(
        &self,
        business_id: &str,
        item: &ItemRef,
        quantity: i64,
    ) -> LedgerResult<()> {
        debug!(business_id = %business_id, item = %item, quantity = %quantity, "try_reserve");

        validate_quantity(quantity).map_err(CoreError::from)?;

        let resolved = self.resolve(business_id, item).await?;
        if !resolved.track_inventory {
            debug!(item = %item, "Untracked item, reservation is a no-op");
            return Ok(());
        }

        let now = Utc::now();

        let result = match &resolved.target {
            Target::Product { id } => {
                sqlx::query(
                    r#"
                    UPDATE products
                    SET reserved_stock = reserved_stock + ?1, updated_at = ?2
                    WHERE id = ?3 AND business_id = ?4 AND is_active = 1
                      AND stock - reserved_stock >= ?1
                    "#,
                )
                .bind(quantity)
                .bind(now)
                .bind(id)
                .bind(business_id)
                .execute(&self.pool)
                .await
                .map_err(DbError::from)?
            }
            Target::Variant { id, product_id } => {
                sqlx::query(
                    r#"
                    UPDATE product_variants
                    SET reserved_stock = reserved_stock + ?1, updated_at = ?2
                    WHERE id = ?3 AND product_id = ?4 AND business_id = ?5
                      AND stock - reserved_stock >= ?1
                    "#,
                )
                .bind(quantity)
                .bind(now)
                .bind(id)
                .bind(product_id)
                .bind(business_id)
                .execute(&self.pool)
                .await
                .map_err(DbError::from)?
            }
        };

        if result.rows_affected() == 1 {
            debug!(item = %item, quantity = %quantity, "Reserved");
            return Ok(());
        }

        // The guard didn't match. Re-read once to say why.
        Err(self.classify_guard_failure(business_id, item, quantity).await)
    }

    // =========================================================================
    // Primitive: release
    // =========================================================================

    /// Atomically returns up to `quantity` reserved units, floored at
    /// zero.
    ///
    /// Idempotent by design: cancellation paths may call release more
    /// than once, and releasing more than is reserved clamps instead of
    /// erroring or going negative.
    pub async fn release(
        &self,
        business_id: &str,
        item: &ItemRef,
        quantity: i64,
    ) -> LedgerResult<()> {
        debug!(business_id = %business_id, item = %item, quantity = %quantity, "release");

        // Over-release clamps, but a non-positive quantity is garbage
        // input, not a clamping case: the MAX() floor would turn it into
        // a reservation increase.
        validate_quantity(quantity).map_err(CoreError::from)?;

        let resolved = self.resolve(business_id, item).await?;
        if !resolved.track_inventory {
            return Ok(());
        }

        let now = Utc::now();

        if !self.config.log_releases {
            let result = match &resolved.target {
                Target::Product { id } => {
                    sqlx::query(
                        r#"
                        UPDATE products
                        SET reserved_stock = MAX(reserved_stock - ?1, 0), updated_at = ?2
                        WHERE id = ?3 AND business_id = ?4
                        "#,
                    )
                    .bind(quantity)
                    .bind(now)
                    .bind(id)
                    .bind(business_id)
                    .execute(&self.pool)
                    .await
                    .map_err(DbError::from)?
                }
                Target::Variant { id, product_id } => {
                    sqlx::query(
                        r#"
                        UPDATE product_variants
                        SET reserved_stock = MAX(reserved_stock - ?1, 0), updated_at = ?2
                        WHERE id = ?3 AND product_id = ?4 AND business_id = ?5
                        "#,
                    )
                    .bind(quantity)
                    .bind(now)
                    .bind(id)
                    .bind(product_id)
                    .bind(business_id)
                    .execute(&self.pool)
                    .await
                    .map_err(DbError::from)?
                }
            };

            if result.rows_affected() == 0 {
                return Err(CoreError::ItemNotFound {
                    item: item.to_string(),
                }
                .into());
            }

            debug!(item = %item, quantity = %quantity, "Released");
            return Ok(());
        }

        // Audited release: clamp the counter and write the activity row
        // in the same transaction. Stock itself doesn't move, so the
        // recorded delta is zero.
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let returned: Option<(i64,)> = match &resolved.target {
            Target::Product { id } => {
                sqlx::query_as(
                    r#"
                    UPDATE products
                    SET reserved_stock = MAX(reserved_stock - ?1, 0), updated_at = ?2
                    WHERE id = ?3 AND business_id = ?4
                    RETURNING stock
                    "#,
                )
                .bind(quantity)
                .bind(now)
                .bind(id)
                .bind(business_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?
            }
            Target::Variant { id, product_id } => {
                sqlx::query_as(
                    r#"
                    UPDATE product_variants
                    SET reserved_stock = MAX(reserved_stock - ?1, 0), updated_at = ?2
                    WHERE id = ?3 AND product_id = ?4 AND business_id = ?5
                    RETURNING stock
                    "#,
                )
                .bind(quantity)
                .bind(now)
                .bind(id)
                .bind(product_id)
                .bind(business_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?
            }
        };

        let (stock,) = returned.ok_or_else(|| CoreError::ItemNotFound {
            item: item.to_string(),
        })?;

        let activity = self.build_activity(
            business_id,
            item,
            ActivityType::OrderRelease,
            0,
            stock,
            stock,
            "Order cancelled",
            vendra_core::SYSTEM_ACTOR,
        );
        ActivityLogRepository::append_in_tx(&mut tx, &activity).await?;

        tx.commit().await.map_err(DbError::from)?;

        debug!(item = %item, quantity = %quantity, "Released (audited)");
        Ok(())
    }

    // =========================================================================
    // Primitive: commit
    // =========================================================================

    /// Converts a reservation into a permanent deduction: decrements
    /// `stock` and `reserved_stock` by `quantity` in one guarded update,
    /// and appends exactly one activity record in the same transaction.
    ///
    /// Untracked items are counter no-ops; they may still be logged for
    /// audit depending on [`LedgerConfig::log_untracked_commits`].
    pub async fn commit(
        &self,
        business_id: &str,
        item: &ItemRef,
        quantity: i64,
        reason: &str,
        actor: &str,
    ) -> LedgerResult<()> {
        debug!(business_id = %business_id, item = %item, quantity = %quantity, "commit");

        validate_quantity(quantity).map_err(CoreError::from)?;

        let resolved = self.resolve(business_id, item).await?;

        if !resolved.track_inventory {
            if self.config.log_untracked_commits {
                let (stock, _) = self
                    .read_counters(business_id, item)
                    .await?
                    .unwrap_or((0, 0));
                let activity = self.build_activity(
                    business_id,
                    item,
                    ActivityType::OrderSale,
                    0,
                    stock,
                    stock,
                    reason,
                    actor,
                );
                self.activity_repo().append(&activity).await?;
            }
            debug!(item = %item, "Untracked item, commit is a no-op");
            return Ok(());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        // Guarded double decrement. reserved >= q keeps the
        // reservation/deduction pairing honest; stock >= q can only fail
        // when counters are already corrupted.
        let returned: Option<(i64, i64)> = match &resolved.target {
            Target::Product { id } => {
                sqlx::query_as(
                    r#"
                    UPDATE products
                    SET stock = stock - ?1,
                        reserved_stock = reserved_stock - ?1,
                        updated_at = ?2
                    WHERE id = ?3 AND business_id = ?4
                      AND reserved_stock >= ?1 AND stock >= ?1
                    RETURNING stock, reserved_stock
                    "#,
                )
                .bind(quantity)
                .bind(now)
                .bind(id)
                .bind(business_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?
            }
            Target::Variant { id, product_id } => {
                sqlx::query_as(
                    r#"
                    UPDATE product_variants
                    SET stock = stock - ?1,
                        reserved_stock = reserved_stock - ?1,
                        updated_at = ?2
                    WHERE id = ?3 AND product_id = ?4 AND business_id = ?5
                      AND reserved_stock >= ?1 AND stock >= ?1
                    RETURNING stock, reserved_stock
                    "#,
                )
                .bind(quantity)
                .bind(now)
                .bind(id)
                .bind(product_id)
                .bind(business_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?
            }
        };

        let (new_stock, new_reserved) = match returned {
            Some(counters) => counters,
            None => {
                drop(tx);
                return Err(self.classify_commit_failure(business_id, item, quantity).await);
            }
        };

        // Defensive post-condition. The guards above make this
        // unreachable; if it ever fires, roll back and halt.
        if new_stock < 0 || new_reserved < 0 || new_reserved > new_stock {
            error!(
                item = %item,
                stock = %new_stock,
                reserved = %new_reserved,
                "CRITICAL: commit produced corrupted counters, rolling back"
            );
            return Err(CoreError::InvariantViolation {
                item: item.to_string(),
                detail: format!("post-commit counters stock={new_stock} reserved={new_reserved}"),
            }
            .into());
        }

        let activity = self.build_activity(
            business_id,
            item,
            ActivityType::OrderSale,
            -quantity,
            new_stock + quantity,
            new_stock,
            reason,
            actor,
        );
        ActivityLogRepository::append_in_tx(&mut tx, &activity).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            business_id = %business_id,
            item = %item,
            quantity = %quantity,
            new_stock = %new_stock,
            "Stock committed"
        );
        Ok(())
    }

    // =========================================================================
    // Primitive: manual_adjust
    // =========================================================================

    /// Sets `stock` directly (supplier restock, correction, or an
    /// external stock-sync push) and logs the delta. Does not touch
    /// `reserved_stock`.
    ///
    /// Runs as one transaction: read old count, guarded write, activity
    /// append. Refuses to set stock below the currently reserved
    /// quantity - that would leave open orders holding units that no
    /// longer exist.
    pub async fn manual_adjust(
        &self,
        business_id: &str,
        item: &ItemRef,
        new_quantity: i64,
        reason: &str,
        actor: &str,
    ) -> LedgerResult<()> {
        debug!(
            business_id = %business_id,
            item = %item,
            new_quantity = %new_quantity,
            "manual_adjust"
        );

        validate_stock_quantity(new_quantity).map_err(CoreError::from)?;

        let resolved = self.resolve(business_id, item).await?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let counters: Option<(i64, i64)> = match &resolved.target {
            Target::Product { id } => {
                sqlx::query_as(
                    "SELECT stock, reserved_stock FROM products \
                     WHERE id = ?1 AND business_id = ?2",
                )
                .bind(id)
                .bind(business_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?
            }
            Target::Variant { id, product_id } => {
                sqlx::query_as(
                    "SELECT stock, reserved_stock FROM product_variants \
                     WHERE id = ?1 AND product_id = ?2 AND business_id = ?3",
                )
                .bind(id)
                .bind(product_id)
                .bind(business_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?
            }
        };

        let (old_stock, reserved) = counters.ok_or_else(|| CoreError::ItemNotFound {
            item: item.to_string(),
        })?;

        if new_quantity < reserved {
            return Err(CoreError::AdjustBelowReserved {
                item: item.to_string(),
                requested: new_quantity,
                reserved,
            }
            .into());
        }

        if new_quantity == old_stock {
            debug!(item = %item, "Stock already at requested count, nothing to adjust");
            return Ok(());
        }

        // The reserved_stock guard re-checks under the write lock: a
        // reservation that slipped in since our read turns this into a
        // retryable conflict instead of a silent invariant breach.
        let result = match &resolved.target {
            Target::Product { id } => {
                sqlx::query(
                    r#"
                    UPDATE products
                    SET stock = ?1, updated_at = ?2
                    WHERE id = ?3 AND business_id = ?4 AND reserved_stock <= ?1
                    "#,
                )
                .bind(new_quantity)
                .bind(now)
                .bind(id)
                .bind(business_id)
                .execute(&mut *tx)
                .await
                .map_err(DbError::from)?
            }
            Target::Variant { id, product_id } => {
                sqlx::query(
                    r#"
                    UPDATE product_variants
                    SET stock = ?1, updated_at = ?2
                    WHERE id = ?3 AND product_id = ?4 AND business_id = ?5
                      AND reserved_stock <= ?1
                    "#,
                )
                .bind(new_quantity)
                .bind(now)
                .bind(id)
                .bind(product_id)
                .bind(business_id)
                .execute(&mut *tx)
                .await
                .map_err(DbError::from)?
            }
        };

        if result.rows_affected() == 0 {
            return Err(DbError::Busy("manual adjust raced a reservation".to_string()).into());
        }

        let delta = new_quantity - old_stock;
        let activity_type = if delta > 0 {
            ActivityType::ManualIncrease
        } else {
            ActivityType::ManualDecrease
        };

        let activity = self.build_activity(
            business_id,
            item,
            activity_type,
            delta,
            old_stock,
            new_quantity,
            reason,
            actor,
        );
        ActivityLogRepository::append_in_tx(&mut tx, &activity).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            business_id = %business_id,
            item = %item,
            old_stock = %old_stock,
            new_stock = %new_quantity,
            changed_by = %actor,
            "Stock manually adjusted"
        );
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Resolves an item reference within the business scope.
    ///
    /// A variant target requires the variant to belong to the product
    /// named on the line; `track_inventory` always comes from the parent
    /// product.
    async fn resolve(&self, business_id: &str, item: &ItemRef) -> LedgerResult<ResolvedItem> {
        let resolved = match &item.variant_id {
            None => {
                let track: Option<bool> = sqlx::query_scalar(
                    "SELECT track_inventory FROM products \
                     WHERE id = ?1 AND business_id = ?2 AND is_active = 1",
                )
                .bind(&item.product_id)
                .bind(business_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::from)?;

                track.map(|track_inventory| ResolvedItem {
                    target: Target::Product {
                        id: item.product_id.clone(),
                    },
                    track_inventory,
                })
            }
            Some(variant_id) => {
                let track: Option<bool> = sqlx::query_scalar(
                    r#"
                    SELECT p.track_inventory
                    FROM product_variants v
                    INNER JOIN products p ON p.id = v.product_id
                    WHERE v.id = ?1 AND v.product_id = ?2
                      AND v.business_id = ?3 AND p.is_active = 1
                    "#,
                )
                .bind(variant_id)
                .bind(&item.product_id)
                .bind(business_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::from)?;

                track.map(|track_inventory| ResolvedItem {
                    target: Target::Variant {
                        id: variant_id.clone(),
                        product_id: item.product_id.clone(),
                    },
                    track_inventory,
                })
            }
        };

        resolved.ok_or_else(|| {
            CoreError::ItemNotFound {
                item: item.to_string(),
            }
            .into()
        })
    }

    /// Reads the current counters for an item, outside any transaction.
    async fn read_counters(
        &self,
        business_id: &str,
        item: &ItemRef,
    ) -> Result<Option<(i64, i64)>, DbError> {
        let counters = match &item.variant_id {
            None => {
                sqlx::query_as(
                    "SELECT stock, reserved_stock FROM products \
                     WHERE id = ?1 AND business_id = ?2 AND is_active = 1",
                )
                .bind(&item.product_id)
                .bind(business_id)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(variant_id) => {
                sqlx::query_as(
                    "SELECT stock, reserved_stock FROM product_variants \
                     WHERE id = ?1 AND product_id = ?2 AND business_id = ?3",
                )
                .bind(variant_id)
                .bind(&item.product_id)
                .bind(business_id)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(counters)
    }

    /// Explains a failed try_reserve guard: the item vanished, its
    /// counters are corrupted, or there genuinely wasn't enough stock.
    async fn classify_guard_failure(
        &self,
        business_id: &str,
        item: &ItemRef,
        requested: i64,
    ) -> LedgerError {
        match self.read_counters(business_id, item).await {
            Err(e) => e.into(),
            Ok(None) => CoreError::ItemNotFound {
                item: item.to_string(),
            }
            .into(),
            Ok(Some((stock, reserved))) => {
                if reserved < 0 || reserved > stock {
                    error!(
                        item = %item,
                        stock = %stock,
                        reserved = %reserved,
                        "CRITICAL: corrupted counters detected, item halted"
                    );
                    CoreError::InvariantViolation {
                        item: item.to_string(),
                        detail: format!("counters stock={stock} reserved={reserved}"),
                    }
                    .into()
                } else if stock - reserved >= requested {
                    // Enough stock on re-read: a concurrent release must
                    // have landed between our failed guard and now. Not a
                    // shortfall - let the caller retry.
                    DbError::Busy("reserve guard raced a concurrent writer".to_string()).into()
                } else {
                    CoreError::InsufficientStock {
                        item: item.to_string(),
                        available: stock - reserved,
                        requested,
                    }
                    .into()
                }
            }
        }
    }

    /// Explains a failed commit guard.
    async fn classify_commit_failure(
        &self,
        business_id: &str,
        item: &ItemRef,
        requested: i64,
    ) -> LedgerError {
        match self.read_counters(business_id, item).await {
            Err(e) => e.into(),
            Ok(None) => CoreError::ItemNotFound {
                item: item.to_string(),
            }
            .into(),
            Ok(Some((stock, reserved))) => {
                if reserved < 0 || reserved > stock || stock < 0 {
                    error!(
                        item = %item,
                        stock = %stock,
                        reserved = %reserved,
                        "CRITICAL: corrupted counters detected, item halted"
                    );
                    CoreError::InvariantViolation {
                        item: item.to_string(),
                        detail: format!("counters stock={stock} reserved={reserved}"),
                    }
                    .into()
                } else if reserved < requested {
                    CoreError::CommitExceedsReserved {
                        item: item.to_string(),
                        requested,
                        reserved,
                    }
                    .into()
                } else {
                    // Counters look fine on re-read: the guard raced a
                    // concurrent writer. Let the caller retry.
                    DbError::Busy("commit guard raced a concurrent writer".to_string()).into()
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_activity(
        &self,
        business_id: &str,
        item: &ItemRef,
        activity_type: ActivityType,
        quantity_delta: i64,
        old_stock: i64,
        new_stock: i64,
        reason: &str,
        changed_by: &str,
    ) -> InventoryActivity {
        InventoryActivity {
            id: Uuid::new_v4().to_string(),
            business_id: business_id.to_string(),
            product_id: item.product_id.clone(),
            variant_id: item.variant_id.clone(),
            activity_type,
            quantity_delta,
            old_stock,
            new_stock,
            reason: reason.to_string(),
            changed_by: changed_by.to_string(),
            created_at: Utc::now(),
        }
    }

    fn activity_repo(&self) -> ActivityLogRepository {
        ActivityLogRepository::new(self.pool.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::activity::ActivityFilter;
    use crate::repository::catalog::generate_id;
    use vendra_core::{Product, ProductVariant, EXTERNAL_SYSTEM_ACTOR, SYSTEM_ACTOR};

    const BIZ: &str = "biz-1";

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// File-backed database so multiple pooled connections can race.
    async fn concurrent_test_db() -> Database {
        let path = std::env::temp_dir().join(format!("vendra-ledger-{}.db", Uuid::new_v4()));
        Database::new(DbConfig::new(path).max_connections(8))
            .await
            .unwrap()
    }

    async fn seed_product(db: &Database, stock: i64, track: bool) -> ItemRef {
        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            business_id: BIZ.to_string(),
            sku: format!("SKU-{}", generate_id()),
            name: "Widget".to_string(),
            track_inventory: track,
            stock,
            reserved_stock: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.catalog().insert_product(&product).await.unwrap();
        ItemRef::product(product.id)
    }

    async fn seed_variant(db: &Database, product_stock: i64, variant_stock: i64) -> ItemRef {
        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            business_id: BIZ.to_string(),
            sku: format!("SKU-{}", generate_id()),
            name: "Shirt".to_string(),
            track_inventory: true,
            stock: product_stock,
            reserved_stock: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.catalog().insert_product(&product).await.unwrap();

        let variant = ProductVariant {
            id: generate_id(),
            product_id: product.id.clone(),
            business_id: BIZ.to_string(),
            sku: format!("SKU-{}", generate_id()),
            name: "Large".to_string(),
            stock: variant_stock,
            reserved_stock: 0,
            created_at: now,
            updated_at: now,
        };
        db.catalog().insert_variant(&variant).await.unwrap();
        ItemRef::variant(product.id, variant.id)
    }

    async fn counters(db: &Database, item: &ItemRef) -> (i64, i64) {
        let level = db.catalog().stock_level(BIZ, item).await.unwrap().unwrap();
        (level.stock, level.reserved_stock)
    }

    #[tokio::test]
    async fn test_reserve_release_round_trip() {
        let db = test_db().await;
        let item = seed_product(&db, 10, true).await;
        let ledger = db.ledger();

        ledger.try_reserve(BIZ, &item, 4).await.unwrap();
        assert_eq!(counters(&db, &item).await, (10, 4));

        ledger.release(BIZ, &item, 4).await.unwrap();
        assert_eq!(counters(&db, &item).await, (10, 0));
    }

    #[tokio::test]
    async fn test_reserve_insufficient_reports_available() {
        let db = test_db().await;
        let item = seed_product(&db, 10, true).await;
        let ledger = db.ledger();

        ledger.try_reserve(BIZ, &item, 6).await.unwrap();

        let err = ledger.try_reserve(BIZ, &item, 6).await.unwrap_err();
        match err {
            LedgerError::Domain(CoreError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 4);
                assert_eq!(requested, 6);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // The failed attempt must not have moved the counters.
        assert_eq!(counters(&db, &item).await, (10, 6));
    }

    #[tokio::test]
    async fn test_release_is_idempotent_and_clamped() {
        let db = test_db().await;
        let item = seed_product(&db, 10, true).await;
        let ledger = db.ledger();

        ledger.try_reserve(BIZ, &item, 5).await.unwrap();

        ledger.release(BIZ, &item, 5).await.unwrap();
        assert_eq!(counters(&db, &item).await, (10, 0));

        // Second release of the same quantity clamps at zero.
        ledger.release(BIZ, &item, 5).await.unwrap();
        assert_eq!(counters(&db, &item).await, (10, 0));
    }

    #[tokio::test]
    async fn test_commit_decrements_both_and_logs_once() {
        let db = test_db().await;
        let item = seed_product(&db, 10, true).await;
        let ledger = db.ledger();

        ledger.try_reserve(BIZ, &item, 6).await.unwrap();
        ledger
            .commit(BIZ, &item, 6, "Order completed", SYSTEM_ACTOR)
            .await
            .unwrap();

        assert_eq!(counters(&db, &item).await, (4, 0));

        let activities = db
            .activities()
            .list(BIZ, ActivityFilter::default())
            .await
            .unwrap();
        assert_eq!(activities.len(), 1);

        let record = &activities[0];
        assert_eq!(record.activity_type, ActivityType::OrderSale);
        assert_eq!(record.old_stock, 10);
        assert_eq!(record.new_stock, 4);
        assert_eq!(record.quantity_delta, -6);
        assert_eq!(record.changed_by, SYSTEM_ACTOR);
        assert_eq!(record.reason, "Order completed");
    }

    #[tokio::test]
    async fn test_commit_exceeding_reserved_is_refused() {
        let db = test_db().await;
        let item = seed_product(&db, 10, true).await;
        let ledger = db.ledger();

        ledger.try_reserve(BIZ, &item, 2).await.unwrap();

        let err = ledger
            .commit(BIZ, &item, 5, "Order completed", SYSTEM_ACTOR)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::CommitExceedsReserved { requested: 5, reserved: 2, .. })
        ));

        // Nothing moved, nothing logged.
        assert_eq!(counters(&db, &item).await, (10, 2));
        let activities = db
            .activities()
            .list(BIZ, ActivityFilter::default())
            .await
            .unwrap();
        assert!(activities.is_empty());
    }

    #[tokio::test]
    async fn test_untracked_item_bypasses_counters() {
        let db = test_db().await;
        let item = seed_product(&db, 0, false).await;
        let ledger = db.ledger();

        // Zero stock, any quantity: always succeeds, counters untouched.
        ledger.try_reserve(BIZ, &item, 1_000).await.unwrap();
        ledger
            .commit(BIZ, &item, 1_000, "Order completed", SYSTEM_ACTOR)
            .await
            .unwrap();
        ledger.release(BIZ, &item, 1_000).await.unwrap();

        assert_eq!(counters(&db, &item).await, (0, 0));
    }

    #[tokio::test]
    async fn test_variant_counters_used_not_parent() {
        let db = test_db().await;
        let item = seed_variant(&db, 999, 3).await;
        let ledger = db.ledger();

        // Parent claims 999 units, the variant only 3: the variant's
        // counters decide.
        let err = ledger.try_reserve(BIZ, &item, 4).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::InsufficientStock { available: 3, .. })
        ));

        ledger.try_reserve(BIZ, &item, 3).await.unwrap();
        assert_eq!(counters(&db, &item).await, (3, 3));
    }

    #[tokio::test]
    async fn test_variant_of_wrong_product_is_not_found() {
        let db = test_db().await;
        let real = seed_variant(&db, 0, 5).await;
        let other = seed_product(&db, 5, true).await;
        let ledger = db.ledger();

        let mismatched = ItemRef::variant(other.product_id, real.variant_id.unwrap());
        let err = ledger.try_reserve(BIZ, &mismatched, 1).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::ItemNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_item_not_found_for_other_business() {
        let db = test_db().await;
        let item = seed_product(&db, 10, true).await;
        let ledger = db.ledger();

        let err = ledger.try_reserve("biz-2", &item, 1).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::ItemNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_manual_adjust_logs_signed_delta() {
        let db = test_db().await;
        let item = seed_product(&db, 10, true).await;
        let ledger = db.ledger();

        ledger
            .manual_adjust(BIZ, &item, 25, "Supplier restock", EXTERNAL_SYSTEM_ACTOR)
            .await
            .unwrap();
        ledger
            .manual_adjust(BIZ, &item, 20, "Shrinkage correction", "user-7")
            .await
            .unwrap();

        assert_eq!(counters(&db, &item).await, (20, 0));

        let activities = db
            .activities()
            .list(BIZ, ActivityFilter::default())
            .await
            .unwrap();
        assert_eq!(activities.len(), 2);

        let increase = activities
            .iter()
            .find(|a| a.activity_type == ActivityType::ManualIncrease)
            .unwrap();
        assert_eq!(increase.quantity_delta, 15);
        assert_eq!(increase.old_stock, 10);
        assert_eq!(increase.new_stock, 25);
        assert_eq!(increase.changed_by, EXTERNAL_SYSTEM_ACTOR);

        let decrease = activities
            .iter()
            .find(|a| a.activity_type == ActivityType::ManualDecrease)
            .unwrap();
        assert_eq!(decrease.quantity_delta, -5);
        assert_eq!(decrease.changed_by, "user-7");
    }

    #[tokio::test]
    async fn test_manual_adjust_below_reserved_is_refused() {
        let db = test_db().await;
        let item = seed_product(&db, 10, true).await;
        let ledger = db.ledger();

        ledger.try_reserve(BIZ, &item, 6).await.unwrap();

        let err = ledger
            .manual_adjust(BIZ, &item, 4, "Bad count", "user-7")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::AdjustBelowReserved { requested: 4, reserved: 6, .. })
        ));

        assert_eq!(counters(&db, &item).await, (10, 6));
    }

    #[tokio::test]
    async fn test_manual_adjust_rejects_negative() {
        let db = test_db().await;
        let item = seed_product(&db, 10, true).await;
        let ledger = db.ledger();

        let err = ledger
            .manual_adjust(BIZ, &item, -1, "Bad count", "user-7")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_non_positive_quantities_are_rejected() {
        let db = test_db().await;
        let item = seed_product(&db, 10, true).await;
        let ledger = db.ledger();

        let err = ledger.try_reserve(BIZ, &item, 0).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::Validation(_))
        ));

        // A negative release would otherwise INCREASE reservations
        // through the clamp.
        let err = ledger.release(BIZ, &item, -5).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::Validation(_))
        ));

        assert_eq!(counters(&db, &item).await, (10, 0));
    }

    #[tokio::test]
    async fn test_corrupted_counters_halt_the_item() {
        let db = test_db().await;
        let item = seed_product(&db, 10, true).await;
        let ledger = db.ledger();

        // Corrupt the row behind the ledger's back: reserved > stock.
        sqlx::query("UPDATE products SET reserved_stock = 99 WHERE id = ?1")
            .bind(&item.product_id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = ledger.try_reserve(BIZ, &item, 1).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::InvariantViolation { .. })
        ));

        let err = ledger
            .commit(BIZ, &item, 1, "Order completed", SYSTEM_ACTOR)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::InvariantViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_reserves_never_oversell() {
        let db = concurrent_test_db().await;
        let item = seed_product(&db, 10, true).await;

        // 8 workers racing for 10 units, 2 each: at most 5 can win.
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = db.ledger();
            let item = item.clone();
            handles.push(tokio::spawn(async move {
                ledger.try_reserve(BIZ, &item, 2).await.is_ok()
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 5);
        assert_eq!(counters(&db, &item).await, (10, 10));
    }
}
