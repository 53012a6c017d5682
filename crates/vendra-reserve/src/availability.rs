//! # Availability Checker
//!
//! Read-only pre-flight evaluation of whether a batch can be satisfied.
//!
//! This is a snapshot read for UI/UX checks and fast-fails. It is
//! advisory ONLY: between this read and the actual reservation, any
//! number of concurrent orders may land. The authoritative decision is
//! always the stock ledger's atomic conditional update inside
//! `try_reserve`.

use tracing::debug;

use crate::error::ReserveError;
use vendra_core::{CoreError, OrderLine, Shortfall};
use vendra_db::Database;

/// Advisory availability checks over current counter snapshots.
#[derive(Debug, Clone)]
pub struct AvailabilityChecker {
    db: Database,
}

impl AvailabilityChecker {
    /// Creates a new AvailabilityChecker.
    pub fn new(db: Database) -> Self {
        AvailabilityChecker { db }
    }

    /// Reports every line whose requested quantity exceeds the currently
    /// available stock. An empty vec means the whole batch looks
    /// satisfiable at read time.
    ///
    /// Untracked items are never short. A missing item aborts the check
    /// with `ItemNotFound` - the caller is about to fail the order
    /// anyway.
    pub async fn check(
        &self,
        business_id: &str,
        lines: &[OrderLine],
    ) -> Result<Vec<Shortfall>, ReserveError> {
        let catalog = self.db.catalog();
        let mut shortfalls = Vec::new();

        for line in lines {
            let item = line.item();

            let level = catalog
                .stock_level(business_id, &item)
                .await?
                .ok_or_else(|| CoreError::ItemNotFound {
                    item: item.to_string(),
                })?;

            if !level.track_inventory {
                continue;
            }

            let available = level.available_stock();
            if line.quantity > available {
                shortfalls.push(Shortfall {
                    product_id: line.product_id.clone(),
                    variant_id: line.variant_id.clone(),
                    requested: line.quantity,
                    available: available.max(0),
                });
            }
        }

        debug!(
            business_id = %business_id,
            lines = lines.len(),
            shortfalls = shortfalls.len(),
            "Availability checked"
        );

        Ok(shortfalls)
    }
}
