//! # Reservation Coordinator
//!
//! Turns a list of order line items into an all-or-nothing reservation,
//! release, or commit.
//!
//! ## Batch Reservation As A Lightweight Saga
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  reserve_order([A×5, B×5, C×2])                                         │
//! │                                                                         │
//! │   try_reserve(A, 5) ──► ok                                              │
//! │   try_reserve(B, 5) ──► ok                                              │
//! │   try_reserve(C, 2) ──► InsufficientStock { available: 1 }              │
//! │        │                                                                │
//! │        ▼  compensate before reporting                                   │
//! │   release(B, 5)                                                         │
//! │   release(A, 5)                                                         │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   Err(InsufficientStock { shortfalls: [C: 2 of 1, ...] })               │
//! │                                                                         │
//! │  Partial reservations are NEVER left standing.                          │
//! │                                                                         │
//! │  commit_order needs no compensation: each per-item commit is atomic,    │
//! │  a crash mid-batch leaves the rest correctly reserved, and re-running   │
//! │  the batch only re-attempts what is still reserved.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{debug, error, info, warn};

use crate::availability::AvailabilityChecker;
use crate::config::ReserveConfig;
use crate::error::ReserveError;
use crate::retry::with_retry;
use vendra_core::validation::validate_order_lines;
use vendra_core::{CoreError, OrderLine, Shortfall, SYSTEM_ACTOR};
use vendra_db::{Database, StockLedger};

/// Reason recorded on activity rows written by order fulfillment.
const COMMIT_REASON: &str = "Order completed";

// =============================================================================
// Reservation Coordinator
// =============================================================================

/// Orchestrates multi-item reserve/release/commit batches against the
/// stock ledger.
///
/// Constructed with an explicit [`Database`] handle: no global storage
/// state, so tests wire their own database and nothing shares hidden
/// connections.
#[derive(Debug, Clone)]
pub struct ReservationCoordinator {
    db: Database,
    config: ReserveConfig,
}

impl ReservationCoordinator {
    /// Creates a coordinator with default configuration.
    pub fn new(db: Database) -> Self {
        Self::with_config(db, ReserveConfig::default())
    }

    /// Creates a coordinator with an explicit configuration.
    pub fn with_config(db: Database, config: ReserveConfig) -> Self {
        ReservationCoordinator { db, config }
    }

    /// Returns the advisory availability checker backed by the same
    /// database handle.
    pub fn availability(&self) -> AvailabilityChecker {
        AvailabilityChecker::new(self.db.clone())
    }

    // =========================================================================
    // reserve_order
    // =========================================================================

    /// Reserves every line of the batch, all-or-nothing.
    ///
    /// Lines are attempted in sequence. On the first failure, every
    /// previously-reserved line is released again before the error is
    /// returned - a partial reservation is never left standing.
    ///
    /// A shortfall failure carries per-item `requested`/`available`
    /// detail for the failed line plus an advisory sweep of the lines
    /// that were never attempted, so the caller can fix the whole order
    /// in one round trip.
    pub async fn reserve_order(
        &self,
        business_id: &str,
        lines: &[OrderLine],
    ) -> Result<(), ReserveError> {
        validate_order_lines(lines).map_err(CoreError::from)?;

        debug!(business_id = %business_id, lines = lines.len(), "Reserving order batch");

        let ledger = self.db.ledger();
        let mut reserved: Vec<&OrderLine> = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            let item = line.item();

            let attempt = with_retry(&self.config.retry, "try_reserve", || {
                ledger.try_reserve(business_id, &item, line.quantity)
            })
            .await;

            match attempt {
                Ok(()) => reserved.push(line),
                Err(err) => {
                    self.rollback(business_id, &ledger, &reserved).await;

                    return Err(match err {
                        ReserveError::Domain(CoreError::InsufficientStock {
                            requested,
                            available,
                            ..
                        }) => {
                            let shortfalls = self
                                .collect_shortfalls(
                                    business_id,
                                    line,
                                    requested,
                                    available,
                                    &lines[index + 1..],
                                )
                                .await;
                            warn!(
                                business_id = %business_id,
                                item = %item,
                                requested = %requested,
                                available = %available,
                                "Reservation failed on shortfall, batch rolled back"
                            );
                            ReserveError::InsufficientStock { shortfalls }
                        }
                        other => {
                            warn!(
                                business_id = %business_id,
                                item = %item,
                                error = %other,
                                "Reservation failed, batch rolled back"
                            );
                            other
                        }
                    });
                }
            }
        }

        info!(business_id = %business_id, lines = lines.len(), "Order batch reserved");
        Ok(())
    }

    // =========================================================================
    // release_order
    // =========================================================================

    /// Releases every line of the batch.
    ///
    /// Used on order cancellation, expiry, and payment failure - paths
    /// that may run more than once, so the whole operation is idempotent:
    /// over-release clamps at zero and items that no longer exist are
    /// skipped with a warning. Only infrastructure failures surface.
    pub async fn release_order(
        &self,
        business_id: &str,
        lines: &[OrderLine],
    ) -> Result<(), ReserveError> {
        debug!(business_id = %business_id, lines = lines.len(), "Releasing order batch");

        let ledger = self.db.ledger();

        for line in lines {
            let item = line.item();

            let attempt = with_retry(&self.config.retry, "release", || {
                ledger.release(business_id, &item, line.quantity)
            })
            .await;

            match attempt {
                Ok(()) => {}
                Err(ReserveError::Domain(CoreError::ItemNotFound { .. })) => {
                    warn!(item = %item, "Releasing a missing item, skipped");
                }
                Err(other) => return Err(other),
            }
        }

        info!(business_id = %business_id, lines = lines.len(), "Order batch released");
        Ok(())
    }

    // =========================================================================
    // commit_order
    // =========================================================================

    /// Commits every line of the batch: converts the reservations into
    /// permanent stock deductions, one audit row per line.
    ///
    /// No compensation is needed here. Each per-item commit is atomic; if
    /// the process dies mid-batch, the remaining lines are still
    /// correctly reserved and the batch can simply be re-run. A line
    /// whose reservation is already gone (committed before the crash) is
    /// skipped, so the deduction and its audit row happen exactly once.
    pub async fn commit_order(
        &self,
        business_id: &str,
        lines: &[OrderLine],
    ) -> Result<(), ReserveError> {
        validate_order_lines(lines).map_err(CoreError::from)?;

        debug!(business_id = %business_id, lines = lines.len(), "Committing order batch");

        let ledger = self.db.ledger();

        for line in lines {
            let item = line.item();

            let attempt = with_retry(&self.config.retry, "commit", || {
                ledger.commit(business_id, &item, line.quantity, COMMIT_REASON, SYSTEM_ACTOR)
            })
            .await;

            match attempt {
                Ok(()) => {}
                Err(ReserveError::Domain(CoreError::CommitExceedsReserved {
                    reserved, ..
                })) => {
                    // Reservation already converted on a previous run of
                    // this batch; deducting again would double-sell.
                    warn!(
                        item = %item,
                        quantity = %line.quantity,
                        reserved = %reserved,
                        "Commit found no matching reservation, treating line as already committed"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        info!(business_id = %business_id, lines = lines.len(), "Order batch committed");
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Compensates a partially-reserved batch. Failures here are logged,
    /// never propagated: they must not mask the original error, and
    /// release is idempotent so cleanup can be re-driven later.
    async fn rollback(&self, business_id: &str, ledger: &StockLedger, reserved: &[&OrderLine]) {
        for line in reserved {
            let item = line.item();

            let attempt = with_retry(&self.config.retry, "rollback_release", || {
                ledger.release(business_id, &item, line.quantity)
            })
            .await;

            if let Err(err) = attempt {
                error!(
                    business_id = %business_id,
                    item = %item,
                    quantity = %line.quantity,
                    error = %err,
                    "Failed to roll back reservation; counters need manual release"
                );
            }
        }
    }

    /// Builds the full shortfall report for a failed batch: the line
    /// that atomically failed, plus an advisory sweep of the lines that
    /// were never attempted. The sweep is best-effort - it must not mask
    /// the real failure.
    async fn collect_shortfalls(
        &self,
        business_id: &str,
        failed_line: &OrderLine,
        requested: i64,
        available: i64,
        remaining: &[OrderLine],
    ) -> Vec<Shortfall> {
        let mut shortfalls = vec![Shortfall {
            product_id: failed_line.product_id.clone(),
            variant_id: failed_line.variant_id.clone(),
            requested,
            available,
        }];

        if !remaining.is_empty() {
            match self.availability().check(business_id, remaining).await {
                Ok(more) => shortfalls.extend(more),
                Err(err) => {
                    debug!(error = %err, "Advisory shortfall sweep failed, reporting first line only");
                }
            }
        }

        shortfalls
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
