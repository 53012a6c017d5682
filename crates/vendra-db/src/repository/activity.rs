//! # Inventory Activity Log Repository
//!
//! Append-only audit trail of stock mutations.
//!
//! ## Write Path: Same Transaction As The Counters
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. UPDATE products SET stock = stock - ?, reserved_stock = ... │   │
//! │  │                                                                 │   │
//! │  │  2. INSERT INTO inventory_activities (type, delta, old, new...) │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Both succeed or both fail                                     │
//! │                                                                         │
//! │  A crash can never produce a counter change without its audit row,      │
//! │  or an audit row without its counter change.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are never updated or deleted. Read access exists for the
//! reporting collaborator (dashboards, low-stock alerting); everything
//! inside the subsystem is write-only.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DbResult;
use vendra_core::InventoryActivity;

const INSERT_SQL: &str = r#"
INSERT INTO inventory_activities (
    id, business_id, product_id, variant_id,
    activity_type, quantity_delta, old_stock, new_stock,
    reason, changed_by, created_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#;

// =============================================================================
// Query Filter
// =============================================================================

/// Filter for reporting reads over the activity log.
#[derive(Debug, Clone)]
pub struct ActivityFilter {
    /// Restrict to one product (and its variants).
    pub product_id: Option<String>,

    /// Only records at or after this instant.
    pub from: Option<DateTime<Utc>>,

    /// Only records before this instant.
    pub to: Option<DateTime<Utc>>,

    /// Maximum rows returned, newest first.
    pub limit: u32,
}

impl Default for ActivityFilter {
    fn default() -> Self {
        ActivityFilter {
            product_id: None,
            from: None,
            to: None,
            limit: 100,
        }
    }
}

impl ActivityFilter {
    /// Restricts the filter to one product.
    pub fn product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    /// Restricts the filter to records at or after `from`.
    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Restricts the filter to records before `to`.
    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// Caps the number of returned rows.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the inventory activity log.
#[derive(Debug, Clone)]
pub struct ActivityLogRepository {
    pool: SqlitePool,
}

impl ActivityLogRepository {
    /// Creates a new ActivityLogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ActivityLogRepository { pool }
    }

    /// Appends one audit record outside a ledger transaction.
    ///
    /// Used only for audit rows that describe no counter change (e.g.
    /// untracked-item commits); counter-changing records go through
    /// [`append_in_tx`] inside the ledger's transaction.
    ///
    /// [`append_in_tx`]: ActivityLogRepository::append_in_tx
    pub async fn append(&self, activity: &InventoryActivity) -> DbResult<()> {
        bind_activity(sqlx::query(INSERT_SQL), activity)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Appends one audit record inside the ledger's transaction, so the
    /// counter mutation and the audit row commit or roll back together.
    pub(crate) async fn append_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        activity: &InventoryActivity,
    ) -> DbResult<()> {
        bind_activity(sqlx::query(INSERT_SQL), activity)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Lists audit records for a business, newest first.
    ///
    /// ## Arguments
    /// * `business_id` - Tenant scope (always required)
    /// * `filter` - Optional product and date-range restrictions
    pub async fn list(
        &self,
        business_id: &str,
        filter: ActivityFilter,
    ) -> DbResult<Vec<InventoryActivity>> {
        let mut qb = sqlx::QueryBuilder::<Sqlite>::new(
            "SELECT id, business_id, product_id, variant_id, \
             activity_type, quantity_delta, old_stock, new_stock, \
             reason, changed_by, created_at \
             FROM inventory_activities WHERE business_id = ",
        );
        qb.push_bind(business_id);

        if let Some(product_id) = &filter.product_id {
            qb.push(" AND product_id = ");
            qb.push_bind(product_id.clone());
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ");
            qb.push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at < ");
            qb.push_bind(to);
        }

        qb.push(" ORDER BY created_at DESC LIMIT ");
        qb.push_bind(filter.limit as i64);

        let records = qb
            .build_query_as::<InventoryActivity>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Counts audit records for a business (for diagnostics).
    pub async fn count(&self, business_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventory_activities WHERE business_id = ?1")
                .bind(business_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

fn bind_activity<'q>(
    query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    activity: &'q InventoryActivity,
) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(&activity.id)
        .bind(&activity.business_id)
        .bind(&activity.product_id)
        .bind(&activity.variant_id)
        .bind(activity.activity_type)
        .bind(activity.quantity_delta)
        .bind(activity.old_stock)
        .bind(activity.new_stock)
        .bind(&activity.reason)
        .bind(&activity.changed_by)
        .bind(activity.created_at)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use uuid::Uuid;
    use vendra_core::{ActivityType, SYSTEM_ACTOR};

    const BIZ: &str = "biz-1";

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn record(product_id: &str, created_at: DateTime<Utc>) -> InventoryActivity {
        InventoryActivity {
            id: Uuid::new_v4().to_string(),
            business_id: BIZ.to_string(),
            product_id: product_id.to_string(),
            variant_id: None,
            activity_type: ActivityType::OrderSale,
            quantity_delta: -2,
            old_stock: 10,
            new_stock: 8,
            reason: "Order completed".to_string(),
            changed_by: SYSTEM_ACTOR.to_string(),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_append_and_list() {
        let db = test_db().await;
        let repo = db.activities();

        let now = Utc::now();
        repo.append(&record("p1", now)).await.unwrap();
        repo.append(&record("p2", now + Duration::seconds(1)))
            .await
            .unwrap();

        let all = repo.list(BIZ, ActivityFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        // Newest first.
        assert_eq!(all[0].product_id, "p2");

        let decoded = &all[1];
        assert_eq!(decoded.activity_type, ActivityType::OrderSale);
        assert_eq!(decoded.quantity_delta, -2);
        assert_eq!(decoded.new_stock - decoded.old_stock, decoded.quantity_delta);
    }

    #[tokio::test]
    async fn test_list_filtered_by_product() {
        let db = test_db().await;
        let repo = db.activities();

        let now = Utc::now();
        repo.append(&record("p1", now)).await.unwrap();
        repo.append(&record("p2", now)).await.unwrap();
        repo.append(&record("p1", now)).await.unwrap();

        let p1_only = repo
            .list(BIZ, ActivityFilter::default().product("p1"))
            .await
            .unwrap();
        assert_eq!(p1_only.len(), 2);
        assert!(p1_only.iter().all(|a| a.product_id == "p1"));
    }

    #[tokio::test]
    async fn test_list_filtered_by_date_range() {
        let db = test_db().await;
        let repo = db.activities();

        let base = Utc::now();
        repo.append(&record("p1", base - Duration::days(2)))
            .await
            .unwrap();
        repo.append(&record("p1", base - Duration::days(1)))
            .await
            .unwrap();
        repo.append(&record("p1", base)).await.unwrap();

        let windowed = repo
            .list(
                BIZ,
                ActivityFilter::default()
                    .from(base - Duration::days(1) - Duration::hours(1))
                    .to(base - Duration::hours(1)),
            )
            .await
            .unwrap();
        assert_eq!(windowed.len(), 1);
    }

    #[tokio::test]
    async fn test_list_scoped_to_business() {
        let db = test_db().await;
        let repo = db.activities();

        repo.append(&record("p1", Utc::now())).await.unwrap();

        let other = repo.list("biz-2", ActivityFilter::default()).await.unwrap();
        assert!(other.is_empty());
        assert_eq!(repo.count(BIZ).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_respects_limit() {
        let db = test_db().await;
        let repo = db.activities();

        let now = Utc::now();
        for i in 0..5 {
            repo.append(&record("p1", now + Duration::seconds(i)))
                .await
                .unwrap();
        }

        let capped = repo
            .list(BIZ, ActivityFilter::default().limit(3))
            .await
            .unwrap();
        assert_eq!(capped.len(), 3);
    }
}
