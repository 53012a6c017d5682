//! # Catalog Repository
//!
//! Persistence for products and variants, plus the read-only stock level
//! snapshots exposed to reporting collaborators.
//!
//! This repository inserts rows with their opening counts and reads them
//! back; it never mutates `stock`/`reserved_stock` after insert. Counter
//! mutation is the stock ledger's exclusive job.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vendra_core::{ItemRef, Product, ProductVariant, StockLevel};

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Arguments
    /// * `product` - Product to insert (id should be generated beforehand)
    pub async fn insert_product(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, business_id, sku, name,
                track_inventory, stock, reserved_stock,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.business_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.track_inventory)
        .bind(product.stock)
        .bind(product.reserved_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a new variant under an existing product.
    pub async fn insert_variant(&self, variant: &ProductVariant) -> DbResult<()> {
        debug!(id = %variant.id, product_id = %variant.product_id, "Inserting variant");

        sqlx::query(
            r#"
            INSERT INTO product_variants (
                id, product_id, business_id, sku, name,
                stock, reserved_stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.business_id)
        .bind(&variant.sku)
        .bind(&variant.name)
        .bind(variant.stock)
        .bind(variant.reserved_stock)
        .bind(variant.created_at)
        .bind(variant.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by its ID, scoped to the business.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product doesn't exist or belongs to another business
    pub async fn get_product(&self, business_id: &str, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, business_id, sku, name,
                   track_inventory, stock, reserved_stock,
                   is_active, created_at, updated_at
            FROM products
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a variant by its ID, scoped to the business.
    pub async fn get_variant(
        &self,
        business_id: &str,
        id: &str,
    ) -> DbResult<Option<ProductVariant>> {
        let variant = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT id, product_id, business_id, sku, name,
                   stock, reserved_stock, created_at, updated_at
            FROM product_variants
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(variant)
    }

    /// Reads the current counter snapshot for one item.
    ///
    /// For a variant reference the snapshot carries the **variant's**
    /// counters with the parent product's `track_inventory` flag - a
    /// variant-bearing product delegates its stock accounting to the
    /// variants.
    ///
    /// ## Returns
    /// * `Ok(Some(StockLevel))` - Item found
    /// * `Ok(None)` - Item missing, inactive, or foreign to the business
    pub async fn stock_level(
        &self,
        business_id: &str,
        item: &ItemRef,
    ) -> DbResult<Option<StockLevel>> {
        let level = match &item.variant_id {
            None => {
                sqlx::query_as::<_, StockLevel>(
                    r#"
                    SELECT id AS product_id,
                           NULL AS variant_id,
                           track_inventory,
                           stock,
                           reserved_stock
                    FROM products
                    WHERE id = ?1 AND business_id = ?2 AND is_active = 1
                    "#,
                )
                .bind(&item.product_id)
                .bind(business_id)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(variant_id) => {
                sqlx::query_as::<_, StockLevel>(
                    r#"
                    SELECT v.product_id AS product_id,
                           v.id AS variant_id,
                           p.track_inventory AS track_inventory,
                           v.stock AS stock,
                           v.reserved_stock AS reserved_stock
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
                .await?
            }
        };

        Ok(level)
    }

    /// Lists counter snapshots for every active item of a business:
    /// products without variants on their own counters, then one row per
    /// variant. Used by low-stock dashboards.
    pub async fn list_stock_levels(&self, business_id: &str) -> DbResult<Vec<StockLevel>> {
        let mut levels = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT p.id AS product_id,
                   NULL AS variant_id,
                   p.track_inventory,
                   p.stock,
                   p.reserved_stock
            FROM products p
            WHERE p.business_id = ?1 AND p.is_active = 1
              AND NOT EXISTS (
                  SELECT 1 FROM product_variants v WHERE v.product_id = p.id
              )
            ORDER BY p.sku
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        let variant_levels = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT v.product_id AS product_id,
                   v.id AS variant_id,
                   p.track_inventory AS track_inventory,
                   v.stock AS stock,
                   v.reserved_stock AS reserved_stock
            FROM product_variants v
            INNER JOIN products p ON p.id = v.product_id
            WHERE v.business_id = ?1 AND p.is_active = 1
            ORDER BY v.sku
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        levels.extend(variant_levels);
        Ok(levels)
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical activity records still reference the product, so rows
    /// are never physically removed.
    pub async fn soft_delete_product(&self, business_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = 0, updated_at = ?3
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products for a business (for diagnostics).
    pub async fn count_products(&self, business_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE business_id = ?1 AND is_active = 1",
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Helper to generate a new catalog entity ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use vendra_core::ItemRef;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample_product(business_id: &str, sku: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_id(),
            business_id: business_id.to_string(),
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            track_inventory: true,
            stock,
            reserved_stock: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_variant(product: &Product, sku: &str, stock: i64) -> ProductVariant {
        let now = Utc::now();
        ProductVariant {
            id: generate_id(),
            product_id: product.id.clone(),
            business_id: product.business_id.clone(),
            sku: sku.to_string(),
            name: format!("Variant {sku}"),
            stock,
            reserved_stock: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_product() {
        let db = test_db().await;
        let repo = db.catalog();

        let product = sample_product("biz-1", "WIDGET-1", 10);
        repo.insert_product(&product).await.unwrap();

        let found = repo.get_product("biz-1", &product.id).await.unwrap().unwrap();
        assert_eq!(found.sku, "WIDGET-1");
        assert_eq!(found.stock, 10);
        assert_eq!(found.reserved_stock, 0);
        assert!(found.track_inventory);
    }

    #[tokio::test]
    async fn test_get_product_wrong_business() {
        let db = test_db().await;
        let repo = db.catalog();

        let product = sample_product("biz-1", "WIDGET-1", 10);
        repo.insert_product(&product).await.unwrap();

        let found = repo.get_product("biz-2", &product.id).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_stock_level_for_variant_uses_variant_counters() {
        let db = test_db().await;
        let repo = db.catalog();

        // Parent has its own (unused) counters; the variant's must win.
        let mut product = sample_product("biz-1", "SHIRT", 999);
        product.stock = 999;
        repo.insert_product(&product).await.unwrap();

        let variant = sample_variant(&product, "SHIRT-L", 4);
        repo.insert_variant(&variant).await.unwrap();

        let level = repo
            .stock_level("biz-1", &ItemRef::variant(&product.id, &variant.id))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(level.stock, 4);
        assert_eq!(level.variant_id.as_deref(), Some(variant.id.as_str()));
        assert!(level.track_inventory);
    }

    #[tokio::test]
    async fn test_stock_level_missing_after_soft_delete() {
        let db = test_db().await;
        let repo = db.catalog();

        let product = sample_product("biz-1", "WIDGET-1", 10);
        repo.insert_product(&product).await.unwrap();
        repo.soft_delete_product("biz-1", &product.id).await.unwrap();

        let level = repo
            .stock_level("biz-1", &ItemRef::product(&product.id))
            .await
            .unwrap();
        assert!(level.is_none());
    }

    #[tokio::test]
    async fn test_list_stock_levels_skips_parent_of_variants() {
        let db = test_db().await;
        let repo = db.catalog();

        let plain = sample_product("biz-1", "A-PLAIN", 3);
        repo.insert_product(&plain).await.unwrap();

        let parent = sample_product("biz-1", "B-PARENT", 0);
        repo.insert_product(&parent).await.unwrap();
        repo.insert_variant(&sample_variant(&parent, "B-PARENT-S", 1))
            .await
            .unwrap();
        repo.insert_variant(&sample_variant(&parent, "B-PARENT-M", 2))
            .await
            .unwrap();

        let levels = repo.list_stock_levels("biz-1").await.unwrap();

        // One row for the plain product, one per variant; the parent's own
        // counters are not listed.
        assert_eq!(levels.len(), 3);
        assert_eq!(
            levels.iter().filter(|l| l.variant_id.is_none()).count(),
            1
        );
    }
}
