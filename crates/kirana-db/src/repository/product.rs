//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Store-scoped lookups (by id, by SKU)
//! - CRUD for the catalogue collaborator
//! - Stock movements: conditional decrement on sale, delta adjustments
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read stock in Rust, check, write the new value              │
//! │     two counters both read 1, both write 0, two units sold             │
//! │                                                                         │
//! │  ✅ CORRECT: one statement that checks and subtracts                   │
//! │     UPDATE products SET stock_quantity = stock_quantity - ?2           │
//! │     WHERE id = ?1                                                      │
//! │       AND (allow_negative_stock = 1 OR stock_quantity >= ?2)           │
//! │                                                                         │
//! │  rows_affected = 0 → not enough stock, the checkout rolls back         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use kirana_core::Product;

const PRODUCT_COLUMNS: &str = r#"
    id, store_id, sku, name, hsn_code, unit,
    mrp_paise, purchase_price_paise, selling_price_paise, gst_rate_bps,
    stock_quantity, min_stock_level,
    is_track_inventory, allow_negative_stock, is_active,
    created_at, updated_at
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.get_by_sku(store_id, "ATTA-5KG").await?;
/// let stock = repo.adjust_stock(store_id, &product.id, 24).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID, active or not.
    pub async fn get_by_id(&self, store_id: &str, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND store_id = ?2");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU within a store.
    pub async fn get_by_sku(&self, store_id: &str, sku: &str) -> DbResult<Option<Product>> {
        let sql =
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1 AND store_id = ?2");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku)
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, store_id: &str, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE store_id = ?1 AND is_active = 1
             ORDER BY name
             LIMIT ?2"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(store_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - SKU already exists in the store
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(sku = %product.sku, store_id = %product.store_id, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, store_id, sku, name, hsn_code, unit,
                mrp_paise, purchase_price_paise, selling_price_paise, gst_rate_bps,
                stock_quantity, min_stock_level,
                is_track_inventory, allow_negative_stock, is_active,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12,
                ?13, ?14, ?15,
                ?16, ?17
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.store_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.hsn_code)
        .bind(&product.unit)
        .bind(product.mrp_paise)
        .bind(product.purchase_price_paise)
        .bind(product.selling_price_paise)
        .bind(product.gst_rate_bps)
        .bind(product.stock_quantity)
        .bind(product.min_stock_level)
        .bind(product.is_track_inventory)
        .bind(product.allow_negative_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&product.sku))?;

        Ok(product.clone())
    }

    /// Updates the catalogue fields of an existing product.
    ///
    /// Stock is not written here; use [`adjust_stock`](Self::adjust_stock).
    /// Historical bill items keep their own snapshot and are unaffected.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?3,
                name = ?4,
                hsn_code = ?5,
                unit = ?6,
                mrp_paise = ?7,
                purchase_price_paise = ?8,
                selling_price_paise = ?9,
                gst_rate_bps = ?10,
                min_stock_level = ?11,
                is_track_inventory = ?12,
                allow_negative_stock = ?13,
                is_active = ?14,
                updated_at = ?15
            WHERE id = ?1 AND store_id = ?2
            "#,
        )
        .bind(&product.id)
        .bind(&product.store_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.hsn_code)
        .bind(&product.unit)
        .bind(product.mrp_paise)
        .bind(product.purchase_price_paise)
        .bind(product.selling_price_paise)
        .bind(product.gst_rate_bps)
        .bind(product.min_stock_level)
        .bind(product.is_track_inventory)
        .bind(product.allow_negative_stock)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Applies a stock delta (purchase receipts, manual corrections) and
    /// returns the new level.
    ///
    /// ## Arguments
    /// * `delta` - Change in stock (positive for receipts, negative for write-offs)
    pub async fn adjust_stock(&self, store_id: &str, id: &str, delta: i64) -> DbResult<i64> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let stock: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?3, updated_at = ?4
            WHERE id = ?1 AND store_id = ?2
            RETURNING stock_quantity
            "#,
        )
        .bind(id)
        .bind(store_id)
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        stock.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts active products in a store (for diagnostics and seeding).
    pub async fn count(&self, store_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE store_id = ?1 AND is_active = 1")
                .bind(store_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Executor-generic helpers (used inside the checkout transaction)
// =============================================================================

/// Fetches an active product of the store. Inactive products are not
/// sellable and come back as `None`.
pub async fn fetch_sellable<'e, E>(exec: E, store_id: &str, id: &str) -> DbResult<Option<Product>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND store_id = ?2 AND is_active = 1"
    );

    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(store_id)
        .fetch_optional(exec)
        .await?;

    Ok(product)
}

/// Decrements stock if the product can cover `quantity`.
///
/// Returns `false` when the guard in the WHERE clause rejected the update,
/// i.e. stock is short and negative stock is not allowed.
pub async fn decrement_stock<'e, E>(
    exec: E,
    id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %id, quantity = %quantity, "Decrementing stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity - ?2, updated_at = ?3
        WHERE id = ?1
          AND (allow_negative_stock = 1 OR stock_quantity >= ?2)
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(now)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Adds `quantity` back to a product's stock (cancellation with restock).
pub async fn restock<'e, E>(exec: E, id: &str, quantity: i64, now: DateTime<Utc>) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %id, quantity = %quantity, "Restocking");

    sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + ?2, updated_at = ?3
        WHERE id = ?1 AND is_track_inventory = 1
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(now)
    .execute(exec)
    .await?;

    Ok(())
}

/// Builds a tracked, active product for tests.
#[cfg(test)]
pub(crate) fn test_product(
    store_id: &str,
    sku: &str,
    price_paise: i64,
    gst_bps: u32,
    stock: i64,
) -> Product {
    let now = Utc::now();
    Product {
        id: crate::repository::generate_id(),
        store_id: store_id.to_string(),
        sku: sku.to_string(),
        name: format!("Product {sku}"),
        hsn_code: Some("1006".to_string()),
        unit: "PCS".to_string(),
        mrp_paise: price_paise,
        purchase_price_paise: price_paise * 8 / 10,
        selling_price_paise: price_paise,
        gst_rate_bps: gst_bps,
        stock_quantity: stock,
        min_stock_level: 0,
        is_track_inventory: true,
        allow_negative_stock: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    const STORE: &str = "store-1";

    async fn setup() -> (Database, ProductRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        (db, repo)
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let (_db, repo) = setup().await;
        let product = test_product(STORE, "ATTA-5KG", 29900, 500, 10);
        repo.insert(&product).await.unwrap();

        let by_id = repo.get_by_id(STORE, &product.id).await.unwrap().unwrap();
        assert_eq!(by_id.sku, "ATTA-5KG");
        assert_eq!(by_id.gst_rate_bps, 500);

        let by_sku = repo.get_by_sku(STORE, "ATTA-5KG").await.unwrap().unwrap();
        assert_eq!(by_sku.id, product.id);

        // Other stores do not see it
        assert!(repo.get_by_id("store-2", &product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_rejected() {
        let (_db, repo) = setup().await;
        repo.insert(&test_product(STORE, "DUP", 100, 0, 1)).await.unwrap();

        let err = repo.insert(&test_product(STORE, "DUP", 100, 0, 1)).await.unwrap_err();
        match err {
            DbError::UniqueViolation { value, .. } => assert_eq!(value, "DUP"),
            other => panic!("unexpected error: {other:?}"),
        }

        // Same SKU in another store is fine
        repo.insert(&test_product("store-2", "DUP", 100, 0, 1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_adjust_stock_returns_new_level() {
        let (_db, repo) = setup().await;
        let product = test_product(STORE, "SUGAR-1KG", 4800, 500, 5);
        repo.insert(&product).await.unwrap();

        assert_eq!(repo.adjust_stock(STORE, &product.id, 24).await.unwrap(), 29);
        assert_eq!(repo.adjust_stock(STORE, &product.id, -9).await.unwrap(), 20);

        assert!(matches!(
            repo.adjust_stock(STORE, "missing", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_conditional_decrement() {
        let (db, repo) = setup().await;
        let product = test_product(STORE, "OIL-1L", 18000, 500, 2);
        repo.insert(&product).await.unwrap();
        let now = Utc::now();

        assert!(decrement_stock(db.pool(), &product.id, 2, now).await.unwrap());
        assert!(!decrement_stock(db.pool(), &product.id, 1, now).await.unwrap());

        let stock = repo.get_by_id(STORE, &product.id).await.unwrap().unwrap().stock_quantity;
        assert_eq!(stock, 0);
    }

    #[tokio::test]
    async fn test_negative_stock_allowed_decrements_past_zero() {
        let (db, repo) = setup().await;
        let mut product = test_product(STORE, "LOOSE-RICE", 6000, 0, 1);
        product.allow_negative_stock = true;
        repo.insert(&product).await.unwrap();

        assert!(decrement_stock(db.pool(), &product.id, 3, Utc::now()).await.unwrap());
        let stock = repo.get_by_id(STORE, &product.id).await.unwrap().unwrap().stock_quantity;
        assert_eq!(stock, -2);
    }

    #[tokio::test]
    async fn test_inactive_product_is_not_sellable() {
        let (db, repo) = setup().await;
        let mut product = test_product(STORE, "OLD", 100, 0, 5);
        repo.insert(&product).await.unwrap();

        product.is_active = false;
        repo.update(&product).await.unwrap();

        assert!(fetch_sellable(db.pool(), STORE, &product.id).await.unwrap().is_none());
        assert!(repo.get_by_id(STORE, &product.id).await.unwrap().is_some());
        assert_eq!(repo.count(STORE).await.unwrap(), 0);
    }
}
