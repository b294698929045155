//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Bulk read by id set (order placement step 1)
//! - Bulk compare-and-set stock write (order placement step 3)
//! - Single reads, inserts and counts for callers and seeding
//!
//! The bulk operations are free functions over a `SqliteConnection` so the
//! same SQL runs on a pooled connection or inside an open transaction.
//!
//! ## Compare-and-Set Stock Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products                                                    │
//! │  SET stock = CASE id WHEN 'a' THEN 3 WHEN 'b' THEN 2 END, ...       │
//! │  WHERE (id, stock) IN (VALUES ('a', 5), ('b', 3))                   │
//! │                                                                     │
//! │  rows_affected == 2  → every product still had the stock we read    │
//! │  rows_affected <  2  → someone sold in between → DbError::Conflict  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use store_core::{Product, StockUpdate};

const PRODUCT_COLUMNS: &str = "id, sku, name, price_cents, stock, created_at, updated_at";

/// Ids per SELECT; one bind each.
const FETCH_CHUNK: usize = 500;

/// Stock updates per UPDATE; three binds each plus the timestamp, well under
/// SQLite's host parameter limit.
const STOCK_UPDATE_CHUNK: usize = 500;

/// Reads every product whose id is in `ids`. Unknown ids are skipped.
pub async fn fetch_many(conn: &mut SqliteConnection, ids: &[String]) -> DbResult<Vec<Product>> {
    let mut products = Vec::with_capacity(ids.len());

    for chunk in ids.chunks(FETCH_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
        let mut separated = qb.separated(", ");
        for id in chunk {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        products.extend(qb.build_query_as::<Product>().fetch_all(&mut *conn).await?);
    }

    debug!(requested = ids.len(), found = products.len(), "Fetched products");
    Ok(products)
}

/// Writes new stock levels in bulk (one statement per chunk), guarded by
/// the levels read.
///
/// ## Returns
/// * `Ok(())` - Every product was updated
/// * `Err(DbError::Conflict)` - At least one product's stock no longer
///   matched `expected_stock`; nothing should be committed
pub async fn write_stock(
    conn: &mut SqliteConnection,
    updates: &[StockUpdate],
    now: DateTime<Utc>,
) -> DbResult<()> {
    let mut updated: u64 = 0;

    for chunk in updates.chunks(STOCK_UPDATE_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE products SET stock = CASE id");
        for update in chunk {
            qb.push(" WHEN ")
                .push_bind(update.product_id.clone())
                .push(" THEN ")
                .push_bind(update.new_stock);
        }
        qb.push(" END, updated_at = ").push_bind(now);

        qb.push(" WHERE (id, stock) IN (VALUES ");
        for (i, update) in chunk.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push("(")
                .push_bind(update.product_id.clone())
                .push(", ")
                .push_bind(update.expected_stock)
                .push(")");
        }
        qb.push(")");

        updated += qb.build().execute(&mut *conn).await?.rows_affected();
    }

    // All chunks run in the caller's transaction, so a short count rolls
    // back with it.
    if updated != updates.len() as u64 {
        return Err(DbError::conflict(format!(
            "stock changed for {} of {} products",
            updates.len() as u64 - updated,
            updates.len()
        )));
    }

    debug!(count = updates.len(), "Stock levels written");
    Ok(())
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
/// let product = repo.get_by_id("uuid-here").await?;
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

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets all products whose id is in `ids`.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_many(&mut conn, ids).await
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - id or SKU already exists
    /// * `Err(DbError::CheckViolation)` - negative price or stock
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, price_cents, stock, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Lists products ordered by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
