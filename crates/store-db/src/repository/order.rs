//! # Order Repository
//!
//! Database operations for orders and order items.
//!
//! ## Order Lifecycle (inside one transaction)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. INSERT ORDER                                                       │
//! │     └── insert_order() → Order { status: Pending }                     │
//! │                                                                         │
//! │  2. INSERT ITEMS (bulk)                                                │
//! │     └── insert_items() → [OrderItem, OrderItem, ...]                   │
//! │                                                                         │
//! │  3. COMPLETE                                                           │
//! │     └── set_status() → Order { status: Completed }                     │
//! │                                                                         │
//! │  COMMIT: readers never see a Pending order or an order w/o items      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use store_core::{Order, OrderItem, OrderStatus};

const ORDER_COLUMNS: &str = "id, status, total_cents, created_at, updated_at, completed_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, name_snapshot, unit_price_cents, \
                            quantity, line_total_cents, created_at";

/// Rows per INSERT statement; 8 binds per row stays well under SQLite's
/// host parameter limit.
const ITEM_INSERT_CHUNK: usize = 500;

/// Inserts an order row.
pub async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    debug!(id = %order.id, total_cents = order.total_cents, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, status, total_cents, created_at, updated_at, completed_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6
        )
        "#,
    )
    .bind(&order.id)
    .bind(order.status)
    .bind(order.total_cents)
    .bind(order.created_at)
    .bind(order.updated_at)
    .bind(order.completed_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts order items with multi-row INSERTs.
pub async fn insert_items(conn: &mut SqliteConnection, items: &[OrderItem]) -> DbResult<()> {
    for chunk in items.chunks(ITEM_INSERT_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("INSERT INTO order_items ({ITEM_COLUMNS}) "));
        qb.push_values(chunk, |mut row, item| {
            row.push_bind(item.id.clone())
                .push_bind(item.order_id.clone())
                .push_bind(item.product_id.clone())
                .push_bind(item.name_snapshot.clone())
                .push_bind(item.unit_price_cents)
                .push_bind(item.quantity)
                .push_bind(item.line_total_cents)
                .push_bind(item.created_at);
        });
        qb.build().execute(&mut *conn).await?;
    }

    debug!(count = items.len(), "Order items inserted");
    Ok(())
}

/// Changes an order's status; moving to `Completed` also stamps `completed_at`.
///
/// ## Returns
/// * `Err(DbError::NotFound)` - No order with that id
pub async fn set_status(
    conn: &mut SqliteConnection,
    order_id: &str,
    status: OrderStatus,
    at: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE orders SET
            status = ?2,
            updated_at = ?3,
            completed_at = CASE WHEN ?2 = 'completed' THEN ?3 ELSE completed_at END
        WHERE id = ?1
        "#,
    )
    .bind(order_id)
    .bind(status)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", order_id));
    }

    debug!(id = %order_id, status = status.as_str(), "Order status updated");
    Ok(())
}

/// Repository for reading orders outside of a transaction.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets all items for an order, in insertion order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY rowid"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Counts orders (for diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Counts order items across all orders.
    pub async fn count_items(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use store_core::{Money, Product};
    use uuid::Uuid;

    fn item(order_id: &str, product: &Product, quantity: i64) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_id: product.id.clone(),
            name_snapshot: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            line_total_cents: product.price_cents * quantity,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_order_insert_items_and_complete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let apple = db.products().insert(&Product::new("APL-1", "Apple", 10, 5)).await.unwrap();

        let order = Order::pending(Money::from_cents(30), Utc::now());
        let mut conn = db.pool().acquire().await.unwrap();
        insert_order(&mut conn, &order).await.unwrap();
        insert_items(&mut conn, &[item(&order.id, &apple, 1), item(&order.id, &apple, 2)])
            .await
            .unwrap();
        set_status(&mut conn, &order.id, OrderStatus::Completed, Utc::now())
            .await
            .unwrap();
        drop(conn);

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
        assert!(stored.completed_at.is_some());
        assert_eq!(stored.total_cents, 30);

        let items = db.orders().get_items(&order.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[1].line_total_cents, 20);
    }

    #[tokio::test]
    async fn test_set_status_unknown_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let err = set_status(&mut conn, "nope", OrderStatus::Completed, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_item_for_unknown_product_violates_foreign_key() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ghost = Product::new("GHOST", "Ghost", 10, 1);

        let order = Order::pending(Money::from_cents(10), Utc::now());
        let mut conn = db.pool().acquire().await.unwrap();
        insert_order(&mut conn, &order).await.unwrap();
        let err = insert_items(&mut conn, &[item(&order.id, &ghost, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_insert_items_chunks_large_orders() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let apple = db.products().insert(&Product::new("APL-1", "Apple", 1, 5000)).await.unwrap();

        let order = Order::pending(Money::from_cents(1200), Utc::now());
        let items: Vec<OrderItem> = (0..1200).map(|_| item(&order.id, &apple, 1)).collect();

        let mut conn = db.pool().acquire().await.unwrap();
        insert_order(&mut conn, &order).await.unwrap();
        insert_items(&mut conn, &items).await.unwrap();
        drop(conn);

        assert_eq!(db.orders().count_items().await.unwrap(), 1200);
    }
}
