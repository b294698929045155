//! # SQLite Store
//!
//! [`OrderStore`] over a `SqlitePool`. Each transaction pins one pooled
//! connection; sqlx rolls the transaction back if it is dropped uncommitted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use super::{OrderStore, StoreTransaction};
use crate::error::{DbError, DbResult};
use crate::repository::{order, product};
use store_core::{Order, OrderItem, OrderStatus, Product, StockUpdate};

/// Production store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStore { pool }
    }
}

/// Keeps conflicts retryable; everything else on begin/commit/rollback is a
/// transaction failure.
fn transaction_error(err: sqlx::Error) -> DbError {
    match DbError::from(err) {
        DbError::Conflict(msg) => DbError::Conflict(msg),
        DbError::PoolExhausted => DbError::PoolExhausted,
        other => DbError::TransactionFailed(other.to_string()),
    }
}

#[async_trait]
impl OrderStore for SqliteStore {
    type Tx = SqliteTransaction;

    async fn begin(&self) -> DbResult<SqliteTransaction> {
        let tx = self.pool.begin().await.map_err(transaction_error)?;
        debug!("Transaction started");
        Ok(SqliteTransaction { tx })
    }
}

/// An open SQLite transaction.
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn fetch_products(&mut self, ids: &[String]) -> DbResult<Vec<Product>> {
        product::fetch_many(&mut self.tx, ids).await
    }

    async fn write_stock(&mut self, updates: &[StockUpdate], now: DateTime<Utc>) -> DbResult<()> {
        product::write_stock(&mut self.tx, updates, now).await
    }

    async fn insert_order(&mut self, order: &Order) -> DbResult<()> {
        order::insert_order(&mut self.tx, order).await
    }

    async fn insert_items(&mut self, items: &[OrderItem]) -> DbResult<()> {
        order::insert_items(&mut self.tx, items).await
    }

    async fn set_order_status(
        &mut self,
        order_id: &str,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        order::set_status(&mut self.tx, order_id, status, at).await
    }

    async fn commit(self) -> DbResult<()> {
        self.tx.commit().await.map_err(transaction_error)?;
        debug!("Transaction committed");
        Ok(())
    }

    async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await.map_err(transaction_error)?;
        debug!("Transaction rolled back");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use store_core::Money;

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let apple = db.products().insert(&Product::new("APL-1", "Apple", 10, 5)).await.unwrap();
        let store = db.store();

        {
            let mut tx = store.begin().await.unwrap();
            tx.write_stock(
                &[StockUpdate {
                    product_id: apple.id.clone(),
                    expected_stock: 5,
                    new_stock: 0,
                }],
                Utc::now(),
            )
            .await
            .unwrap();
            tx.insert_order(&Order::pending(Money::from_cents(50), Utc::now()))
                .await
                .unwrap();
            // dropped without commit
        }

        let apple = db.products().get_by_id(&apple.id).await.unwrap().unwrap();
        assert_eq!(apple.stock, 5);
        assert_eq!(db.orders().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_explicit_rollback_and_commit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.store();

        let order = Order::pending(Money::from_cents(10), Utc::now());
        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(db.orders().count().await.unwrap(), 0);

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.set_order_status(&order.id, OrderStatus::Completed, Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
    }
}
