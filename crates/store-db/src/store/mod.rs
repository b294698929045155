//! # Transactional Store
//!
//! The seam between [`OrderProcessor`](crate::processor::OrderProcessor) and
//! storage. The processor never touches a pool or a global; it is handed an
//! [`OrderStore`] and does all its work through one [`StoreTransaction`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  let mut tx = store.begin().await?;                                    │
//! │  tx.fetch_products(..) / tx.write_stock(..) / tx.insert_order(..) ...  │
//! │  tx.commit().await?;        ← only path that makes writes visible      │
//! │                                                                         │
//! │  error anywhere → tx.rollback() (or simply drop tx)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Implementations
//! - [`SqliteStore`] - production, over a `SqlitePool`
//! - [`MemoryStore`] - tests, with fault injection

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DbResult;
use store_core::{Order, OrderItem, OrderStatus, Product, StockUpdate};

pub use memory::{FailPoint, MemoryStore, MemoryTransaction};
pub use sqlite::{SqliteStore, SqliteTransaction};

/// Something that can open order-placement transactions.
#[async_trait]
pub trait OrderStore: Send + Sync {
    type Tx: StoreTransaction;

    /// Opens a transaction. Nothing written through it is visible to
    /// others until [`StoreTransaction::commit`].
    async fn begin(&self) -> DbResult<Self::Tx>;
}

/// An open unit of work. Dropping it without `commit` discards every write.
#[async_trait]
pub trait StoreTransaction: Send + Sized {
    /// Bulk read of products by id; unknown ids are absent from the result.
    async fn fetch_products(&mut self, ids: &[String]) -> DbResult<Vec<Product>>;

    /// Bulk stock write; fails with `DbError::Conflict` if any product's
    /// stock differs from `expected_stock`.
    async fn write_stock(&mut self, updates: &[StockUpdate], now: DateTime<Utc>) -> DbResult<()>;

    async fn insert_order(&mut self, order: &Order) -> DbResult<()>;

    /// Bulk insert of line items.
    async fn insert_items(&mut self, items: &[OrderItem]) -> DbResult<()>;

    /// Status-only update of an order.
    async fn set_order_status(
        &mut self,
        order_id: &str,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> DbResult<()>;

    async fn commit(self) -> DbResult<()>;

    async fn rollback(self) -> DbResult<()>;
}
