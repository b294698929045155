//! # In-Memory Store
//!
//! [`OrderStore`] over plain collections behind a `tokio::sync::Mutex`.
//! Used by processor tests, including the failure paths a real database
//! rarely produces on demand.
//!
//! ## Transaction Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  begin()    lock state (held until commit/rollback/drop)               │
//! │             clone state → staged                                       │
//! │  writes     applied to staged only                                     │
//! │  commit()   staged → state, unlock                                     │
//! │  drop       staged discarded, unlock                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transactions are fully serialized, so the compare-and-set in
//! `write_stock` only trips when a conflict is injected with
//! [`MemoryStore::with_conflicts`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{OrderStore, StoreTransaction};
use crate::error::{DbError, DbResult};
use store_core::{Order, OrderItem, OrderStatus, Product, StockUpdate};

/// Transaction step that should fail with an injected error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Begin,
    FetchProducts,
    WriteStock,
    InsertOrder,
    InsertItems,
    SetOrderStatus,
    Commit,
}

impl FailPoint {
    fn injected(self) -> DbError {
        DbError::QueryFailed(format!("injected failure at {:?}", self))
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: BTreeMap<String, Product>,
    orders: BTreeMap<String, Order>,
    items: Vec<OrderItem>,
}

/// Shared in-memory store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_at: Option<FailPoint>,
    conflicts: Arc<AtomicU32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle on the same data whose transactions fail at `point`.
    pub fn failing_at(&self, point: FailPoint) -> Self {
        MemoryStore {
            state: Arc::clone(&self.state),
            fail_at: Some(point),
            conflicts: Arc::clone(&self.conflicts),
        }
    }

    /// Makes the next `count` stock writes report a concurrent modification.
    pub fn with_conflicts(self, count: u32) -> Self {
        self.conflicts.store(count, Ordering::SeqCst);
        self
    }

    pub async fn insert_product(&self, product: Product) {
        let mut state = self.state.lock().await;
        state.products.insert(product.id.clone(), product);
    }

    pub async fn product(&self, id: &str) -> Option<Product> {
        self.state.lock().await.products.get(id).cloned()
    }

    pub async fn order(&self, id: &str) -> Option<Order> {
        self.state.lock().await.orders.get(id).cloned()
    }

    /// Items of one order, in insertion order.
    pub async fn items(&self, order_id: &str) -> Vec<OrderItem> {
        self.state
            .lock()
            .await
            .items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn item_count(&self) -> usize {
        self.state.lock().await.items.len()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> DbResult<MemoryTransaction> {
        if self.fail_at == Some(FailPoint::Begin) {
            return Err(FailPoint::Begin.injected());
        }

        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTransaction {
            guard,
            staged,
            fail_at: self.fail_at,
            conflicts: Arc::clone(&self.conflicts),
        })
    }
}

/// An open in-memory transaction; holds the store lock until finished.
#[derive(Debug)]
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_at: Option<FailPoint>,
    conflicts: Arc<AtomicU32>,
}

impl MemoryTransaction {
    fn check(&self, point: FailPoint) -> DbResult<()> {
        if self.fail_at == Some(point) {
            return Err(point.injected());
        }
        Ok(())
    }

    fn take_conflict(&self) -> bool {
        self.conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn fetch_products(&mut self, ids: &[String]) -> DbResult<Vec<Product>> {
        self.check(FailPoint::FetchProducts)?;

        Ok(ids
            .iter()
            .filter_map(|id| self.staged.products.get(id).cloned())
            .collect())
    }

    async fn write_stock(&mut self, updates: &[StockUpdate], now: DateTime<Utc>) -> DbResult<()> {
        self.check(FailPoint::WriteStock)?;

        if self.take_conflict() {
            return Err(DbError::conflict("injected concurrent stock change"));
        }

        // Validate everything first so a rejected write leaves staged untouched.
        for update in updates {
            let product = self
                .staged
                .products
                .get(&update.product_id)
                .ok_or_else(|| DbError::not_found("Product", &update.product_id))?;
            if product.stock != update.expected_stock {
                return Err(DbError::conflict(format!(
                    "stock for {} is {}, expected {}",
                    update.product_id, product.stock, update.expected_stock
                )));
            }
            if update.new_stock < 0 {
                return Err(DbError::CheckViolation {
                    message: format!("stock for {} would be negative", update.product_id),
                });
            }
        }

        for update in updates {
            if let Some(product) = self.staged.products.get_mut(&update.product_id) {
                product.stock = update.new_stock;
                product.updated_at = now;
            }
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> DbResult<()> {
        self.check(FailPoint::InsertOrder)?;

        if self.staged.orders.contains_key(&order.id) {
            return Err(DbError::UniqueViolation {
                field: "orders.id".to_string(),
                value: order.id.clone(),
            });
        }
        self.staged.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn insert_items(&mut self, items: &[OrderItem]) -> DbResult<()> {
        self.check(FailPoint::InsertItems)?;

        for item in items {
            if !self.staged.orders.contains_key(&item.order_id) {
                return Err(DbError::ForeignKeyViolation {
                    message: format!("order {} does not exist", item.order_id),
                });
            }
            if !self.staged.products.contains_key(&item.product_id) {
                return Err(DbError::ForeignKeyViolation {
                    message: format!("product {} does not exist", item.product_id),
                });
            }
            if item.quantity <= 0 {
                return Err(DbError::CheckViolation {
                    message: format!("quantity {} must be positive", item.quantity),
                });
            }
        }
        self.staged.items.extend_from_slice(items);
        Ok(())
    }

    async fn set_order_status(
        &mut self,
        order_id: &str,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        self.check(FailPoint::SetOrderStatus)?;

        let order = self
            .staged
            .orders
            .get_mut(order_id)
            .ok_or_else(|| DbError::not_found("Order", order_id))?;
        order.status = status;
        order.updated_at = at;
        if status == OrderStatus::Completed {
            order.completed_at = Some(at);
        }
        Ok(())
    }

    async fn commit(self) -> DbResult<()> {
        self.check(FailPoint::Commit)?;

        let MemoryTransaction {
            mut guard, staged, ..
        } = self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self) -> DbResult<()> {
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
