//! # Order Processor
//!
//! Places an order atomically: validates stock, deducts inventory and writes
//! the order with its items, all inside one store transaction.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     process_order(&items)                               │
//! │                                                                         │
//! │  validate_order_request()          ← no storage touched on bad input   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────── attempt (one transaction) ───────────────────────┐   │
//! │  │ begin                                                           │   │
//! │  │ 1. fetch_products(distinct ids)          bulk read             │   │
//! │  │ 2. plan_order()                          stock check + totals  │   │
//! │  │ 3. write_stock(updates)                  bulk compare-and-set  │   │
//! │  │ 4. insert_order(Pending, total)                                 │   │
//! │  │ 5. insert_items(lines + order id)        bulk insert           │   │
//! │  │ 6. set_order_status(Completed)                                  │   │
//! │  │ commit                     any error → rollback                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ├── Ok(order)                        → return completed order    │
//! │       ├── Err(Storage(Conflict)), retries left → sleep, attempt again  │
//! │       └── Err(other)                       → return error              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A retried attempt re-reads stock, so an order that lost a race for the
//! last units fails with `InsufficientStock` rather than overselling.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::error::OrderError;
use crate::store::{OrderStore, StoreTransaction};
use store_core::validation::validate_order_request;
use store_core::{plan_order, Order, OrderRequestItem, OrderStatus, Product};

// =============================================================================
// Configuration
// =============================================================================

/// Retry policy for write conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Extra attempts after the first one when the transaction conflicts.
    /// Default: 3
    pub max_retries: u32,

    /// Pause before each retry.
    /// Default: 10 milliseconds
    pub retry_backoff: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig {
            max_retries: 3,
            retry_backoff: Duration::from_millis(10),
        }
    }
}

impl ProcessorConfig {
    /// Builds a configuration from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `STORE_ORDER_MAX_RETRIES`: retries on conflict (default 3)
    /// - `STORE_ORDER_RETRY_BACKOFF_MS`: pause between retries (default 10)
    pub fn from_env() -> Self {
        let mut config = ProcessorConfig::default();

        if let Ok(raw) = std::env::var("STORE_ORDER_MAX_RETRIES") {
            match raw.parse::<u32>() {
                Ok(retries) => config.max_retries = retries,
                Err(_) => warn!(value = %raw, "Ignoring invalid STORE_ORDER_MAX_RETRIES"),
            }
        }

        if let Ok(raw) = std::env::var("STORE_ORDER_RETRY_BACKOFF_MS") {
            match raw.parse::<u64>() {
                Ok(ms) => config.retry_backoff = Duration::from_millis(ms),
                Err(_) => warn!(value = %raw, "Ignoring invalid STORE_ORDER_RETRY_BACKOFF_MS"),
            }
        }

        config
    }

    /// Sets the number of retries on conflict.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the pause between retries.
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

// =============================================================================
// Processor
// =============================================================================

/// Turns order requests into completed orders against an [`OrderStore`].
///
/// ## Usage
/// ```rust,ignore
/// let processor = OrderProcessor::new(db.store());
/// let order = processor
///     .process_order(&[OrderRequestItem::new(apple_id, 2), OrderRequestItem::one(bread_id)])
///     .await?;
/// assert_eq!(order.status, OrderStatus::Completed);
/// ```
#[derive(Debug, Clone)]
pub struct OrderProcessor<S> {
    store: S,
    config: ProcessorConfig,
}

impl<S: OrderStore> OrderProcessor<S> {
    /// Creates a processor with the default retry policy.
    pub fn new(store: S) -> Self {
        Self::with_config(store, ProcessorConfig::default())
    }

    pub fn with_config(store: S, config: ProcessorConfig) -> Self {
        OrderProcessor { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order for `requested_items`.
    ///
    /// ## Returns
    /// * `Ok(Order)` - Completed order; stock deducted, items written
    /// * `Err(OrderError)` - Nothing was written
    #[instrument(skip(self, requested_items), fields(items = requested_items.len()))]
    pub async fn process_order(
        &self,
        requested_items: &[OrderRequestItem],
    ) -> Result<Order, OrderError> {
        validate_order_request(requested_items)?;

        let mut attempt: u32 = 0;
        loop {
            match self.attempt(requested_items).await {
                Err(OrderError::Storage(err))
                    if err.is_conflict() && attempt < self.config.max_retries =>
                {
                    attempt += 1;
                    warn!(
                        error = %err,
                        attempt,
                        max_retries = self.config.max_retries,
                        "Order transaction conflicted, retrying"
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                Ok(order) => {
                    info!(
                        order_id = %order.id,
                        total_cents = order.total_cents,
                        "Order completed"
                    );
                    return Ok(order);
                }
                Err(err) => {
                    debug!(error = %err, "Order rejected");
                    return Err(err);
                }
            }
        }
    }

    /// One transaction: commit on success, roll back on any error.
    async fn attempt(&self, requested_items: &[OrderRequestItem]) -> Result<Order, OrderError> {
        let mut tx = self.store.begin().await?;

        match place_order(&mut tx, requested_items).await {
            Ok(order) => {
                tx.commit().await?;
                Ok(order)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// Steps 1-6 inside an open transaction.
async fn place_order<T: StoreTransaction>(
    tx: &mut T,
    requested_items: &[OrderRequestItem],
) -> Result<Order, OrderError> {
    let mut seen = HashSet::new();
    let ids: Vec<String> = requested_items
        .iter()
        .filter(|item| seen.insert(item.product_id.as_str()))
        .map(|item| item.product_id.clone())
        .collect();

    let products: HashMap<String, Product> = tx
        .fetch_products(&ids)
        .await?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    let plan = plan_order(requested_items, &products)?;

    let now = Utc::now();
    tx.write_stock(&plan.stock_updates, now).await?;

    let mut order = Order::pending(plan.total, now);
    tx.insert_order(&order).await?;

    let items = plan.into_items(&order.id, now);
    tx.insert_items(&items).await?;

    tx.set_order_status(&order.id, OrderStatus::Completed, now)
        .await?;
    order.complete(now);

    debug!(order_id = %order.id, lines = items.len(), "Order written");
    Ok(order)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use crate::store::{FailPoint, MemoryStore, SqliteStore};
    use async_trait::async_trait;
    use std::sync::Arc;
    use store_core::{Money, OrderItem, ValidationError};

    /// Apple: $0.10 × 5, Bread: $0.20 × 3
    fn catalog() -> Vec<Product> {
        let mut apple = Product::new("APL-1", "Apple", 10, 5);
        apple.id = "a".to_string();
        let mut bread = Product::new("BRD-1", "Bread", 20, 3);
        bread.id = "b".to_string();
        vec![apple, bread]
    }

    /// Same scenarios, either backend.
    #[async_trait]
    trait Backend: Sized + Send + Sync {
        type Store: OrderStore;

        async fn open(products: Vec<Product>) -> Self;
        fn processor(&self) -> OrderProcessor<Self::Store>;
        async fn stock_of(&self, id: &str) -> i64;
        async fn stored_order(&self, id: &str) -> Option<Order>;
        async fn stored_items(&self, order_id: &str) -> Vec<OrderItem>;
        /// (orders, order items)
        async fn counts(&self) -> (usize, usize);
    }

    #[async_trait]
    impl Backend for MemoryStore {
        type Store = MemoryStore;

        async fn open(products: Vec<Product>) -> Self {
            let store = MemoryStore::new();
            for p in products {
                store.insert_product(p).await;
            }
            store
        }

        fn processor(&self) -> OrderProcessor<MemoryStore> {
            OrderProcessor::new(self.clone())
        }

        async fn stock_of(&self, id: &str) -> i64 {
            self.product(id).await.unwrap().stock
        }

        async fn stored_order(&self, id: &str) -> Option<Order> {
            self.order(id).await
        }

        async fn stored_items(&self, order_id: &str) -> Vec<OrderItem> {
            self.items(order_id).await
        }

        async fn counts(&self) -> (usize, usize) {
            (self.order_count().await, self.item_count().await)
        }
    }

    #[async_trait]
    impl Backend for Database {
        type Store = SqliteStore;

        async fn open(products: Vec<Product>) -> Self {
            let db = Database::new(DbConfig::in_memory()).await.unwrap();
            for p in &products {
                db.products().insert(p).await.unwrap();
            }
            db
        }

        fn processor(&self) -> OrderProcessor<SqliteStore> {
            self.order_processor(ProcessorConfig::default())
        }

        async fn stock_of(&self, id: &str) -> i64 {
            self.products().get_by_id(id).await.unwrap().unwrap().stock
        }

        async fn stored_order(&self, id: &str) -> Option<Order> {
            self.orders().get_by_id(id).await.unwrap()
        }

        async fn stored_items(&self, order_id: &str) -> Vec<OrderItem> {
            self.orders().get_items(order_id).await.unwrap()
        }

        async fn counts(&self) -> (usize, usize) {
            (
                self.orders().count().await.unwrap() as usize,
                self.orders().count_items().await.unwrap() as usize,
            )
        }
    }

    async fn assert_untouched<B: Backend>(backend: &B) {
        assert_eq!(backend.stock_of("a").await, 5);
        assert_eq!(backend.stock_of("b").await, 3);
        assert_eq!(backend.counts().await, (0, 0));
    }

    // -------------------------------------------------------------------------
    // Scenarios
    // -------------------------------------------------------------------------

    async fn two_product_order<B: Backend>() {
        let backend = B::open(catalog()).await;
        let order = backend
            .processor()
            .process_order(&[OrderRequestItem::new("a", 2), OrderRequestItem::new("b", 1)])
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.total(), Money::from_cents(40));
        assert!(order.completed_at.is_some());

        let stored = backend.stored_order(&order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
        assert_eq!(stored.total_cents, 40);

        let items = backend.stored_items(&order.id).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_id, "a");
        assert_eq!(items[0].name_snapshot, "Apple");
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].unit_price_cents, 10);
        assert_eq!(items[1].product_id, "b");
        assert_eq!(items[1].line_total_cents, 20);
        let line_sum: i64 = items.iter().map(|i| i.line_total_cents).sum();
        assert_eq!(line_sum, order.total_cents);

        assert_eq!(backend.stock_of("a").await, 3);
        assert_eq!(backend.stock_of("b").await, 2);
    }

    async fn exact_stock_then_empty<B: Backend>() {
        let backend = B::open(catalog()).await;
        let processor = backend.processor();

        processor
            .process_order(&[OrderRequestItem::new("a", 5)])
            .await
            .unwrap();
        assert_eq!(backend.stock_of("a").await, 0);

        let err = processor
            .process_order(&[OrderRequestItem::one("a")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                available: 0,
                requested: 1,
                ..
            }
        ));
        assert_eq!(backend.counts().await, (1, 1));
    }

    async fn one_over_stock<B: Backend>() {
        let backend = B::open(catalog()).await;
        let err = backend
            .processor()
            .process_order(&[OrderRequestItem::new("a", 6)])
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Not enough stock for Apple. Available: 5, Requested: 6"
        );
        assert_untouched(&backend).await;
    }

    async fn unknown_product_anywhere<B: Backend>() {
        let backend = B::open(catalog()).await;
        let processor = backend.processor();

        for position in 0..3 {
            let mut items = vec![OrderRequestItem::new("a", 1), OrderRequestItem::new("b", 1)];
            items.insert(position, OrderRequestItem::one("ghost"));

            let err = processor.process_order(&items).await.unwrap_err();
            assert!(
                matches!(&err, OrderError::ProductNotFound { product_id } if product_id == "ghost"),
                "position {position}: {err:?}"
            );
            assert_eq!(err.to_string(), "Product with ID ghost not found.");
        }
        assert_untouched(&backend).await;
    }

    async fn default_quantity_is_one<B: Backend>() {
        let backend = B::open(catalog()).await;
        let order = backend
            .processor()
            .process_order(&[OrderRequestItem::one("b")])
            .await
            .unwrap();

        assert_eq!(order.total_cents, 20);
        assert_eq!(backend.stored_items(&order.id).await[0].quantity, 1);
        assert_eq!(backend.stock_of("b").await, 2);
    }

    async fn late_failure_leaves_no_trace<B: Backend>() {
        let backend = B::open(catalog()).await;
        let err = backend
            .processor()
            .process_order(&[OrderRequestItem::new("a", 1), OrderRequestItem::new("b", 4)])
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InsufficientStock { .. }));
        assert_untouched(&backend).await;
    }

    async fn invalid_requests_rejected<B: Backend>() {
        let backend = B::open(catalog()).await;
        let processor = backend.processor();

        let err = processor.process_order(&[]).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidRequest(ValidationError::Required { .. })));
        assert_eq!(err.field(), "items");

        for quantity in [0, -3] {
            let err = processor
                .process_order(&[OrderRequestItem::new("a", quantity)])
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                OrderError::InvalidRequest(ValidationError::MustBePositive { .. })
            ));
        }

        let err = processor
            .process_order(&[OrderRequestItem::one("  ")])
            .await
            .unwrap_err();
        assert_eq!(err.field(), "product_id");

        assert_untouched(&backend).await;
    }

    async fn repeated_product_is_cumulative<B: Backend>() {
        let backend = B::open(catalog()).await;
        let processor = backend.processor();

        let err = processor
            .process_order(&[OrderRequestItem::new("a", 3), OrderRequestItem::new("a", 3)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            }
        ));
        assert_untouched(&backend).await;

        let order = processor
            .process_order(&[OrderRequestItem::new("a", 3), OrderRequestItem::new("a", 2)])
            .await
            .unwrap();
        assert_eq!(order.total_cents, 50);
        assert_eq!(backend.stored_items(&order.id).await.len(), 2);
        assert_eq!(backend.stock_of("a").await, 0);
    }

    async fn order_across_large_catalog<B: Backend>() {
        const DISTINCT: usize = 11_000;
        let products: Vec<Product> = (0..DISTINCT)
            .map(|i| Product::new(format!("BULK-{i:05}"), format!("Bulk {i}"), 1, 1))
            .collect();
        let request: Vec<OrderRequestItem> = products
            .iter()
            .map(|p| OrderRequestItem::one(p.id.clone()))
            .collect();
        let first = products[0].id.clone();
        let last = products[DISTINCT - 1].id.clone();

        let backend = B::open(products).await;
        let order = backend.processor().process_order(&request).await.unwrap();

        assert_eq!(order.total_cents, DISTINCT as i64);
        assert_eq!(backend.counts().await, (1, DISTINCT));
        assert_eq!(backend.stock_of(&first).await, 0);
        assert_eq!(backend.stock_of(&last).await, 0);
    }

    #[tokio::test]
    async fn test_two_product_order() {
        two_product_order::<MemoryStore>().await;
        two_product_order::<Database>().await;
    }

    #[tokio::test]
    async fn test_exact_stock_then_empty() {
        exact_stock_then_empty::<MemoryStore>().await;
        exact_stock_then_empty::<Database>().await;
    }

    #[tokio::test]
    async fn test_one_over_stock() {
        one_over_stock::<MemoryStore>().await;
        one_over_stock::<Database>().await;
    }

    #[tokio::test]
    async fn test_unknown_product_anywhere() {
        unknown_product_anywhere::<MemoryStore>().await;
        unknown_product_anywhere::<Database>().await;
    }

    #[tokio::test]
    async fn test_default_quantity_is_one() {
        default_quantity_is_one::<MemoryStore>().await;
        default_quantity_is_one::<Database>().await;
    }

    #[tokio::test]
    async fn test_late_failure_leaves_no_trace() {
        late_failure_leaves_no_trace::<MemoryStore>().await;
        late_failure_leaves_no_trace::<Database>().await;
    }

    #[tokio::test]
    async fn test_invalid_requests_rejected() {
        invalid_requests_rejected::<MemoryStore>().await;
        invalid_requests_rejected::<Database>().await;
    }

    #[tokio::test]
    async fn test_repeated_product_is_cumulative() {
        repeated_product_is_cumulative::<MemoryStore>().await;
        repeated_product_is_cumulative::<Database>().await;
    }

    #[tokio::test]
    async fn test_order_across_large_catalog() {
        order_across_large_catalog::<MemoryStore>().await;
        order_across_large_catalog::<Database>().await;
    }

    // -------------------------------------------------------------------------
    // Storage failures and retries
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_storage_failure_at_any_step_rolls_back() {
        let store = MemoryStore::open(catalog()).await;
        let items = [OrderRequestItem::new("a", 2), OrderRequestItem::new("b", 1)];

        for point in [
            FailPoint::Begin,
            FailPoint::FetchProducts,
            FailPoint::WriteStock,
            FailPoint::InsertOrder,
            FailPoint::InsertItems,
            FailPoint::SetOrderStatus,
            FailPoint::Commit,
        ] {
            let err = OrderProcessor::new(store.failing_at(point))
                .process_order(&items)
                .await
                .unwrap_err();
            assert!(
                matches!(err, OrderError::Storage(DbError::QueryFailed(_))),
                "{point:?}: {err:?}"
            );
            assert_eq!(err.field(), "non_field_errors");
            assert_untouched(&store).await;
        }

        // The healthy handle still works afterwards.
        OrderProcessor::new(store.clone())
            .process_order(&items)
            .await
            .unwrap();
        assert_eq!(store.stock_of("a").await, 3);
    }

    #[tokio::test]
    async fn test_conflicts_are_retried() {
        let store = MemoryStore::open(catalog()).await.with_conflicts(2);
        let processor = OrderProcessor::with_config(
            store.clone(),
            ProcessorConfig::default()
                .max_retries(3)
                .retry_backoff(Duration::ZERO),
        );

        let order = processor
            .process_order(&[OrderRequestItem::new("a", 1)])
            .await
            .unwrap();
        assert_eq!(order.total_cents, 10);
        assert_eq!(store.stock_of("a").await, 4);
        assert_eq!(store.counts().await, (1, 1));
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_conflict() {
        let store = MemoryStore::open(catalog()).await.with_conflicts(10);
        let processor = OrderProcessor::with_config(
            store.clone(),
            ProcessorConfig::default()
                .max_retries(2)
                .retry_backoff(Duration::ZERO),
        );

        let err = processor
            .process_order(&[OrderRequestItem::new("a", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Storage(ref e) if e.is_conflict()));
        assert_untouched(&store).await;
    }

    #[tokio::test]
    async fn test_item_snapshot_survives_product_changes() {
        let store = MemoryStore::open(catalog()).await;
        let order = OrderProcessor::new(store.clone())
            .process_order(&[OrderRequestItem::new("a", 1)])
            .await
            .unwrap();

        let mut renamed = store.product("a").await.unwrap();
        renamed.name = "Green Apple".to_string();
        renamed.price_cents = 99;
        store.insert_product(renamed).await;

        let items = store.items(&order.id).await;
        assert_eq!(items[0].name_snapshot, "Apple");
        assert_eq!(items[0].unit_price_cents, 10);
    }

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------

    fn last_unit() -> Vec<Product> {
        let mut widget = Product::new("WDG-1", "Widget", 500, 1);
        widget.id = "w".to_string();
        vec![widget]
    }

    async fn race<S>(processor: Arc<OrderProcessor<S>>, racers: usize) -> Vec<Result<Order, OrderError>>
    where
        S: OrderStore + 'static,
    {
        let handles: Vec<_> = (0..racers)
            .map(|_| {
                let processor = Arc::clone(&processor);
                tokio::spawn(async move {
                    processor
                        .process_order(&[OrderRequestItem::one("w")])
                        .await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(racers);
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results
    }

    fn assert_single_winner(results: &[Result<Order, OrderError>]) {
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(
                    err,
                    OrderError::InsufficientStock {
                        available: 0,
                        requested: 1,
                        ..
                    }
                ),
                "{err:?}"
            );
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_last_unit_race_memory() {
        let store = MemoryStore::open(last_unit()).await;
        let results = race(Arc::new(OrderProcessor::new(store.clone())), 2).await;

        assert_single_winner(&results);
        assert_eq!(store.stock_of("w").await, 0);
        assert_eq!(store.counts().await, (1, 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_last_unit_race_sqlite_file() {
        let path = std::env::temp_dir().join(format!("store-race-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(4))
            .await
            .unwrap();
        for p in last_unit() {
            db.products().insert(&p).await.unwrap();
        }

        let processor = db.order_processor(
            ProcessorConfig::default()
                .max_retries(10)
                .retry_backoff(Duration::from_millis(5)),
        );
        let results = race(Arc::new(processor), 6).await;

        assert_single_winner(&results);
        assert_eq!(db.stock_of("w").await, 0);
        assert_eq!(db.counts().await, (1, 1));

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}
