//! # Order Planning
//!
//! The pure half of order placement: given the requested lines and the
//! products read from storage, decide whether the order can be filled and
//! compute everything that has to be written.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        plan_order()                                     │
//! │                                                                         │
//! │  for each requested item (input order):                                │
//! │       │                                                                 │
//! │       ├── product missing?        → ProductNotFound(id)                │
//! │       ├── quantity <= 0?          → Validation(quantity)               │
//! │       ├── remaining < quantity?   → InsufficientStock                  │
//! │       │                                                                 │
//! │       └── remaining -= quantity                                        │
//! │           total += price × quantity                                    │
//! │           lines.push(line)                                             │
//! │                                                                         │
//! │  OrderPlan { lines, stock_updates, total }                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A product requested twice is checked against the stock left after the
//! first line, so two lines of 3 against a stock of 5 fail on the second.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{OrderItem, OrderRequestItem, Product};
use crate::validation::validate_quantity;

/// New stock level for one product, with the level it was computed from.
///
/// `expected_stock` lets storage reject the write when another order moved
/// the stock in between (compare-and-set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockUpdate {
    pub product_id: String,
    pub expected_stock: i64,
    pub new_stock: i64,
}

/// A line item waiting for its order id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: String,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

impl PlannedLine {
    /// Binds the line to its order.
    pub fn into_item(self, order_id: &str, now: DateTime<Utc>) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_id: self.product_id,
            name_snapshot: self.name_snapshot,
            unit_price_cents: self.unit_price_cents,
            quantity: self.quantity,
            line_total_cents: self.line_total_cents,
            created_at: now,
        }
    }
}

/// Everything an accepted order needs written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    /// One per requested item, in request order.
    pub lines: Vec<PlannedLine>,
    /// One per distinct product, in order of first request.
    pub stock_updates: Vec<StockUpdate>,
    pub total: Money,
}

impl OrderPlan {
    /// Attaches `order_id` to every planned line.
    pub fn into_items(self, order_id: &str, now: DateTime<Utc>) -> Vec<OrderItem> {
        self.lines
            .into_iter()
            .map(|line| line.into_item(order_id, now))
            .collect()
    }
}

/// Validates stock for every requested item and computes the order.
///
/// ## Arguments
/// * `requested` - Items in caller order
/// * `products` - Products read from storage, keyed by id. Ids with no
///   product are simply absent.
///
/// ## Returns
/// * `Ok(OrderPlan)` - Every line can be filled
/// * `Err(CoreError)` - First failing line, nothing partial
pub fn plan_order(
    requested: &[OrderRequestItem],
    products: &HashMap<String, Product>,
) -> CoreResult<OrderPlan> {
    let mut lines = Vec::with_capacity(requested.len());
    let mut stock_updates: Vec<StockUpdate> = Vec::new();
    let mut update_index: HashMap<&str, usize> = HashMap::new();
    let mut total = Money::zero();

    for item in requested {
        let product = products
            .get(&item.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

        let quantity = item.effective_quantity();
        validate_quantity(quantity)?;

        let idx = *update_index.entry(product.id.as_str()).or_insert_with(|| {
            stock_updates.push(StockUpdate {
                product_id: product.id.clone(),
                expected_stock: product.stock,
                new_stock: product.stock,
            });
            stock_updates.len() - 1
        });
        let update = &mut stock_updates[idx];

        if update.new_stock < quantity {
            return Err(CoreError::InsufficientStock {
                product_name: product.name.clone(),
                available: update.new_stock,
                requested: quantity,
            });
        }
        update.new_stock -= quantity;

        let line_total = product
            .price()
            .checked_multiply_quantity(quantity)
            .ok_or(CoreError::AmountOverflow)?;
        total = total
            .checked_add(line_total)
            .ok_or(CoreError::AmountOverflow)?;

        lines.push(PlannedLine {
            product_id: product.id.clone(),
            name_snapshot: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            line_total_cents: line_total.cents(),
        });
    }

    Ok(OrderPlan {
        lines,
        stock_updates,
        total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
