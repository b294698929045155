//! # Domain Types
//!
//! Core domain types used throughout Store Orders.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │   OrderItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──┼─────────────────┼───│  product_id     │       │
//! │  │  sku (business) │   │  id (UUID)      │◄──│  order_id (FK)  │       │
//! │  │  price_cents    │   │  status         │   │  quantity       │       │
//! │  │  stock          │   │  total_cents    │   │  snapshots      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │OrderRequestItem │   │  OrderStatus    │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  product_id     │   │  Pending        │                             │
//! │  │  quantity?      │   │  Completed      │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Products are shared and independently owned; an Order owns its items
//! (the items table cascades on order delete).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;
use crate::DEFAULT_QUANTITY;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name, quoted in stock errors and frozen onto order items.
    pub name: String,

    /// Price in cents (smallest currency unit). Never negative.
    pub price_cents: i64,

    /// Units currently available for sale. Never negative.
    pub stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product with a fresh UUID and current timestamps.
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price_cents: i64, stock: i64) -> Self {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            sku: sku.into(),
            name: name.into(),
            price_cents,
            stock,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be taken from current stock.
    #[inline]
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// `process_order` inserts `Pending` and flips to `Completed` inside the
/// same transaction, so callers only ever observe `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order row exists, items are being attached.
    Pending,
    /// Stock deducted, items persisted.
    Completed,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl OrderStatus {
    /// Lowercase name as stored in the `orders.status` column.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A persisted purchase: aggregate total plus status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    /// Sum of the items' `line_total_cents`.
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Creates a new pending order with a generated id.
    pub fn pending(total: Money, now: DateTime<Utc>) -> Self {
        Order {
            id: Uuid::new_v4().to_string(),
            status: OrderStatus::Pending,
            total_cents: total.cents(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Marks the order completed at `at`.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.status = OrderStatus::Completed;
        self.updated_at = at;
        self.completed_at = Some(at);
    }

    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item in an order.
/// Uses snapshot pattern to freeze product data at time of order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of order (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at time of order (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Order Request
// =============================================================================

/// One requested line as supplied by the caller.
///
/// ## Wire Shape
/// ```json
/// [{ "product_id": "…", "quantity": 2 }, { "product_id": "…" }]
/// ```
/// A missing `quantity` means one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderRequestItem {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub quantity: Option<i64>,
}

impl OrderRequestItem {
    /// Request with an explicit quantity.
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        OrderRequestItem {
            product_id: product_id.into(),
            quantity: Some(quantity),
        }
    }

    /// Request that leaves the quantity to the default.
    pub fn one(product_id: impl Into<String>) -> Self {
        OrderRequestItem {
            product_id: product_id.into(),
            quantity: None,
        }
    }

    /// Quantity to order: the explicit value or [`DEFAULT_QUANTITY`].
    #[inline]
    pub fn effective_quantity(&self) -> i64 {
        self.quantity.unwrap_or(DEFAULT_QUANTITY)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
