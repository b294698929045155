//! # store-core: Pure Business Logic for Store Orders
//!
//! This crate holds the order-placement rules as pure functions with zero
//! I/O dependencies. Everything that touches the database lives in
//! `store-db`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Store Orders Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Caller (HTTP handler, job, CLI)                    │   │
//! │  │      parses [{product_id, quantity}] and renders the Order      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               store-db: OrderProcessor                          │   │
//! │  │     begin tx ─► fetch ─► plan ─► write ─► commit / rollback     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ plan_order()                           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ store-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   order   │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ plan_order│  │   rules   │  │   │
//! │  │   │   Order   │  │           │  │ OrderPlan │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, OrderItem, OrderRequestItem)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`order`] - Stock checks, deduction and totals for one order
//! - [`error`] - Domain error types
//! - [`validation`] - Request validation
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::HashMap;
//! use store_core::order::plan_order;
//! use store_core::{OrderRequestItem, Product};
//!
//! let mut products = HashMap::new();
//! let mut tea = Product::new("TEA-1", "Green Tea", 250, 10);
//! tea.id = "tea".to_string();
//! products.insert(tea.id.clone(), tea);
//!
//! let plan = plan_order(&[OrderRequestItem::new("tea", 3)], &products).unwrap();
//! assert_eq!(plan.total.cents(), 750);
//! assert_eq!(plan.stock_updates[0].new_stock, 7);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use order::{plan_order, OrderPlan, PlannedLine, StockUpdate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Quantity used when a request item does not name one.
pub const DEFAULT_QUANTITY: i64 = 1;
