//! # Repository Module
//!
//! Database repository implementations.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Pool-backed repositories          Connection-level functions          │
//! │  (reads, seeding, diagnostics)     (used inside a transaction)         │
//! │                                                                         │
//! │  db.products().get_by_id(id)       product::fetch_many(&mut tx, ids)   │
//! │  db.orders().get_items(id)         product::write_stock(&mut tx, ..)   │
//! │                                    order::insert_order(&mut tx, ..)    │
//! │                                    order::insert_items(&mut tx, ..)    │
//! │                                    order::set_status(&mut tx, ..)      │
//! │       │                                   │                             │
//! │       └──────────────┬────────────────────┘                             │
//! │                      ▼                                                  │
//! │               SQLite Database                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Product reads, inserts, bulk stock writes
//! - [`OrderRepository`] - Order and order item reads, order writes

pub mod order;
pub mod product;

pub use order::OrderRepository;
pub use product::ProductRepository;
