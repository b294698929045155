//! # store-db: Storage and Order Placement
//!
//! SQLite storage (sqlx), migrations, repositories, and the
//! [`OrderProcessor`] that places orders atomically.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Order Placement Data Flow                        │
//! │                                                                         │
//! │  Caller: process_order(&[OrderRequestItem])                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     store-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ OrderProcessor│    │  OrderStore   │    │ Repositories │  │   │
//! │  │   │(processor.rs) │───►│  (store/)     │───►│ (repository/)│  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ retry policy  │    │ SqliteStore   │    │ product.rs   │  │   │
//! │  │   │ plan_order()  │    │ MemoryStore   │    │ order.rs     │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌──────────────────────────────────┐   │   │
//! │  │   │   Database    │    │  Migrations (embedded)           │   │   │
//! │  │   │   (pool.rs)   │    │  001_initial_schema.sql          │   │   │
//! │  │   └───────────────┘    └──────────────────────────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and order error types
//! - [`repository`] - Product and order SQL
//! - [`store`] - Transaction seam used by the processor
//! - [`processor`] - Order placement and retry policy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use store_db::{Database, DbConfig, ProcessorConfig};
//! use store_core::OrderRequestItem;
//!
//! let db = Database::new(DbConfig::from_env()).await?;
//!
//! let order = db
//!     .order_processor(ProcessorConfig::from_env())
//!     .process_order(&[OrderRequestItem::new(product_id, 2)])
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod processor;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, FieldError, OrderError};
pub use pool::{Database, DbConfig};
pub use processor::{OrderProcessor, ProcessorConfig};
pub use store::{MemoryStore, OrderStore, SqliteStore, StoreTransaction};

// Repository re-exports for convenience
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
