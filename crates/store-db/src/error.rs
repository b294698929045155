//! # Database Error Types
//!
//! Error types for database operations and for order processing.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          store_core::CoreError             │
//! │       │                                     │                           │
//! │       ▼                                     │                           │
//! │  DbError ← Adds context, marks Conflict     │                           │
//! │       │                                     │                           │
//! │       └──────────────┬──────────────────────┘                           │
//! │                      ▼                                                  │
//! │                 OrderError (returned by process_order)                  │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │                 FieldError { field, message } for the caller            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use store_core::{CoreError, ValidationError};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate SKU
    /// - Reusing an order or item id
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Order item pointing at a product that was deleted
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock, non-positive quantity).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// Another transaction got in first.
    ///
    /// ## When This Occurs
    /// - SQLite reports BUSY / LOCKED (a concurrent writer holds or has
    ///   advanced the database past our snapshot)
    /// - A compare-and-set stock write found the stock already changed
    ///
    /// The whole transaction is safe to retry.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed (begin, commit or rollback).
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        DbError::Conflict(message.into())
    }

    /// Whether retrying the whole transaction may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }
}

/// SQLite primary/extended result codes that mean "someone else holds or
/// moved the lock": BUSY, LOCKED, BUSY_RECOVERY, LOCKED_SHAREDCACHE,
/// BUSY_SNAPSHOT, BUSY_TIMEOUT.
const SQLITE_CONFLICT_CODES: &[&str] = &["5", "6", "261", "262", "517", "773"];

fn is_sqlite_conflict(code: Option<&str>, message: &str) -> bool {
    if let Some(code) = code {
        if SQLITE_CONFLICT_CODES.contains(&code) {
            return true;
        }
    }
    message.contains("database is locked") || message.contains("database table is locked")
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Conflict for BUSY/LOCKED, else by constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                if is_sqlite_conflict(code.as_deref(), msg) {
                    DbError::Conflict(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed") {
                    // "UNIQUE constraint failed: <table>.<column>"
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Order Error
// =============================================================================

/// Everything `OrderProcessor::process_order` can fail with.
///
/// Whatever the variant, the store is exactly as it was before the call.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A requested product id does not exist.
    #[error("Product with ID {product_id} not found.")]
    ProductNotFound { product_id: String },

    /// Requested quantity exceeds the stock available.
    #[error("Not enough stock for {product_name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// The request itself is malformed (empty, blank id, quantity <= 0).
    #[error("{0}")]
    InvalidRequest(#[from] ValidationError),

    /// Order total does not fit in the money type.
    #[error("Order total exceeds the supported amount range")]
    AmountOverflow,

    /// Storage failed; the transaction was rolled back.
    #[error("Storage failure: {0}")]
    Storage(#[from] DbError),
}

impl From<CoreError> for OrderError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(product_id) => OrderError::ProductNotFound { product_id },
            CoreError::InsufficientStock {
                product_name,
                available,
                requested,
            } => OrderError::InsufficientStock {
                product_name,
                available,
                requested,
            },
            CoreError::AmountOverflow => OrderError::AmountOverflow,
            CoreError::Validation(e) => OrderError::InvalidRequest(e),
        }
    }
}

/// User-presentable error detail: which field, and what went wrong.
///
/// ## Serialization
/// ```json
/// { "field": "stock", "message": "Not enough stock for Apple. Available: 3, Requested: 5" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl OrderError {
    /// Input field the error is about.
    pub fn field(&self) -> &str {
        match self {
            OrderError::ProductNotFound { .. } => "product_id",
            OrderError::InsufficientStock { .. } => "stock",
            OrderError::InvalidRequest(e) => e.field(),
            OrderError::AmountOverflow => "total",
            OrderError::Storage(_) => "non_field_errors",
        }
    }

    /// Structured detail for the caller.
    ///
    /// Storage details are logged, not exposed.
    pub fn field_error(&self) -> FieldError {
        let message = match self {
            OrderError::Storage(e) => {
                tracing::error!(error = %e, "Order storage failure");
                "Order could not be saved, please retry".to_string()
            }
            other => other.to_string(),
        };
        FieldError {
            field: self.field().to_string(),
            message,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
