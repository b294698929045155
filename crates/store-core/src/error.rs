//! # Error Types
//!
//! Domain-specific error types for store-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  store-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations while planning        │
//! │  └── ValidationError  - Malformed order requests                       │
//! │                                                                         │
//! │  store-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── OrderError       - What process_order returns to the caller       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → OrderError ← DbError              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised while planning an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A requested product id has no matching product.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Requested quantity exceeds the stock left for a product.
    ///
    /// ## User Workflow
    /// ```text
    /// Request: [{product_id: "tea", quantity: 5}]
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_name: "Green Tea", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Caller shows: "Not enough stock for Green Tea. Available: 3, Requested: 5"
    /// ```
    #[error("Insufficient stock for {product_name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// Line or order total does not fit in the money type.
    #[error("Order total exceeds the supported amount range")]
    AmountOverflow,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage access, so nothing has been read or written
/// when one of these comes back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },
}

impl ValidationError {
    /// Name of the offending input field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field } | ValidationError::MustBePositive { field } => {
                field
            }
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_name: "Green Tea".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Green Tea: available 3, requested 5"
        );

        let err = CoreError::ProductNotFound("p-404".to_string());
        assert_eq!(err.to_string(), "Product not found: p-404");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items is required");
        assert_eq!(err.field(), "items");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "product_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
