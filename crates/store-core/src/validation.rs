//! # Validation Module
//!
//! Input validation for order requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (HTTP handler)                                        │
//! │  └── Deserialization: shape of [{product_id, quantity?}]               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Non-empty request, product ids present, quantities positive       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Order planning (order.rs)                                    │
//! │  └── Product exists, stock sufficient                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  └── CHECK (stock >= 0), CHECK (quantity > 0), foreign keys            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use store_core::validation::{validate_order_request, validate_quantity};
//! use store_core::OrderRequestItem;
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_order_request(&[OrderRequestItem::one("tea")]).is_ok());
//! assert!(validate_order_request(&[]).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::OrderRequestItem;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a requested quantity.
///
/// ## Rules
/// - Must be positive (> 0). Zero or negative quantities would either be
///   no-ops or silently add stock, so both are rejected.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a product id reference.
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }

    Ok(())
}

/// Validates a whole order request before any storage access.
///
/// ## Rules
/// - At least one item
/// - Every item names a product
/// - Every explicit quantity is positive (omitted means 1)
pub fn validate_order_request(items: &[OrderRequestItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    for item in items {
        validate_product_id(&item.product_id)?;
        validate_quantity(item.effective_quantity())?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
