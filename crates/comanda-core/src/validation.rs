//! # Validation Module
//!
//! Input validation for the order engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (HTTP layer, out of scope)                            │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required-field and range checks                                   │
//! │  └── Runs BEFORE any transaction is opened                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::CreateOrderRequest;
use crate::{MAX_BATCH_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates an order identifier.
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - Must be at most 64 characters
pub fn validate_order_id(order_id: &str) -> ValidationResult<()> {
    let order_id = order_id.trim();

    if order_id.is_empty() {
        return Err(ValidationError::Required {
            field: "order_id".to_string(),
        });
    }

    if order_id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "order_id".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates a line-item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates a create-or-append request before any transaction is opened.
///
/// ## Rules
/// - `order_id` is required (non-empty, bounded length)
/// - `items` must be non-empty and at most MAX_BATCH_ITEMS entries
/// - every item quantity must be positive and bounded
///
/// Price signs are not checked here; the schema's CHECK constraints are the
/// system of record for monetary bounds, and a violation rolls back the
/// whole transaction.
pub fn validate_create_order(req: &CreateOrderRequest) -> ValidationResult<()> {
    validate_order_id(&req.order_id)?;

    if req.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if req.items.len() > MAX_BATCH_ITEMS {
        return Err(ValidationError::TooMany {
            field: "items".to_string(),
            max: MAX_BATCH_ITEMS,
        });
    }

    for item in &req.items {
        validate_quantity(item.quantity)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewOrderItem, TableRef};

    fn request_with(order_id: &str, items: Vec<NewOrderItem>) -> CreateOrderRequest {
        CreateOrderRequest {
            order_id: order_id.to_string(),
            customer_name: None,
            table_ref: TableRef::Takeaway,
            items,
        }
    }

    fn item(quantity: i64) -> NewOrderItem {
        NewOrderItem {
            menu_id: 1,
            quantity,
            unit_price_cents: 500,
            note: None,
            options: Vec::new(),
        }
    }

    #[test]
    fn test_validate_order_id() {
        assert!(validate_order_id("order-20260827-001").is_ok());
        assert!(validate_order_id("").is_err());
        assert!(validate_order_id("   ").is_err());
        assert!(validate_order_id(&"x".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_create_order() {
        assert!(validate_create_order(&request_with("o1", vec![item(2)])).is_ok());

        // Missing order id
        assert!(validate_create_order(&request_with("", vec![item(2)])).is_err());

        // Empty batch
        assert!(matches!(
            validate_create_order(&request_with("o1", vec![])),
            Err(ValidationError::Required { .. })
        ));

        // Bad quantity inside the batch
        assert!(validate_create_order(&request_with("o1", vec![item(2), item(0)])).is_err());
    }

    #[test]
    fn test_validate_create_order_batch_size() {
        let items: Vec<NewOrderItem> = (0..101).map(|_| item(1)).collect();
        assert!(matches!(
            validate_create_order(&request_with("o1", items)),
            Err(ValidationError::TooMany { .. })
        ));
    }
}
