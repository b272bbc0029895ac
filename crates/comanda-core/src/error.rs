//! # Error Types
//!
//! Domain-specific error types for comanda-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  comanda-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  comanda-db errors (separate crate)                                    │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── EngineError      - CoreError | DbError, carries HTTP category     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → HTTP layer          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (order id, statuses, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::types::{ActorRole, OrderItemStatus, OrderStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Order cannot be found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Order item cannot be found.
    #[error("Order item not found: {0}")]
    ItemNotFound(String),

    /// Referenced dining table does not exist.
    ///
    /// ## When This Occurs
    /// - A dine-in order references a table id that was never created
    /// - The table was deleted by the table-management collaborator
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// The table is already occupied by another order.
    ///
    /// ## User Workflow
    /// ```text
    /// Create dine-in order on table T1
    ///      │
    ///      ▼
    /// T1.status = Occupied?
    ///      │
    ///      ▼
    /// TableUnavailable { table_id: "T1" }
    ///      │
    ///      ▼
    /// UI shows: "Table T1 is occupied"
    /// ```
    #[error("Table {table_id} is not available")]
    TableUnavailable { table_id: String },

    /// The requested order-level status change is not in the transition table.
    ///
    /// ## When This Occurs
    /// - Paying an already paid order
    /// - Cancelling a paid order
    /// - Any transition out of a terminal status
    #[error("Order cannot move from {from:?} to {to:?}")]
    InvalidOrderTransition { from: OrderStatus, to: OrderStatus },

    /// The requested item-level status change is not in the transition table.
    #[error("Order item cannot move from {from:?} to {to:?}")]
    InvalidItemTransition {
        from: OrderItemStatus,
        to: OrderItemStatus,
    },

    /// The actor's role does not allow the requested item transition.
    ///
    /// Customers may only cancel items that are still `Pending`.
    #[error("{role:?} may only cancel pending items (item is {current:?})")]
    ForbiddenItemTransition {
        role: ActorRole,
        current: OrderItemStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any transaction is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Collection exceeds the allowed size.
    #[error("{field} cannot contain more than {max} entries")]
    TooMany { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
