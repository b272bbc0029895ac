//! # comanda-core: Pure Business Logic for the Comanda Order Engine
//!
//! This crate is the **heart** of Comanda, a restaurant point-of-sale
//! backend. It contains all business logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Comanda Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               HTTP layer / POS frontend (out of scope)          │   │
//! │  │    create order ──► pay order ──► serve/cancel items            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ comanda-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ lifecycle │  │ validation│  │   │
//! │  │   │   Order   │  │   Money   │  │  status   │  │   rules   │  │   │
//! │  │   │ OrderItem │  │  (cents)  │  │ machines  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  comanda-db (Database Layer)                    │   │
//! │  │          SQLite queries, migrations, transactional engine       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, OrderItem, DiningTable, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`lifecycle`] - Order and order-item status machines
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Closed Status Sets**: `status` columns are enums, never free strings;
//!    transitions not listed in the tables of [`lifecycle`] are rejected

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod lifecycle;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use comanda_core::Money` instead of
// `use comanda_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum items accepted in a single create/append call
///
/// ## Business Reason
/// Prevents runaway batches and keeps single transactions reasonably sized.
/// Can be made configurable per-venue in future versions.
pub const MAX_BATCH_ITEMS: usize = 100;

/// Maximum quantity of a single line item
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 200 instead of 2).
pub const MAX_ITEM_QUANTITY: i64 = 999;
