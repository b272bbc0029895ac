//! # Repository Module
//!
//! Database repository implementations for the Comanda order engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Caller (HTTP layer, out of scope)                                     │
//! │       │                                                                 │
//! │       │  db.orders().create_or_grow(&request)                          │
//! │       ▼                                                                 │
//! │  OrderRepository                                                        │
//! │  ├── create_or_grow(&self, req)      ← one transaction                 │
//! │  ├── transition_status(&self, ...)   ← one transaction                 │
//! │  └── set_payment_method(&self, ...)  ← one transaction                 │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  Every lifecycle operation checks out one pooled connection, runs      │
//! │  BEGIN ... COMMIT on it, and rolls back on any error. Partial writes   │
//! │  are never visible.                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`table::TableRepository`] - Dining-table reads and occupancy flips
//! - [`order::OrderRepository`] - Order aggregate creation and order status machine
//! - [`order_item::OrderItemRepository`] - Item status machine and audit history

pub mod order;
pub mod order_item;
pub mod table;

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod testutil {
    use crate::pool::{Database, DbConfig};

    /// Fresh in-memory database with migrations applied.
    pub(crate) async fn test_db() -> Database {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("comanda_db=debug")
            .try_init();

        Database::new(DbConfig::in_memory())
            .await
            .expect("in-memory database")
    }
}
