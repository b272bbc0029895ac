//! # comanda-db: Persistence Layer for the Comanda Order Engine
//!
//! This crate provides database access for the Comanda order lifecycle
//! engine. It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Comanda Data Flow                                │
//! │                                                                         │
//! │  Caller (HTTP handler, desktop command, test)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    comanda-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐ │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │ │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │ │   │
//! │  │   │               │    │ OrderRepo      │    │              │ │   │
//! │  │   │ SqlitePool    │◄───│ OrderItemRepo  │    │ 001_init.sql │ │   │
//! │  │   │ Management    │    │ TableRepo      │    │              │ │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   Pure rules (status machines, validation, money) come from   │   │
//! │  │   comanda-core; this crate adds transactions and persistence. │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL mode, foreign keys on)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and engine error types
//! - [`repository`] - Repository implementations (order, order_item, table)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use comanda_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/comanda.db")).await?;
//!
//! let outcome = db.orders().create_or_grow(&request).await?;
//! db.orders().set_payment_method(&outcome.order_id, PaymentMethod::Card).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, EngineError, EngineResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::order::OrderRepository;
pub use repository::order_item::OrderItemRepository;
pub use repository::table::TableRepository;
