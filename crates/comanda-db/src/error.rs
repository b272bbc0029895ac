//! # Database Error Types
//!
//! Error types for database operations and for the order-engine operations
//! built on top of them.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError (this module) ← Merges DbError with CoreError and         │
//! │       │                      exposes the HTTP category                 │
//! │       ▼                                                                 │
//! │  HTTP layer (out of scope) maps http_status() onto the response        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use comanda_core::{CoreError, ValidationError};

// =============================================================================
// DbError
// =============================================================================

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and operator feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate table number
    /// - Any UNIQUE index violation
    #[error("Duplicate {field}: already exists")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (bad status string, negative price, ...).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

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
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
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

                // SQLite constraint messages:
                // UNIQUE:  "UNIQUE constraint failed: <table>.<column>"
                // FK:      "FOREIGN KEY constraint failed"
                // CHECK:   "CHECK constraint failed: <detail>"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { field }
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

/// Result type for plain database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// EngineError
// =============================================================================

/// Failure of an order-lifecycle operation.
///
/// Every operation either violates a business rule (`Domain`) or hits the
/// storage layer (`Storage`); callers get a stable category plus a
/// human-readable message either way.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule violation or bad input.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Underlying storage failure of any kind.
    #[error(transparent)]
    Storage(#[from] DbError),
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Storage(DbError::from(err))
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Domain(CoreError::Validation(err))
    }
}

impl EngineError {
    /// HTTP status category for the (out-of-scope) HTTP layer.
    ///
    /// ```text
    /// ValidationError / bad table reference  → 400
    /// Role-based denial                      → 403
    /// Missing order / item                   → 404
    /// Transition not enumerated              → 409
    /// Storage failure                        → 500
    /// ```
    pub fn http_status(&self) -> u16 {
        match self {
            EngineError::Domain(core) => match core {
                CoreError::Validation(_) => 400,
                CoreError::TableNotFound(_) | CoreError::TableUnavailable { .. } => 400,
                CoreError::ForbiddenItemTransition { .. } => 403,
                CoreError::OrderNotFound(_) | CoreError::ItemNotFound(_) => 404,
                CoreError::InvalidOrderTransition { .. }
                | CoreError::InvalidItemTransition { .. } => 409,
            },
            EngineError::Storage(_) => 500,
        }
    }
}

/// Result type for order-engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
