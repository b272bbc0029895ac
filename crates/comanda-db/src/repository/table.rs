//! # Table Repository
//!
//! Dining-table persistence and the availability tracker.
//!
//! Table CRUD proper belongs to an out-of-scope collaborator; this
//! repository exists so the order engine can check availability and flip
//! occupancy, and so tests can seed tables. The occupancy flips used by the
//! order lifecycle run through the `*_tx` helpers so they join the calling
//! operation's transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use comanda_core::{DiningTable, TableStatus};

/// Repository for dining-table database operations.
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
}

impl TableRepository {
    /// Creates a new TableRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository { pool }
    }

    /// Creates a table with the given number, initially `Available`.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` when the number is already taken.
    pub async fn create(&self, number: i64) -> DbResult<DiningTable> {
        let table = DiningTable {
            id: Uuid::new_v4().to_string(),
            number,
            status: TableStatus::Available,
            created_at: Utc::now(),
        };

        debug!(id = %table.id, number = table.number, "Creating table");

        sqlx::query(
            r#"
            INSERT INTO tables (id, number, status, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&table.id)
        .bind(table.number)
        .bind(table.status)
        .bind(table.created_at)
        .execute(&self.pool)
        .await?;

        Ok(table)
    }

    /// Gets a table by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DiningTable>> {
        let table = sqlx::query_as::<_, DiningTable>(
            r#"
            SELECT id, number, status, created_at
            FROM tables
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(table)
    }

    /// Sets a table's occupancy status outside any order operation.
    ///
    /// The order lifecycle itself uses [`set_status_tx`] so the flip commits
    /// or rolls back together with the order writes.
    pub async fn set_status(&self, id: &str, status: TableStatus) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        set_status_tx(&mut conn, id, status).await
    }
}

// =============================================================================
// Transaction-Scoped Helpers
// =============================================================================
// Free functions over a borrowed connection so the order operations can run
// them inside their own BEGIN ... COMMIT.

/// Fetches a table on the caller's connection/transaction.
pub(crate) async fn fetch_tx(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<DiningTable>> {
    let table = sqlx::query_as::<_, DiningTable>(
        r#"
        SELECT id, number, status, created_at
        FROM tables
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(table)
}

/// Flips a table's occupancy on the caller's connection/transaction.
pub(crate) async fn set_status_tx(
    conn: &mut SqliteConnection,
    id: &str,
    status: TableStatus,
) -> DbResult<()> {
    debug!(table_id = %id, status = ?status, "Updating table status");

    let result = sqlx::query(
        r#"
        UPDATE tables SET status = ?2 WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(status)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Table", id));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
