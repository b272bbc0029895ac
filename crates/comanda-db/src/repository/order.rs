//! # Order Repository
//!
//! The transactional order engine: aggregate creation/append and the
//! order-level status machine.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE (or APPEND)                                                 │
//! │     └── create_or_grow() → Order { status: NotPaid }                   │
//! │         ├── dine-in: table must be Available, flips to Occupied        │
//! │         ├── items + option selections inserted (status: Pending)       │
//! │         └── total_amount recomputed over every non-cancelled item      │
//! │                                                                         │
//! │  2. CLOSE                                                              │
//! │     ├── transition_status(Paid)      → stamps payment_date             │
//! │     ├── transition_status(Cancelled)                                   │
//! │     └── set_payment_method(method)   → forces Paid                     │
//! │         └── all three release the table (if any) to Available          │
//! │                                                                         │
//! │  Every operation is ONE transaction: on any failure nothing at all     │
//! │  is written, including the table occupancy flip.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, EngineResult};
use crate::repository::table;
use comanda_core::lifecycle::check_order_transition;
use comanda_core::validation::validate_create_order;
use comanda_core::{
    CoreError, CreateOrderOutcome, CreateOrderRequest, NewOrderItem, Order, OrderItemStatus,
    OrderStatus, PaymentMethod, TableStatus,
};

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Creates an order with its items, or appends items to an existing one.
    ///
    /// ## Append Semantics
    /// `order_id` is caller-supplied. The first call with a given id creates
    /// the order; later calls with the same id append their items to it and
    /// ignore `table_ref`/`customer_name`, so resubmitting a growing order
    /// never duplicates it and never flips the table twice.
    ///
    /// ## Preconditions (dine-in only)
    /// The referenced table must exist and be `Available`; otherwise the
    /// call fails with no writes at all.
    ///
    /// ## Atomicity
    /// Order row, table flip, items, options, and the total update commit
    /// together or not at all.
    pub async fn create_or_grow(&self, req: &CreateOrderRequest) -> EngineResult<CreateOrderOutcome> {
        // Rejected before any transaction is opened.
        validate_create_order(req).map_err(CoreError::from)?;

        debug!(order_id = %req.order_id, items = req.items.len(), "create_or_grow");

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let existing: Option<(String,)> =
            sqlx::query_as(r#"SELECT id FROM orders WHERE id = ?1"#)
                .bind(&req.order_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?;

        let created = existing.is_none();
        if created {
            let table_id = req.table_ref.table_id();

            // Takeaway never touches a table row.
            if let Some(table_id) = table_id {
                let dining_table = table::fetch_tx(&mut tx, table_id)
                    .await?
                    .ok_or_else(|| CoreError::TableNotFound(table_id.to_string()))?;

                if dining_table.status != TableStatus::Available {
                    return Err(CoreError::TableUnavailable {
                        table_id: table_id.to_string(),
                    }
                    .into());
                }
            }

            sqlx::query(
                r#"
                INSERT INTO orders
                    (id, table_id, customer_name, order_type, status,
                     total_amount_cents, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
                "#,
            )
            .bind(&req.order_id)
            .bind(table_id)
            .bind(&req.customer_name)
            .bind(req.table_ref.order_type())
            .bind(OrderStatus::NotPaid)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

            if let Some(table_id) = table_id {
                table::set_status_tx(&mut tx, table_id, TableStatus::Occupied).await?;
            }
        }

        for item in &req.items {
            insert_item_tx(&mut tx, &req.order_id, item).await?;
        }

        // Authoritative total: recomputed over every item ever recorded for
        // the order, never accumulated incrementally.
        let total = recompute_total_tx(&mut tx, &req.order_id).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %req.order_id,
            created,
            items = req.items.len(),
            total_cents = total,
            "Order items recorded"
        );

        Ok(CreateOrderOutcome {
            order_id: req.order_id.clone(),
            created,
        })
    }

    /// Moves an order through the status machine.
    ///
    /// `NotPaid → Paid` stamps `payment_date`; reaching a terminal status
    /// releases the order's table (if any) in the same transaction, so a
    /// closed order never leaves its table `Occupied`.
    pub async fn transition_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
    ) -> EngineResult<OrderStatus> {
        debug!(order_id = %order_id, new_status = ?new_status, "transition_status");

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let row: Option<(OrderStatus, Option<String>)> =
            sqlx::query_as(r#"SELECT status, table_id FROM orders WHERE id = ?1"#)
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?;

        let (current, table_id) =
            row.ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

        check_order_transition(current, new_status)?;

        let result = if new_status == OrderStatus::Paid {
            sqlx::query(
                r#"UPDATE orders SET status = ?2, payment_date = ?3 WHERE id = ?1"#,
            )
            .bind(order_id)
            .bind(new_status)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?
        } else {
            sqlx::query(r#"UPDATE orders SET status = ?2 WHERE id = ?1"#)
                .bind(order_id)
                .bind(new_status)
                .execute(&mut *tx)
                .await
                .map_err(DbError::from)?
        };

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id).into());
        }

        if new_status.is_terminal() {
            if let Some(table_id) = table_id.as_deref() {
                table::set_status_tx(&mut tx, table_id, TableStatus::Available).await?;
            }
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(order_id = %order_id, from = ?current, to = ?new_status, "Order status updated");

        Ok(new_status)
    }

    /// Records how the order was paid and closes it.
    ///
    /// Sets `payment_method`, forces `status = Paid` (stamping
    /// `payment_date`), and releases the table if any. One transaction,
    /// same as [`transition_status`](Self::transition_status).
    pub async fn set_payment_method(
        &self,
        order_id: &str,
        method: PaymentMethod,
    ) -> EngineResult<()> {
        debug!(order_id = %order_id, method = ?method, "set_payment_method");

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let row: Option<(OrderStatus, Option<String>)> =
            sqlx::query_as(r#"SELECT status, table_id FROM orders WHERE id = ?1"#)
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?;

        let (_, table_id) = row.ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_method = ?2, status = ?3, payment_date = ?4
            WHERE id = ?1
            "#,
        )
        .bind(order_id)
        .bind(method)
        .bind(OrderStatus::Paid)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id).into());
        }

        if let Some(table_id) = table_id.as_deref() {
            table::set_status_tx(&mut tx, table_id, TableStatus::Available).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(order_id = %order_id, method = ?method, "Payment method recorded, order paid");

        Ok(())
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> EngineResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT
                id,
                table_id,
                customer_name,
                order_type,
                status,
                payment_method,
                payment_date,
                total_amount_cents,
                created_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(order)
    }
}

// =============================================================================
// Transaction-Scoped Helpers
// =============================================================================

/// Inserts one line item and its option selections on the caller's
/// transaction.
async fn insert_item_tx(
    conn: &mut SqliteConnection,
    order_id: &str,
    item: &NewOrderItem,
) -> EngineResult<()> {
    let item_id = generate_order_item_id();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO order_items
            (id, order_id, menu_id, quantity, unit_price_cents, note, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item_id)
    .bind(order_id)
    .bind(item.menu_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(&item.note)
    .bind(OrderItemStatus::Pending)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(DbError::from)?;

    // The option list may be empty.
    for option in &item.options {
        sqlx::query(
            r#"
            INSERT INTO order_item_options
                (id, order_item_id, menu_option_id, additional_price_cents)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(generate_option_id())
        .bind(&item_id)
        .bind(option.menu_option_id)
        .bind(option.additional_price_cents)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;
    }

    Ok(())
}

/// Recomputes and persists the order total on the caller's transaction.
///
/// The total is the sum over *non-cancelled* items of
/// `unit_price × quantity` plus the item's option surcharges. It is derived
/// from the stored rows every time; nothing is ever accumulated in place.
pub(crate) async fn recompute_total_tx(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> EngineResult<i64> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(
            oi.unit_price_cents * oi.quantity
            + COALESCE((
                SELECT SUM(oo.additional_price_cents)
                FROM order_item_options oo
                WHERE oo.order_item_id = oi.id
            ), 0)
        ), 0)
        FROM order_items oi
        WHERE oi.order_id = ?1
          AND oi.status != 'cancelled'
        "#,
    )
    .bind(order_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(DbError::from)?;

    sqlx::query(r#"UPDATE orders SET total_amount_cents = ?2 WHERE id = ?1"#)
        .bind(order_id)
        .bind(total)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

    Ok(total)
}

// =============================================================================
// ID Generation
// =============================================================================

/// Generates a new order item ID.
pub fn generate_order_item_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new option selection ID.
pub fn generate_option_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::pool::Database;
    use crate::repository::testutil::test_db;
    use comanda_core::{NewItemOption, OrderType, TableRef};

    fn item(menu_id: i64, quantity: i64, unit_price_cents: i64) -> NewOrderItem {
        NewOrderItem {
            menu_id,
            quantity,
            unit_price_cents,
            note: None,
            options: Vec::new(),
        }
    }

    fn request(order_id: &str, table_ref: TableRef, items: Vec<NewOrderItem>) -> CreateOrderRequest {
        CreateOrderRequest {
            order_id: order_id.to_string(),
            customer_name: None,
            table_ref,
            items,
        }
    }

    async fn table_status(db: &Database, id: &str) -> TableStatus {
        db.tables().get_by_id(id).await.unwrap().unwrap().status
    }

    async fn item_count(db: &Database, order_id: &str) -> i64 {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM order_items WHERE order_id = ?1"#)
            .bind(order_id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    /// Dine-in order: 2 × $10.00 with a $1.50 option totals $21.50, the
    /// table flips to Occupied, and paying releases it with a payment date.
    #[tokio::test]
    async fn test_dine_in_order_total_and_table_flow() {
        let db = test_db().await;
        let table = db.tables().create(1).await.unwrap();

        let mut burger = item(5, 2, 1000);
        burger.options.push(NewItemOption {
            menu_option_id: 9,
            additional_price_cents: 150,
        });

        let outcome = db
            .orders()
            .create_or_grow(&request("O1", TableRef::Table(table.id.clone()), vec![burger]))
            .await
            .unwrap();

        assert!(outcome.created);

        let order = db.orders().get_by_id("O1").await.unwrap().unwrap();
        assert_eq!(order.order_type, OrderType::DineIn);
        assert_eq!(order.status, OrderStatus::NotPaid);
        assert_eq!(order.total_amount_cents, 2150);
        assert_eq!(table_status(&db, &table.id).await, TableStatus::Occupied);

        db.orders()
            .transition_status("O1", OrderStatus::Paid)
            .await
            .unwrap();

        let order = db.orders().get_by_id("O1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.payment_date.is_some());
        assert_eq!(table_status(&db, &table.id).await, TableStatus::Available);
    }

    /// Takeaway orders resolve to a NULL table and work with no table rows
    /// in the database at all.
    #[tokio::test]
    async fn test_takeaway_never_touches_tables() {
        let db = test_db().await;

        let outcome = db
            .orders()
            .create_or_grow(&request("T1", TableRef::Takeaway, vec![item(2, 1, 450)]))
            .await
            .unwrap();

        assert!(outcome.created);

        let order = db.orders().get_by_id("T1").await.unwrap().unwrap();
        assert_eq!(order.order_type, OrderType::Takeaway);
        assert_eq!(order.table_id, None);
        assert_eq!(order.total_amount_cents, 450);
    }

    /// Two calls with the same order id yield one order whose total covers
    /// both batches, and exactly one occupancy flip.
    #[tokio::test]
    async fn test_idempotent_append() {
        let db = test_db().await;
        let table = db.tables().create(1).await.unwrap();
        let other = db.tables().create(2).await.unwrap();

        db.orders()
            .create_or_grow(&request(
                "O1",
                TableRef::Table(table.id.clone()),
                vec![item(5, 2, 1000)],
            ))
            .await
            .unwrap();

        // The append names a different table; it must be ignored.
        let outcome = db
            .orders()
            .create_or_grow(&request(
                "O1",
                TableRef::Table(other.id.clone()),
                vec![item(6, 1, 700)],
            ))
            .await
            .unwrap();

        assert!(!outcome.created);

        let order = db.orders().get_by_id("O1").await.unwrap().unwrap();
        assert_eq!(order.table_id.as_deref(), Some(table.id.as_str()));
        assert_eq!(order.total_amount_cents, 2000 + 700);
        assert_eq!(item_count(&db, "O1").await, 2);

        assert_eq!(table_status(&db, &table.id).await, TableStatus::Occupied);
        assert_eq!(table_status(&db, &other.id).await, TableStatus::Available);
    }

    #[tokio::test]
    async fn test_occupied_table_rejected_with_no_writes() {
        let db = test_db().await;
        let table = db.tables().create(1).await.unwrap();

        db.orders()
            .create_or_grow(&request(
                "O1",
                TableRef::Table(table.id.clone()),
                vec![item(5, 1, 1000)],
            ))
            .await
            .unwrap();

        let err = db
            .orders()
            .create_or_grow(&request(
                "O2",
                TableRef::Table(table.id.clone()),
                vec![item(6, 1, 700)],
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(CoreError::TableUnavailable { .. })
        ));
        assert_eq!(err.http_status(), 400);
        assert!(db.orders().get_by_id("O2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_table_rejected() {
        let db = test_db().await;

        let err = db
            .orders()
            .create_or_grow(&request(
                "O1",
                TableRef::Table("ghost".to_string()),
                vec![item(5, 1, 1000)],
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(CoreError::TableNotFound(_))
        ));
        assert!(db.orders().get_by_id("O1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_validation_rejected_before_transaction() {
        let db = test_db().await;

        let err = db
            .orders()
            .create_or_grow(&request("O1", TableRef::Takeaway, vec![]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(CoreError::Validation(_))
        ));
        assert_eq!(err.http_status(), 400);
    }

    /// A failing insert mid-batch rolls back the entire call: no order, no
    /// items, no occupancy flip. The negative unit price slips past input
    /// validation and trips the schema CHECK constraint on the second item.
    #[tokio::test]
    async fn test_create_rolls_back_whole_batch() {
        let db = test_db().await;
        let table = db.tables().create(1).await.unwrap();

        let err = db
            .orders()
            .create_or_grow(&request(
                "O1",
                TableRef::Table(table.id.clone()),
                vec![item(5, 1, 1000), item(6, 1, -100)],
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Storage(DbError::CheckViolation { .. })
        ));
        assert_eq!(err.http_status(), 500);

        assert!(db.orders().get_by_id("O1").await.unwrap().is_none());
        assert_eq!(item_count(&db, "O1").await, 0);
        assert_eq!(table_status(&db, &table.id).await, TableStatus::Available);
    }

    /// A failing append leaves the order exactly as it was before the call.
    #[tokio::test]
    async fn test_append_rolls_back_whole_batch() {
        let db = test_db().await;

        db.orders()
            .create_or_grow(&request("O1", TableRef::Takeaway, vec![item(5, 2, 1000)]))
            .await
            .unwrap();

        let err = db
            .orders()
            .create_or_grow(&request(
                "O1",
                TableRef::Takeaway,
                vec![item(6, 1, 700), item(7, 1, -1)],
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Storage(_)));

        let order = db.orders().get_by_id("O1").await.unwrap().unwrap();
        assert_eq!(order.total_amount_cents, 2000);
        assert_eq!(item_count(&db, "O1").await, 1);
    }

    #[tokio::test]
    async fn test_cancel_releases_table() {
        let db = test_db().await;
        let table = db.tables().create(1).await.unwrap();

        db.orders()
            .create_or_grow(&request(
                "O1",
                TableRef::Table(table.id.clone()),
                vec![item(5, 1, 1000)],
            ))
            .await
            .unwrap();

        db.orders()
            .transition_status("O1", OrderStatus::Cancelled)
            .await
            .unwrap();

        let order = db.orders().get_by_id("O1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.payment_date.is_none());
        assert_eq!(table_status(&db, &table.id).await, TableStatus::Available);
    }

    #[tokio::test]
    async fn test_transition_unknown_order() {
        let db = test_db().await;

        let err = db
            .orders()
            .transition_status("ghost", OrderStatus::Paid)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(CoreError::OrderNotFound(_))
        ));
        assert_eq!(err.http_status(), 404);
    }

    #[tokio::test]
    async fn test_transition_out_of_terminal_rejected() {
        let db = test_db().await;

        db.orders()
            .create_or_grow(&request("O1", TableRef::Takeaway, vec![item(5, 1, 1000)]))
            .await
            .unwrap();
        db.orders()
            .transition_status("O1", OrderStatus::Paid)
            .await
            .unwrap();

        let err = db
            .orders()
            .transition_status("O1", OrderStatus::Cancelled)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(CoreError::InvalidOrderTransition { .. })
        ));
        assert_eq!(err.http_status(), 409);
    }

    #[tokio::test]
    async fn test_set_payment_method() {
        let db = test_db().await;
        let table = db.tables().create(1).await.unwrap();

        db.orders()
            .create_or_grow(&request(
                "O1",
                TableRef::Table(table.id.clone()),
                vec![item(5, 1, 1000)],
            ))
            .await
            .unwrap();

        db.orders()
            .set_payment_method("O1", PaymentMethod::Card)
            .await
            .unwrap();

        let order = db.orders().get_by_id("O1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_method, Some(PaymentMethod::Card));
        assert!(order.payment_date.is_some());
        assert_eq!(table_status(&db, &table.id).await, TableStatus::Available);
    }

    #[tokio::test]
    async fn test_set_payment_method_unknown_order() {
        let db = test_db().await;

        let err = db
            .orders()
            .set_payment_method("ghost", PaymentMethod::Cash)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(CoreError::OrderNotFound(_))
        ));
    }
}
