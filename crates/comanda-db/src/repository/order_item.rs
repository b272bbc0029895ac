//! # Order Item Repository
//!
//! The per-item status machine and its audit trail.
//!
//! ## Item Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Item Status Flow                                   │
//! │                                                                         │
//! │   Pending ──► Preparing ──► Ready ──► Served    (staff, forward only)  │
//! │      │            │           │                                         │
//! │      └────────────┴───────────┴──────► Cancelled                       │
//! │                                                                         │
//! │   Customers may only cancel, and only while the item is still          │
//! │   Pending. Staff may skip stages forward but never move backward.     │
//! │                                                                         │
//! │   Every successful transition appends ONE history row (who, from,      │
//! │   to, why, when) in the same transaction as the status update, so      │
//! │   the audit trail can never disagree with the item.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult, EngineResult};
use crate::repository::order::recompute_total_tx;
use comanda_core::lifecycle::resolve_item_transition;
use comanda_core::{ActorRole, CoreError, OrderItem, OrderItemHistory, OrderItemOption, OrderItemStatus};

/// Repository for order-item database operations.
#[derive(Debug, Clone)]
pub struct OrderItemRepository {
    pool: SqlitePool,
}

impl OrderItemRepository {
    /// Creates a new OrderItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderItemRepository { pool }
    }

    /// Moves an item through the status machine on behalf of an actor.
    ///
    /// The effective new status depends on the actor's role: customers are
    /// always steered to `Cancelled` (and only from `Pending`), staff get
    /// the requested status when the machine allows it. The returned value
    /// is the status actually applied.
    ///
    /// In one transaction this:
    /// 1. Loads the item's current status
    /// 2. Resolves the transition for the actor
    /// 3. Appends the audit row
    /// 4. Updates the item
    /// 5. Recomputes the order total when the item was cancelled
    pub async fn transition_status(
        &self,
        order_item_id: &str,
        requested: OrderItemStatus,
        actor: ActorRole,
        change_reason: Option<&str>,
    ) -> EngineResult<OrderItemStatus> {
        debug!(
            order_item_id = %order_item_id,
            requested = ?requested,
            actor = ?actor,
            "transition item status"
        );

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let row: Option<(OrderItemStatus, String)> =
            sqlx::query_as(r#"SELECT status, order_id FROM order_items WHERE id = ?1"#)
                .bind(order_item_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?;

        let (current, order_id) =
            row.ok_or_else(|| CoreError::ItemNotFound(order_item_id.to_string()))?;

        let effective = resolve_item_transition(actor, current, requested)?;

        // Audit row first; both writes share the transaction anyway.
        sqlx::query(
            r#"
            INSERT INTO order_item_history
                (order_item_id, previous_status, new_status, changed_by, change_reason, changed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(order_item_id)
        .bind(current)
        .bind(effective)
        .bind(actor)
        .bind(change_reason.unwrap_or(""))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        sqlx::query(r#"UPDATE order_items SET status = ?2 WHERE id = ?1"#)
            .bind(order_item_id)
            .bind(effective)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

        // A cancelled item no longer counts toward the order total.
        if effective == OrderItemStatus::Cancelled {
            recompute_total_tx(&mut tx, &order_id).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_item_id = %order_item_id,
            from = ?current,
            to = ?effective,
            actor = ?actor,
            "Item status updated"
        );

        Ok(effective)
    }

    /// Gets all items of an order, oldest first.
    pub async fn items_for_order(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, menu_id, quantity, unit_price_cents, note, status, created_at
            FROM order_items
            WHERE order_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets the option selections recorded for an item.
    pub async fn options_for_item(&self, order_item_id: &str) -> DbResult<Vec<OrderItemOption>> {
        let options = sqlx::query_as::<_, OrderItemOption>(
            r#"
            SELECT id, order_item_id, menu_option_id, additional_price_cents
            FROM order_item_options
            WHERE order_item_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(options)
    }

    /// Gets the full audit history of an item, oldest first.
    pub async fn history_for_item(&self, order_item_id: &str) -> DbResult<Vec<OrderItemHistory>> {
        let history = sqlx::query_as::<_, OrderItemHistory>(
            r#"
            SELECT id, order_item_id, previous_status, new_status, changed_by, change_reason, changed_at
            FROM order_item_history
            WHERE order_item_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(history)
    }
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
    use comanda_core::{CreateOrderRequest, NewOrderItem, TableRef};

    async fn seed_order(db: &Database, order_id: &str, items: Vec<NewOrderItem>) {
        db.orders()
            .create_or_grow(&CreateOrderRequest {
                order_id: order_id.to_string(),
                customer_name: None,
                table_ref: TableRef::Takeaway,
                items,
            })
            .await
            .unwrap();
    }

    /// Looks an item up by its menu id; item ids are generated internally.
    async fn item_id(db: &Database, order_id: &str, menu_id: i64) -> String {
        db.order_items()
            .items_for_order(order_id)
            .await
            .unwrap()
            .into_iter()
            .find(|i| i.menu_id == menu_id)
            .unwrap()
            .id
    }

    fn item(menu_id: i64, quantity: i64, unit_price_cents: i64) -> NewOrderItem {
        NewOrderItem {
            menu_id,
            quantity,
            unit_price_cents,
            note: None,
            options: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_staff_walks_item_through_kitchen() {
        let db = test_db().await;
        seed_order(&db, "O1", vec![item(5, 1, 1000)]).await;
        let id = &item_id(&db, "O1", 5).await;

        for status in [
            OrderItemStatus::Preparing,
            OrderItemStatus::Ready,
            OrderItemStatus::Served,
        ] {
            let applied = db
                .order_items()
                .transition_status(id, status, ActorRole::Staff, None)
                .await
                .unwrap();
            assert_eq!(applied, status);
        }

        let history = db.order_items().history_for_item(id).await.unwrap();
        assert_eq!(history.len(), 3);

        // Each row's previous_status is the prior row's new_status.
        assert_eq!(history[0].previous_status, OrderItemStatus::Pending);
        assert_eq!(history[0].new_status, OrderItemStatus::Preparing);
        assert_eq!(history[1].previous_status, OrderItemStatus::Preparing);
        assert_eq!(history[1].new_status, OrderItemStatus::Ready);
        assert_eq!(history[2].previous_status, OrderItemStatus::Ready);
        assert_eq!(history[2].new_status, OrderItemStatus::Served);
        assert!(history.iter().all(|h| h.changed_by == ActorRole::Staff));
        assert!(history.iter().all(|h| h.change_reason.is_empty()));
    }

    #[tokio::test]
    async fn test_staff_cannot_move_backward() {
        let db = test_db().await;
        seed_order(&db, "O1", vec![item(5, 1, 1000)]).await;
        let id = &item_id(&db, "O1", 5).await;

        db.order_items()
            .transition_status(id, OrderItemStatus::Ready, ActorRole::Staff, None)
            .await
            .unwrap();

        let err = db
            .order_items()
            .transition_status(id, OrderItemStatus::Preparing, ActorRole::Staff, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(CoreError::InvalidItemTransition { .. })
        ));
        assert_eq!(err.http_status(), 409);

        // The refused attempt leaves no audit row behind.
        let history = db.order_items().history_for_item(id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    /// Whatever status a customer asks for, the applied transition is a
    /// cancellation, and it is recorded under their role.
    #[tokio::test]
    async fn test_customer_request_becomes_cancellation() {
        let db = test_db().await;
        seed_order(&db, "O1", vec![item(5, 1, 1000)]).await;
        let id = &item_id(&db, "O1", 5).await;

        let applied = db
            .order_items()
            .transition_status(id, OrderItemStatus::Served, ActorRole::Customer, Some("changed my mind"))
            .await
            .unwrap();

        assert_eq!(applied, OrderItemStatus::Cancelled);

        let history = db.order_items().history_for_item(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].changed_by, ActorRole::Customer);
        assert_eq!(history[0].new_status, OrderItemStatus::Cancelled);
        assert_eq!(history[0].change_reason, "changed my mind");
    }

    #[tokio::test]
    async fn test_customer_denied_once_preparation_started() {
        let db = test_db().await;
        seed_order(&db, "O1", vec![item(5, 1, 1000)]).await;
        let id = &item_id(&db, "O1", 5).await;

        db.order_items()
            .transition_status(id, OrderItemStatus::Preparing, ActorRole::Staff, None)
            .await
            .unwrap();

        let err = db
            .order_items()
            .transition_status(id, OrderItemStatus::Cancelled, ActorRole::Customer, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(CoreError::ForbiddenItemTransition { .. })
        ));
        assert_eq!(err.http_status(), 403);
    }

    #[tokio::test]
    async fn test_terminal_item_is_frozen() {
        let db = test_db().await;
        seed_order(&db, "O1", vec![item(5, 1, 1000)]).await;
        let id = &item_id(&db, "O1", 5).await;

        db.order_items()
            .transition_status(id, OrderItemStatus::Cancelled, ActorRole::Staff, Some("86'd"))
            .await
            .unwrap();

        let err = db
            .order_items()
            .transition_status(id, OrderItemStatus::Preparing, ActorRole::Staff, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(CoreError::InvalidItemTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let db = test_db().await;

        let err = db
            .order_items()
            .transition_status("ghost", OrderItemStatus::Preparing, ActorRole::Staff, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(CoreError::ItemNotFound(_))
        ));
        assert_eq!(err.http_status(), 404);
    }

    /// Cancelling one item drops it from the stored order total.
    #[tokio::test]
    async fn test_cancelled_item_leaves_total() {
        let db = test_db().await;
        seed_order(&db, "O1", vec![item(5, 2, 1000), item(6, 1, 700)]).await;

        let before = db.orders().get_by_id("O1").await.unwrap().unwrap();
        assert_eq!(before.total_amount_cents, 2700);

        let side = item_id(&db, "O1", 6).await;
        db.order_items()
            .transition_status(&side, OrderItemStatus::Cancelled, ActorRole::Staff, None)
            .await
            .unwrap();

        let after = db.orders().get_by_id("O1").await.unwrap().unwrap();
        assert_eq!(after.total_amount_cents, 2000);
    }

    #[tokio::test]
    async fn test_read_helpers() {
        let db = test_db().await;

        let mut with_option = item(5, 1, 1000);
        with_option.options.push(comanda_core::NewItemOption {
            menu_option_id: 9,
            additional_price_cents: 150,
        });
        seed_order(&db, "O1", vec![with_option, item(6, 1, 700)]).await;

        let items = db.order_items().items_for_order("O1").await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.status == OrderItemStatus::Pending));

        let burger = item_id(&db, "O1", 5).await;
        let side = item_id(&db, "O1", 6).await;

        let options = db.order_items().options_for_item(&burger).await.unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].menu_option_id, 9);
        assert_eq!(options[0].additional_price_cents, 150);

        assert!(db.order_items().options_for_item(&side).await.unwrap().is_empty());
        assert!(db.order_items().history_for_item(&burger).await.unwrap().is_empty());
    }
}
