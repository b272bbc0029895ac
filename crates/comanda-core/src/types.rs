//! # Domain Types
//!
//! Core domain types used throughout the Comanda order engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   DiningTable   │   │      Order      │   │   OrderItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id (caller's)  │   │  id (UUID)      │       │
//! │  │  number (uniq)  │◄──│  table_id (FK)  │◄──│  order_id (FK)  │       │
//! │  │  status         │   │  status         │   │  status         │       │
//! │  └─────────────────┘   │  total_amount   │   │  unit_price     │       │
//! │                        └─────────────────┘   └────────┬────────┘       │
//! │                                                       │                 │
//! │                            ┌──────────────────┐  ┌────▼─────────────┐  │
//! │                            │ OrderItemHistory │  │ OrderItemOption  │  │
//! │                            │  append-only     │  │  immutable       │  │
//! │                            └──────────────────┘  └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity Pattern
//! - `Order.id` is supplied by the caller (the POS front-of-house generates
//!   it) so that repeated submissions append to the same order.
//! - All other generated ids are UUID v4 strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Table Status
// =============================================================================

/// Occupancy state of a dining table.
///
/// Mutated only by the order engine: creating a dine-in order flips the
/// table to `Occupied`; paying or cancelling the order releases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Free for a new dine-in order.
    Available,
    /// Bound to an open order.
    Occupied,
}

impl Default for TableStatus {
    fn default() -> Self {
        TableStatus::Available
    }
}

// =============================================================================
// Dining Table
// =============================================================================

/// A physical table in the restaurant.
///
/// Table CRUD is owned by an out-of-scope collaborator; the engine only
/// reads tables and toggles their `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DiningTable {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-visible table number, unique per venue.
    pub number: i64,

    /// Current occupancy state.
    pub status: TableStatus,

    /// When the table was created.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Type / Status / Payment Method
// =============================================================================

/// Placement mode of an order: whether a table is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Placed against a dining table.
    DineIn,
    /// No table involved.
    Takeaway,
}

/// The status of an order.
///
/// Transition rules live in [`crate::lifecycle`]; `Paid` and `Cancelled`
/// are terminal for this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order is open, awaiting payment.
    NotPaid,
    /// Order has been paid.
    Paid,
    /// Order was cancelled.
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::NotPaid
    }
}

/// How an order was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// QR / wallet payment.
    Mobile,
}

// =============================================================================
// Order
// =============================================================================

/// An order placed against a table or as takeaway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    /// Caller-supplied identifier; repeated create calls with the same id
    /// append items to this order.
    pub id: String,

    /// Table the order is bound to; None for takeaway.
    pub table_id: Option<String>,

    /// Optional customer name for pickup calls.
    pub customer_name: Option<String>,

    /// Dine-in or takeaway; fixed at creation.
    pub order_type: OrderType,

    /// Current lifecycle status.
    pub status: OrderStatus,

    /// Set by the payment operation.
    pub payment_method: Option<PaymentMethod>,

    /// Stamped when the order is paid.
    pub payment_date: Option<DateTime<Utc>>,

    /// Authoritative total in cents: sum over non-cancelled items of
    /// unit_price × quantity plus option surcharges. Recomputed, never
    /// drifted.
    pub total_amount_cents: i64,

    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Returns the total amount as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    /// Checks whether the order still holds a table.
    pub fn occupies_table(&self) -> bool {
        self.table_id.is_some() && self.status == OrderStatus::NotPaid
    }
}

// =============================================================================
// Order Item Status
// =============================================================================

/// Kitchen-side status of a single line item.
///
/// `Served` and `Cancelled` are terminal; the forward-only transition table
/// lives in [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderItemStatus {
    /// Recorded, not yet picked up by the kitchen.
    Pending,
    /// Being prepared.
    Preparing,
    /// Ready for pickup/serving.
    Ready,
    /// Delivered to the guest.
    Served,
    /// Cancelled; excluded from the order total.
    Cancelled,
}

impl Default for OrderItemStatus {
    fn default() -> Self {
        OrderItemStatus::Pending
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item in an order.
///
/// Items are never deleted; cancellation is a status transition so the
/// audit history stays complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    /// Menu entry this item was ordered from.
    pub menu_id: i64,
    pub quantity: i64,
    /// Unit price in cents at ordering time (frozen).
    pub unit_price_cents: i64,
    /// Free-text request ("no onions").
    pub note: Option<String>,
    pub status: OrderItemStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Line total before option surcharges (unit_price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Order Item Option
// =============================================================================

/// An option selection attached to a line item ("extra cheese").
/// Written once at item-creation time, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItemOption {
    pub id: String,
    pub order_item_id: String,
    pub menu_option_id: i64,
    /// Surcharge in cents; zero for free options.
    pub additional_price_cents: i64,
}

impl OrderItemOption {
    /// Returns the surcharge as Money.
    #[inline]
    pub fn additional_price(&self) -> Money {
        Money::from_cents(self.additional_price_cents)
    }
}

// =============================================================================
// Actor Role
// =============================================================================

/// The caller's identity class, used to restrict item-status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// A guest acting on their own order; may only cancel pending items.
    Customer,
    /// Waiters, kitchen, managers; full access to the transition table.
    Staff,
}

// =============================================================================
// Order Item History
// =============================================================================

/// One row of the append-only audit log: who changed an item's status,
/// from what, to what, when, and why. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItemHistory {
    pub id: i64,
    pub order_item_id: String,
    pub previous_status: OrderItemStatus,
    pub new_status: OrderItemStatus,
    pub changed_by: ActorRole,
    /// Empty string when the caller gave no reason.
    pub change_reason: String,
    pub changed_at: DateTime<Utc>,
}

// =============================================================================
// Request Types
// =============================================================================

/// Destination of a new order: a concrete table or the takeaway counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRef {
    /// No table; `table_id` resolves to None.
    Takeaway,
    /// A dine-in order bound to the given table id.
    Table(String),
}

impl TableRef {
    /// Resolves the placement mode.
    pub fn order_type(&self) -> OrderType {
        match self {
            TableRef::Takeaway => OrderType::Takeaway,
            TableRef::Table(_) => OrderType::DineIn,
        }
    }

    /// Resolves the table id; None for takeaway.
    pub fn table_id(&self) -> Option<&str> {
        match self {
            TableRef::Takeaway => None,
            TableRef::Table(id) => Some(id.as_str()),
        }
    }
}

/// One option selection in a create/append request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItemOption {
    pub menu_option_id: i64,
    /// Defaults to zero when omitted on the wire.
    #[serde(default)]
    pub additional_price_cents: i64,
}

/// One line item in a create/append request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub menu_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub note: Option<String>,
    /// May be empty.
    #[serde(default)]
    pub options: Vec<NewItemOption>,
}

/// The create-or-append request for an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Caller-supplied order identifier.
    pub order_id: String,
    /// Ignored when appending to an existing order.
    #[serde(default)]
    pub customer_name: Option<String>,
    pub table_ref: TableRef,
    pub items: Vec<NewOrderItem>,
}

/// Result of a create-or-append call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderOutcome {
    pub order_id: String,
    /// True when this call created the order, false when it appended
    /// to an existing one.
    pub created: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================
