//! # Lifecycle Module
//!
//! The two status machines of the order engine, encoded as explicit
//! transition tables instead of string comparisons scattered through SQL.
//!
//! ## Order Status Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │                     ┌──────────► Paid       (terminal, releases table)  │
//! │      NotPaid ───────┤                                                   │
//! │                     └──────────► Cancelled  (terminal, releases table)  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Order Item Status Machine (staff)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Pending ──► Preparing ──► Ready ──► Served   (terminal)               │
//! │      │            │           │                                         │
//! │      └────────────┴───────────┴─────► Cancelled (terminal)              │
//! │                                                                         │
//! │   Forward skips are allowed (a waiter may mark Pending → Served         │
//! │   directly); moving backwards is not.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Customers are restricted to `Pending → Cancelled`: whatever status they
//! request, the effective target is forced to `Cancelled`, and any item
//! past `Pending` is off limits.

use crate::error::{CoreError, CoreResult};
use crate::types::{ActorRole, OrderItemStatus, OrderStatus};

// =============================================================================
// Order Status Machine
// =============================================================================

impl OrderStatus {
    /// Checks whether this status is terminal for the engine.
    ///
    /// Terminal orders release their table and accept no further
    /// status-machine transitions.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    /// Checks whether `self → to` is an enumerated transition.
    pub const fn can_transition_to(self, to: OrderStatus) -> bool {
        matches!(
            (self, to),
            (
                OrderStatus::NotPaid,
                OrderStatus::Paid | OrderStatus::Cancelled
            )
        )
    }
}

/// Validates an order-level status transition.
///
/// ## Returns
/// * `Ok(())` - the transition is enumerated
/// * `Err(CoreError::InvalidOrderTransition)` - anything else, including
///   transitions out of a terminal status and self-transitions
pub fn check_order_transition(from: OrderStatus, to: OrderStatus) -> CoreResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidOrderTransition { from, to })
    }
}

// =============================================================================
// Order Item Status Machine
// =============================================================================

impl OrderItemStatus {
    /// Checks whether this status is terminal.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderItemStatus::Served | OrderItemStatus::Cancelled)
    }

    /// Position in the kitchen pipeline; transitions only move forward.
    const fn rank(self) -> u8 {
        match self {
            OrderItemStatus::Pending => 0,
            OrderItemStatus::Preparing => 1,
            OrderItemStatus::Ready => 2,
            OrderItemStatus::Served => 3,
            // Cancelled sits outside the pipeline; handled separately.
            OrderItemStatus::Cancelled => 4,
        }
    }

    /// Checks whether `self → to` is an enumerated staff transition.
    pub fn can_transition_to(self, to: OrderItemStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if to == OrderItemStatus::Cancelled {
            return true;
        }
        to.rank() > self.rank()
    }
}

/// Resolves an item-level status transition for a given actor.
///
/// ## Arguments
/// * `role` - who is asking
/// * `current` - the item's status as currently stored
/// * `requested` - the status the caller asked for
///
/// ## Returns
/// The *effective* target status:
/// * Customers: forced to `Cancelled` regardless of `requested`; fails with
///   `ForbiddenItemTransition` unless `current` is `Pending`.
/// * Staff: `requested` verbatim, if the transition table allows it.
pub fn resolve_item_transition(
    role: ActorRole,
    current: OrderItemStatus,
    requested: OrderItemStatus,
) -> CoreResult<OrderItemStatus> {
    match role {
        ActorRole::Customer => {
            if current != OrderItemStatus::Pending {
                return Err(CoreError::ForbiddenItemTransition { role, current });
            }
            Ok(OrderItemStatus::Cancelled)
        }
        ActorRole::Staff => {
            if current.can_transition_to(requested) {
                Ok(requested)
            } else {
                Err(CoreError::InvalidItemTransition {
                    from: current,
                    to: requested,
                })
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
