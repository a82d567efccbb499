//! Orders, their lines, and the status history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkout::ShippingDetails;
use crate::types::{AdminUserId, OrderId, OrderStatus, Price, ProductId, TransitionError, UserId};

/// A purchased product, with name and price frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub size: Option<String>,
    pub unit_price: Price,
    pub quantity: u32,
    pub line_total: Price,
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub shipping: ShippingDetails,
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub total: Price,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }
}

/// Order row for list views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub item_count: u32,
    pub total: Price,
    pub created_at: DateTime<Utc>,
}

/// Who caused a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Customer(UserId),
    Admin(AdminUserId),
    System,
}

impl Actor {
    /// Stored `actor_kind` value.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::Customer(_) => "customer",
            Self::Admin(_) => "admin",
            Self::System => "system",
        }
    }

    /// Stored `actor_id` value.
    #[must_use]
    pub const fn id(self) -> Option<i32> {
        match self {
            Self::Customer(id) => Some(id.as_i32()),
            Self::Admin(id) => Some(id.as_i32()),
            Self::System => None,
        }
    }

    /// Rebuild an actor from its stored columns.
    #[must_use]
    pub fn from_parts(kind: &str, id: Option<i32>) -> Option<Self> {
        match (kind, id) {
            ("customer", Some(id)) => Some(Self::Customer(UserId::new(id))),
            ("admin", Some(id)) => Some(Self::Admin(AdminUserId::new(id))),
            ("system", None) => Some(Self::System),
            _ => None,
        }
    }
}

/// One entry in an order's status history.
///
/// The first event of every order has `from: None` and `to: Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderEvent {
    pub from: Option<OrderStatus>,
    pub to: OrderStatus,
    pub actor: Actor,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

/// Check that a shopper may cancel an order in `status`.
///
/// Shoppers can only cancel orders staff have not started on; staff may also
/// cancel orders that are processing.
///
/// # Errors
///
/// Returns the [`TransitionError`] for the rejected move to `cancelled`.
pub fn customer_cancel(status: OrderStatus) -> Result<OrderStatus, TransitionError> {
    let to = OrderStatus::Cancelled;
    match status.transition(to) {
        Ok(next) if status == OrderStatus::Pending => Ok(next),
        Ok(_) => Err(TransitionError::NotAllowed { from: status, to }),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_cancel_only_pending() {
        assert_eq!(
            customer_cancel(OrderStatus::Pending),
            Ok(OrderStatus::Cancelled)
        );
        assert!(matches!(
            customer_cancel(OrderStatus::Processing),
            Err(TransitionError::NotAllowed { .. })
        ));
        assert_eq!(
            customer_cancel(OrderStatus::Cancelled),
            Err(TransitionError::Same(OrderStatus::Cancelled))
        );
        assert_eq!(
            customer_cancel(OrderStatus::Delivered),
            Err(TransitionError::Terminal(OrderStatus::Delivered))
        );
    }

    #[test]
    fn test_actor_parts() {
        for actor in [
            Actor::Customer(UserId::new(3)),
            Actor::Admin(AdminUserId::new(1)),
            Actor::System,
        ] {
            assert_eq!(Actor::from_parts(actor.kind(), actor.id()), Some(actor));
        }
        assert_eq!(Actor::from_parts("customer", None), None);
        assert_eq!(Actor::from_parts("robot", Some(1)), None);
    }
}
