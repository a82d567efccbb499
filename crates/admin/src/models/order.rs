//! Order views for the back-office.

use serde::Serialize;

use atelier_core::OrderStatus;
use atelier_core::order::{Order, OrderEvent};

/// An order with its status history and the moves staff may make next.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    /// Oldest first. The first event is always the move into `pending`.
    pub events: Vec<OrderEvent>,
    pub allowed_next: Vec<OrderStatus>,
}

impl OrderDetail {
    #[must_use]
    pub fn new(order: Order, events: Vec<OrderEvent>) -> Self {
        let allowed_next = order.status.allowed_next().to_vec();
        Self {
            order,
            events,
            allowed_next,
        }
    }
}
