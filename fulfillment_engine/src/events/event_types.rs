use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Disposition, Order, OrderId},
    state_machine::ReconciliationAnomaly,
};

/// Published once an order and its stock reservations have been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Published after every persisted status or payment status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    /// The order as it is after the change
    pub order: Order,
    pub old: Disposition,
    pub new: Disposition,
    /// User id of whoever made the change, or `system`
    pub actor: String,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old: Disposition, actor: String) -> Self {
        let new = order.disposition();
        Self { order, old, new, actor }
    }
}

/// Something an operator should look at: the payment gateway and the order disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationAnomalyEvent {
    pub order_id: OrderId,
    pub anomaly: ReconciliationAnomaly,
    pub detail: String,
}

impl ReconciliationAnomalyEvent {
    pub fn new<S: Into<String>>(order_id: OrderId, anomaly: ReconciliationAnomaly, detail: S) -> Self {
        Self { order_id, anomaly, detail: detail.into() }
    }
}
