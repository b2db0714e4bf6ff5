//! Outbound notifications.
//!
//! The engine does not know how people are notified. It publishes events, and [`notifier_hooks`] turns those events
//! into [`Notification`]s for whichever [`Notifier`] the host application supplies. Delivery is best-effort: a failed
//! notification is logged and otherwise ignored.
use std::{fmt::Display, future::Future, sync::Arc};

use log::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::events::{EventHooks, OrderCreatedEvent, OrderStatusChangedEvent, ReconciliationAnomalyEvent};

/// Recipient of notifications that need a human to look at them.
pub const OPERATORS_RECIPIENT: &str = "operators";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    OrderCreated,
    OrderStatusChanged,
    ReconciliationAnomaly,
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OrderCreated => "ORDER_CREATED",
            Self::OrderStatusChanged => "ORDER_STATUS_CHANGED",
            Self::ReconciliationAnomaly => "RECONCILIATION_ANOMALY",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub payload: serde_json::Value,
}

impl From<OrderCreatedEvent> for Notification {
    fn from(ev: OrderCreatedEvent) -> Self {
        let order = ev.order;
        Self {
            kind: NotificationKind::OrderCreated,
            recipient: order.customer_id.clone(),
            payload: json!({
                "order_id": order.id,
                "shop_id": order.shop_id,
                "total_price": order.total_price,
                "currency": order.currency,
                "status": order.status,
                "payment_status": order.payment_status,
            }),
        }
    }
}

impl From<OrderStatusChangedEvent> for Notification {
    fn from(ev: OrderStatusChangedEvent) -> Self {
        Self {
            kind: NotificationKind::OrderStatusChanged,
            recipient: ev.order.customer_id.clone(),
            payload: json!({
                "order_id": ev.order.id,
                "old": ev.old,
                "new": ev.new,
                "actor": ev.actor,
            }),
        }
    }
}

impl From<ReconciliationAnomalyEvent> for Notification {
    fn from(ev: ReconciliationAnomalyEvent) -> Self {
        Self {
            kind: NotificationKind::ReconciliationAnomaly,
            recipient: OPERATORS_RECIPIENT.to_string(),
            payload: json!({
                "order_id": ev.order_id,
                "anomaly": ev.anomaly,
                "detail": ev.detail,
            }),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum NotifierError {
    #[error("Could not deliver notification: {0}")]
    DeliveryFailed(String),
    #[error("Notification was refused: {0}")]
    Rejected(String),
}

/// Delivers notifications to people.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notification: Notification) -> impl Future<Output = Result<(), NotifierError>> + Send;
}

impl<N: Notifier> Notifier for Arc<N> {
    fn notify(&self, notification: Notification) -> impl Future<Output = Result<(), NotifierError>> + Send {
        self.as_ref().notify(notification)
    }
}

/// Hooks that forward every engine event to `notifier`.
pub fn notifier_hooks<N: Notifier>(notifier: N) -> EventHooks {
    let notifier = Arc::new(notifier);
    let mut hooks = EventHooks::default();
    let n = Arc::clone(&notifier);
    hooks.on_order_created(move |ev| {
        let n = Arc::clone(&n);
        Box::pin(async move { deliver(n.as_ref(), ev.into()).await })
    });
    let n = Arc::clone(&notifier);
    hooks.on_status_changed(move |ev| {
        let n = Arc::clone(&n);
        Box::pin(async move { deliver(n.as_ref(), ev.into()).await })
    });
    let n = notifier;
    hooks.on_anomaly(move |ev| {
        let n = Arc::clone(&n);
        Box::pin(async move { deliver(n.as_ref(), ev.into()).await })
    });
    hooks
}

async fn deliver<N: Notifier>(notifier: &N, notification: Notification) {
    let kind = notification.kind;
    let recipient = notification.recipient.clone();
    match notifier.notify(notification).await {
        Ok(()) => trace!("📬️ {kind} notification sent to {recipient}"),
        Err(e) => warn!("📬️ {kind} notification for {recipient} was not delivered. {e}"),
    }
}
