//! Order lifecycle rules.
//!
//! ```text
//!   PENDING -> CONFIRMED -> PREPARING -> OUT_FOR_DELIVERY -> DELIVERED
//!      |           |            |               |
//!      +-----------+------------+---------------+------> CANCELLED
//! ```
//!
//! [`transition`] is a pure function: given the current state of an order, an event and the authority of whoever is
//! asking, it either describes the next state or says why the request is refused. It performs no I/O; persisting the
//! result (and making sure nobody else changed the order in the meantime) is the caller's job.
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{Disposition, OrderStatusType, PaymentStatus, Principal, Role, ShopId};

/// The parts of an order that the state machine decides on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderState {
    pub status: OrderStatusType,
    pub payment_status: PaymentStatus,
    pub shop_id: ShopId,
}

impl OrderState {
    pub fn disposition(&self) -> Disposition {
        Disposition::new(self.status, self.payment_status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    /// A vendor or admin moves the order along (or cancels it), optionally overriding the payment status.
    Advance { to: OrderStatusType, payment_status: Option<PaymentStatus> },
    /// The payment gateway reported a successful collection.
    PaymentSucceeded,
    /// The payment gateway reported a failed collection.
    PaymentFailed,
}

impl Display for OrderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Advance { to, payment_status: Some(p) } => write!(f, "advance to {to}/{p}"),
            Self::Advance { to, payment_status: None } => write!(f, "advance to {to}"),
            Self::PaymentSucceeded => f.write_str("payment succeeded"),
            Self::PaymentFailed => f.write_str("payment failed"),
        }
    }
}

/// Inconsistencies between the payment gateway and the fulfillment process that an operator should look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationAnomaly {
    /// A payment failed after the vendor had already started preparing or shipping the order.
    PaymentFailedDuringFulfillment,
    /// A payment outcome arrived for an order that is already delivered or cancelled.
    CallbackForTerminalOrder,
    /// The gateway reported a failure for an order that is already paid.
    FailureAfterPayment,
}

impl Display for ReconciliationAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PaymentFailedDuringFulfillment => "payment failed during fulfillment",
            Self::CallbackForTerminalOrder => "payment callback for a terminal order",
            Self::FailureAfterPayment => "payment failure reported for a paid order",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: OrderStatusType,
    pub payment_status: PaymentStatus,
    pub anomaly: Option<ReconciliationAnomaly>,
}

impl Transition {
    pub fn disposition(&self) -> Disposition {
        Disposition::new(self.status, self.payment_status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Not allowed to change the status of this order")]
    Forbidden,
    #[error("Cannot move an order from {from} to {to}")]
    InvalidTransition { from: Disposition, to: Disposition },
    #[error("The order is already in the requested state")]
    NoOp,
}

/// Decides whether a caller may change orders belonging to a given shop.
pub trait TransitionAuthority {
    fn may_transition(&self, shop_id: &ShopId) -> bool;
}

/// A principal together with the shop they own, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub principal: Principal,
    pub owned_shop: Option<ShopId>,
}

impl Actor {
    pub fn new(principal: Principal, owned_shop: Option<ShopId>) -> Self {
        Self { principal, owned_shop }
    }

    pub fn system() -> Self {
        Self::new(Principal::system(), None)
    }

    pub fn user_id(&self) -> &str {
        self.principal.user_id.as_str()
    }
}

impl TransitionAuthority for Actor {
    fn may_transition(&self, shop_id: &ShopId) -> bool {
        match self.principal.role {
            Role::Admin => true,
            Role::Vendor => self.owned_shop.as_ref() == Some(shop_id),
            Role::Customer => false,
        }
    }
}

/// Applies `event` to an order in state `current` on behalf of `authority`.
pub fn transition<A: TransitionAuthority>(
    current: &OrderState,
    event: &OrderEvent,
    authority: &A,
) -> Result<Transition, TransitionError> {
    if !authority.may_transition(&current.shop_id) {
        return Err(TransitionError::Forbidden);
    }
    let from = current.disposition();
    if current.status.is_terminal() {
        return Err(TransitionError::InvalidTransition { from, to: requested_target(current, event) });
    }
    match *event {
        OrderEvent::Advance { to, payment_status } => advance(current, to, payment_status),
        OrderEvent::PaymentSucceeded => {
            if current.payment_status == PaymentStatus::Paid {
                return Err(TransitionError::NoOp);
            }
            let status = match current.status {
                OrderStatusType::Pending => OrderStatusType::Confirmed,
                s => s,
            };
            Ok(Transition { status, payment_status: PaymentStatus::Paid, anomaly: None })
        },
        OrderEvent::PaymentFailed => match current.payment_status {
            PaymentStatus::Failed => Err(TransitionError::NoOp),
            PaymentStatus::Paid => Err(TransitionError::InvalidTransition {
                from,
                to: Disposition::new(current.status, PaymentStatus::Failed),
            }),
            PaymentStatus::Pending => {
                let (status, anomaly) = match current.status {
                    OrderStatusType::Pending | OrderStatusType::Confirmed => (OrderStatusType::Cancelled, None),
                    s => (s, Some(ReconciliationAnomaly::PaymentFailedDuringFulfillment)),
                };
                Ok(Transition { status, payment_status: PaymentStatus::Failed, anomaly })
            },
        },
    }
}

fn advance(
    current: &OrderState,
    to: OrderStatusType,
    payment_status: Option<PaymentStatus>,
) -> Result<Transition, TransitionError> {
    let payment = payment_status.unwrap_or(current.payment_status);
    if to == current.status && payment == current.payment_status {
        return Err(TransitionError::NoOp);
    }
    let invalid =
        || TransitionError::InvalidTransition { from: current.disposition(), to: Disposition::new(to, payment) };
    let status_ok = to == current.status ||
        to == OrderStatusType::Cancelled ||
        matches!((current.status.progress(), to.progress()), (Some(a), Some(b)) if b > a);
    if !status_ok {
        return Err(invalid());
    }
    if payment != current.payment_status && !current.payment_status.can_become(payment) {
        return Err(invalid());
    }
    Ok(Transition { status: to, payment_status: payment, anomaly: None })
}

fn requested_target(current: &OrderState, event: &OrderEvent) -> Disposition {
    match *event {
        OrderEvent::Advance { to, payment_status } => {
            Disposition::new(to, payment_status.unwrap_or(current.payment_status))
        },
        OrderEvent::PaymentSucceeded => Disposition::new(current.status, PaymentStatus::Paid),
        OrderEvent::PaymentFailed => Disposition::new(current.status, PaymentStatus::Failed),
    }
}
