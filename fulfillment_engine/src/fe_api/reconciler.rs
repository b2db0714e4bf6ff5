use std::fmt::{Debug, Display};

use log::*;
use serde::Serialize;

use crate::{
    db_types::{Disposition, Order, OrderId, PaymentResolution, PaymentStatus, PaymentTransactionStatus},
    events::{EventProducers, ReconciliationAnomalyEvent},
    fe_api::{
        errors::{OrderFlowError, ReconcileError},
        order_flow_api::OrderFlowApi,
        payment_objects::PaymentCallback,
    },
    state_machine::{Actor, OrderEvent, ReconciliationAnomaly},
    traits::FulfillmentDatabase,
};

/// What became of a payment callback. Every variant is an acknowledgement: the gateway should not send it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The order was updated.
    Applied { order_id: OrderId, disposition: Disposition },
    /// The order already reflects this outcome.
    Duplicate { order_id: OrderId },
    /// No order has this id.
    UnknownOrder { external_id: String },
    /// The payment is still in progress.
    Informational { order_id: OrderId },
    /// The gateway sent a status we do not act on.
    Unhandled { order_id: OrderId, status: String },
    /// The order cannot take this outcome any more. Operators have been told.
    Rejected { order_id: OrderId, detail: String },
}

impl Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Applied { order_id, disposition } => write!(f, "order {order_id} is now {disposition}"),
            Self::Duplicate { order_id } => write!(f, "order {order_id} was already up to date"),
            Self::UnknownOrder { external_id } => write!(f, "no order matches {external_id}"),
            Self::Informational { order_id } => write!(f, "payment for order {order_id} is still pending"),
            Self::Unhandled { order_id, status } => write!(f, "status {status} for order {order_id} was ignored"),
            Self::Rejected { order_id, detail } => write!(f, "order {order_id} rejected the callback: {detail}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatewayStatus {
    Successful,
    Failed,
    Pending,
}

impl GatewayStatus {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUCCESSFUL" => Some(Self::Successful),
            "FAILED" => Some(Self::Failed),
            "PENDING" => Some(Self::Pending),
            _ => None,
        }
    }
}

/// `WebhookReconciler` applies payment outcomes reported by the gateway to orders.
///
/// It acts as the system principal and goes through the same [`OrderFlowApi`] as operators do, so a callback can
/// never do something an administrator could not. Business-level problems (unknown orders, duplicates, callbacks for
/// finished orders) are logged and acknowledged. Only database failures are returned as errors, so that the gateway
/// retries.
pub struct WebhookReconciler<B> {
    flow: OrderFlowApi<B>,
}

impl<B> Debug for WebhookReconciler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookReconciler")
    }
}

impl<B> WebhookReconciler<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { flow: OrderFlowApi::new(db, producers) }
    }
}

impl<B> WebhookReconciler<B>
where B: FulfillmentDatabase
{
    pub async fn handle_callback(&self, callback: PaymentCallback) -> Result<ReconcileOutcome, ReconcileError> {
        debug!("📞️ Payment callback received. {callback}");
        let (external_id, raw_status) = match (non_blank(&callback.external_id), non_blank(&callback.status)) {
            (Some(e), Some(s)) => (e.to_string(), s.to_string()),
            _ => {
                warn!("📞️ Rejecting payment callback without an external id or status. {callback}");
                return Err(ReconcileError::MalformedPayload("externalId and status are required".into()));
            },
        };
        let order_id = OrderId::from(external_id.as_str());
        let Some(order) = self.flow.db().fetch_order(&order_id).await? else {
            warn!("📞️ Payment callback for unknown order {external_id}. Ignoring it.");
            return Ok(ReconcileOutcome::UnknownOrder { external_id });
        };
        let status = match GatewayStatus::parse(&raw_status) {
            Some(GatewayStatus::Pending) => {
                info!("📞️ Payment for order {order_id} is still pending");
                return Ok(ReconcileOutcome::Informational { order_id });
            },
            Some(s) => s,
            None => {
                warn!("📞️ Unhandled payment status {raw_status} for order {order_id}. Ignoring it.");
                return Ok(ReconcileOutcome::Unhandled { order_id, status: raw_status });
            },
        };
        let already_applied = matches!(
            (status, order.payment_status),
            (GatewayStatus::Successful, PaymentStatus::Paid) | (GatewayStatus::Failed, PaymentStatus::Failed)
        );
        if already_applied {
            info!("📞️ Order {order_id} is already {}. Duplicate callback skipped.", order.payment_status);
            return Ok(ReconcileOutcome::Duplicate { order_id });
        }
        self.resolve_payment_record(&order, status, &callback).await?;
        let event = match status {
            GatewayStatus::Successful => OrderEvent::PaymentSucceeded,
            _ => OrderEvent::PaymentFailed,
        };
        let reason = match callback.reason.as_deref() {
            Some(r) => format!("Payment gateway reported {raw_status}: {r}"),
            None => format!("Payment gateway reported {raw_status}"),
        };
        match self.flow.apply_event(&Actor::system(), &order_id, event, Some(reason)).await {
            Ok(outcome) => {
                let disposition = outcome.order.disposition();
                info!("📞️ Payment callback applied. Order {order_id} is now {disposition}");
                Ok(ReconcileOutcome::Applied { order_id, disposition })
            },
            Err(OrderFlowError::NoOp) => {
                debug!("📞️ Order {order_id} was updated by a concurrent callback");
                Ok(ReconcileOutcome::Duplicate { order_id })
            },
            Err(OrderFlowError::InvalidTransition { from, to }) => {
                let anomaly = if from.status.is_terminal() {
                    ReconciliationAnomaly::CallbackForTerminalOrder
                } else {
                    ReconciliationAnomaly::FailureAfterPayment
                };
                let detail = format!("{raw_status} callback cannot move the order from {from} to {to}");
                warn!("📞️ Order {order_id}: {anomaly}. {detail}");
                let event = ReconciliationAnomalyEvent::new(order_id.clone(), anomaly, detail.clone());
                self.flow.producers().publish_anomaly(event).await;
                Ok(ReconcileOutcome::Rejected { order_id, detail })
            },
            Err(OrderFlowError::OrderNotFound(_)) => {
                warn!("📞️ Order {order_id} disappeared while its payment callback was being applied");
                Ok(ReconcileOutcome::UnknownOrder { external_id })
            },
            Err(OrderFlowError::Forbidden) => {
                error!("📞️ The system principal was refused a status change on order {order_id}");
                Ok(ReconcileOutcome::Rejected { order_id, detail: "forbidden".into() })
            },
            Err(e @ OrderFlowError::ConcurrentModification(_)) => {
                warn!("📞️ {e}. The callback will have to be retried.");
                Err(ReconcileError::DatabaseError(e.to_string()))
            },
            Err(OrderFlowError::DatabaseError(e)) => Err(ReconcileError::DatabaseError(e)),
        }
    }

    /// Marks the payment attempt behind this callback as finished. The attempt is found by the callback's correlation
    /// id, or failing that, is the order's most recent pending attempt.
    async fn resolve_payment_record(
        &self,
        order: &Order,
        status: GatewayStatus,
        callback: &PaymentCallback,
    ) -> Result<(), ReconcileError> {
        let db = self.flow.db();
        let reference = match non_blank(&callback.correlation_id) {
            Some(r) => Some(r.to_string()),
            None => db.fetch_latest_pending_payment(&order.id).await?.map(|p| p.reference_id),
        };
        let Some(reference) = reference else {
            debug!("📞️ No payment attempt on record for order {}", order.id);
            return Ok(());
        };
        if let Some(record) = db.fetch_payment_transaction(&reference).await? {
            if record.order_id != order.id {
                warn!(
                    "📞️ Payment {reference} belongs to order {}, not {}. Leaving it alone.",
                    record.order_id, order.id
                );
                return Ok(());
            }
        }
        let resolution = PaymentResolution {
            status: match status {
                GatewayStatus::Successful => PaymentTransactionStatus::Successful,
                _ => PaymentTransactionStatus::Failed,
            },
            financial_transaction_id: callback.financial_transaction_id.clone(),
            reason: callback.reason.clone(),
        };
        if db.resolve_payment_transaction(&reference, resolution).await?.is_none() {
            debug!("📞️ Payment {reference} was already resolved or is not on record");
        }
        Ok(())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
