use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::{Money, OrderId};

/// A request to a payment gateway to collect money for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRequest {
    /// Identifies this attempt. The payment transaction record is stored under it before the gateway is called.
    pub reference_id: String,
    pub order_id: OrderId,
    pub amount: Money,
    pub currency: String,
    /// Payer identifier, already normalized by [`crate::traits::PaymentGateway::normalize_payer`]
    pub payer: String,
}

/// The gateway accepted a collection request. The outcome is not known yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionAck {
    /// The reference the gateway acknowledged, the same one it was given
    pub reference_id: String,
    pub message: String,
}

/// A gateway's report on a collection attempt, either pushed to the webhook or fetched on demand.
///
/// Every field is optional on the wire. The reconciler decides what is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallback {
    /// The order id that was sent with the collection request
    pub external_id: Option<String>,
    /// `SUCCESSFUL`, `FAILED` or `PENDING`
    pub status: Option<String>,
    pub financial_transaction_id: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub reason: Option<String>,
    /// The reference id of the attempt, when the gateway supplies it
    #[serde(alias = "referenceId")]
    pub correlation_id: Option<String>,
}

impl PaymentCallback {
    pub fn with_correlation_id<S: Into<String>>(mut self, correlation_id: S) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

impl Display for PaymentCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let na = "n/a";
        write!(
            f,
            "order: {}, status: {}, reference: {}",
            self.external_id.as_deref().unwrap_or(na),
            self.status.as_deref().unwrap_or(na),
            self.correlation_id.as_deref().unwrap_or(na)
        )
    }
}

/// A customer's request to pay for one of their orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePayment {
    pub order_id: OrderId,
    pub amount: Money,
    pub currency: String,
    /// Phone number (MSISDN) of the paying mobile money account
    pub payer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitiated {
    pub transaction_id: String,
    pub message: String,
}
