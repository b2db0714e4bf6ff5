use std::fmt::Debug;

use log::*;
use uuid::Uuid;

use crate::{
    db_types::{NewPaymentTransaction, PaymentResolution, PaymentStatus, PaymentTransactionStatus, Principal},
    fe_api::{
        errors::PaymentApiError,
        payment_objects::{CollectionRequest, InitiatePayment, PaymentCallback, PaymentInitiated},
    },
    traits::{FulfillmentDatabase, PaymentGateway},
};

/// `PaymentApi` starts payment collections for orders and lets operators ask the gateway what became of them.
///
/// Initiation only records the attempt. Orders are updated when the outcome comes back through the reconciler.
pub struct PaymentApi<B, G> {
    db: B,
    gateway: G,
}

impl<B, G> Debug for PaymentApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi")
    }
}

impl<B, G> PaymentApi<B, G> {
    pub fn new(db: B, gateway: G) -> Self {
        Self { db, gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<B, G> PaymentApi<B, G>
where
    B: FulfillmentDatabase,
    G: PaymentGateway,
{
    /// Asks the gateway to collect payment for one of the caller's orders.
    ///
    /// The order must belong to the caller, must not be finished or already paid for, and the amount and currency
    /// must match the order exactly. The attempt is recorded as a `PENDING` payment transaction before the gateway is
    /// called, because the gateway's callback can arrive before its acknowledgement does. If the gateway refuses, the
    /// record is marked `FAILED`. Nothing about the order changes here, and no database connection is held while the
    /// gateway is being called.
    pub async fn initiate_payment(
        &self,
        principal: &Principal,
        request: InitiatePayment,
    ) -> Result<PaymentInitiated, PaymentApiError> {
        let order_id = request.order_id;
        let order = self
            .db
            .fetch_order(&order_id)
            .await?
            .filter(|o| o.customer_id == principal.user_id)
            .ok_or_else(|| PaymentApiError::OrderNotFound(order_id.clone()))?;
        if order.status.is_terminal() || order.payment_status == PaymentStatus::Paid {
            return Err(PaymentApiError::OrderNotPayable(order_id, order.disposition()));
        }
        if !request.amount.is_positive() || request.amount != order.total_price {
            return Err(PaymentApiError::AmountMismatch {
                requested: request.amount.to_string(),
                expected: order.total_price.to_string(),
            });
        }
        if !request.currency.eq_ignore_ascii_case(&order.currency) {
            return Err(PaymentApiError::UnsupportedCurrency { requested: request.currency, expected: order.currency });
        }
        let payer = self.gateway.normalize_payer(&request.payer)?;
        let transaction = NewPaymentTransaction {
            reference_id: Uuid::new_v4().to_string(),
            order_id: order_id.clone(),
            amount: order.total_price,
            currency: order.currency,
            payer,
        };
        let record = self.db.insert_payment_transaction(transaction).await?;
        let collection = CollectionRequest {
            reference_id: record.reference_id.clone(),
            order_id: order_id.clone(),
            amount: record.amount,
            currency: record.currency.clone(),
            payer: record.payer.clone(),
        };
        debug!(
            "💳️ Requesting collection of {} {} for order {order_id} [{}]",
            collection.amount, collection.currency, collection.reference_id
        );
        match self.gateway.request_collection(collection).await {
            Ok(ack) => {
                info!("💳️ Payment {} requested for order {order_id}", record.reference_id);
                Ok(PaymentInitiated { transaction_id: record.reference_id, message: ack.message })
            },
            Err(e) => {
                warn!("💳️ Collection request {} for order {order_id} failed. {e}", record.reference_id);
                let resolution = PaymentResolution {
                    status: PaymentTransactionStatus::Failed,
                    financial_transaction_id: None,
                    reason: Some(e.to_string()),
                };
                // A callback may already have settled the attempt, in which case it is left alone
                if self.db.resolve_payment_transaction(&record.reference_id, resolution).await?.is_none() {
                    debug!("💳️ Payment {} was resolved before the gateway answered", record.reference_id);
                }
                Err(PaymentApiError::from(e))
            },
        }
    }

    /// Fetches the gateway's current view of a payment attempt, ready to be handed to the reconciler.
    pub async fn collection_status(&self, reference_id: &str) -> Result<PaymentCallback, PaymentApiError> {
        let record = self
            .db
            .fetch_payment_transaction(reference_id)
            .await?
            .ok_or_else(|| PaymentApiError::TransactionNotFound(reference_id.to_string()))?;
        let mut report = self.gateway.collection_status(reference_id).await?;
        trace!("💳️ Gateway reports {report} for payment {reference_id}");
        report.external_id.get_or_insert_with(|| record.order_id.to_string());
        Ok(report.with_correlation_id(reference_id))
    }
}
