//! MTN Mobile Money as a [`PaymentGateway`].
use fulfillment_engine::{
    payment_objects::{CollectionAck, CollectionRequest, PaymentCallback},
    traits::{PaymentGateway, PaymentGatewayError},
};
use log::*;
use momo_tools::{
    helpers::{normalize_msisdn, short_reference},
    CollectionReport,
    MomoApi,
    MomoApiError,
    MomoConfig,
    Party,
    RequestToPay,
};

#[derive(Clone)]
pub struct MomoGateway {
    api: MomoApi,
}

impl MomoGateway {
    pub fn new(config: MomoConfig) -> Result<Self, MomoApiError> {
        let api = MomoApi::new(config)?;
        Ok(Self { api })
    }

    pub fn api(&self) -> &MomoApi {
        &self.api
    }
}

impl PaymentGateway for MomoGateway {
    fn normalize_payer(&self, raw: &str) -> Result<String, PaymentGatewayError> {
        normalize_msisdn(raw).map_err(gateway_error)
    }

    async fn request_collection(&self, request: CollectionRequest) -> Result<CollectionAck, PaymentGatewayError> {
        let external_id = request.order_id.to_string();
        let body = RequestToPay {
            amount: request.amount.to_string(),
            currency: request.currency,
            payer_message: format!("Payment for order {}", short_reference(&external_id)),
            payee_note: format!("Order {external_id}"),
            external_id,
            payer: Party::msisdn(request.payer),
        };
        let receipt = self.api.request_to_pay(&request.reference_id, &body).await.map_err(gateway_error)?;
        Ok(CollectionAck {
            reference_id: receipt.reference_id,
            message: "Payment request sent. Approve it on your phone to complete the payment.".into(),
        })
    }

    async fn collection_status(&self, reference_id: &str) -> Result<PaymentCallback, PaymentGatewayError> {
        let report = self.api.request_to_pay_status(reference_id).await.map_err(gateway_error)?;
        Ok(report_to_callback(report))
    }
}

pub fn report_to_callback(report: CollectionReport) -> PaymentCallback {
    PaymentCallback {
        external_id: report.external_id,
        status: report.status,
        financial_transaction_id: report.financial_transaction_id,
        amount: report.amount,
        currency: report.currency,
        reason: report.reason.map(|r| r.to_string()),
        correlation_id: report.correlation_id,
    }
}

fn gateway_error(e: MomoApiError) -> PaymentGatewayError {
    debug!("💳️ MoMo client error: {e}");
    match e {
        MomoApiError::InvalidPayer(s) => PaymentGatewayError::InvalidPayer(s),
        MomoApiError::AuthFailure(s) => PaymentGatewayError::AuthFailure(s),
        MomoApiError::Timeout => PaymentGatewayError::Timeout,
        MomoApiError::Rejected { status, message } if status >= 500 => {
            PaymentGatewayError::Unavailable(format!("Error {status}. {message}"))
        },
        MomoApiError::Rejected { status, message } => PaymentGatewayError::Rejected(format!("Error {status}. {message}")),
        MomoApiError::Transport(s) | MomoApiError::Initialization(s) | MomoApiError::JsonError(s) => {
            PaymentGatewayError::Unavailable(s)
        },
    }
}
