use std::sync::{Arc, Mutex};

use fulfillment_engine::{
    fe_api::payment_objects::{CollectionAck, CollectionRequest, PaymentCallback},
    traits::{PaymentGateway, PaymentGatewayError},
};
use momo_tools::helpers::normalize_msisdn;

/// A payment gateway that accepts every collection request unless told to fail the next one. Every accepted request
/// reports `SUCCESSFUL` when its status is queried.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    fail_next: Arc<Mutex<Option<PaymentGatewayError>>>,
    requests: Arc<Mutex<Vec<(String, CollectionRequest)>>>,
}

impl ScriptedGateway {
    pub fn fail_next(&self, error: PaymentGatewayError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    pub fn requests(&self) -> Vec<(String, CollectionRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

impl PaymentGateway for ScriptedGateway {
    fn normalize_payer(&self, raw: &str) -> Result<String, PaymentGatewayError> {
        normalize_msisdn(raw).map_err(|e| PaymentGatewayError::InvalidPayer(e.to_string()))
    }

    async fn request_collection(&self, request: CollectionRequest) -> Result<CollectionAck, PaymentGatewayError> {
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }
        let reference_id = request.reference_id.clone();
        self.requests.lock().unwrap().push((reference_id.clone(), request));
        Ok(CollectionAck { reference_id, message: "Approve the payment on your phone".into() })
    }

    async fn collection_status(&self, reference_id: &str) -> Result<PaymentCallback, PaymentGatewayError> {
        let requests = self.requests.lock().unwrap().clone();
        let (_, request) = requests
            .into_iter()
            .find(|(r, _)| r == reference_id)
            .ok_or_else(|| PaymentGatewayError::Rejected(format!("Unknown reference {reference_id}")))?;
        Ok(PaymentCallback {
            external_id: Some(request.order_id.to_string()),
            status: Some("SUCCESSFUL".into()),
            financial_transaction_id: Some("fin-0001".into()),
            amount: Some(request.amount.value().to_string()),
            currency: Some(request.currency),
            reason: None,
            correlation_id: Some(reference_id.to_string()),
        })
    }
}
