use thiserror::Error;

use crate::fe_api::payment_objects::{CollectionAck, CollectionRequest, PaymentCallback};

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("Invalid payer identifier: {0}")]
    InvalidPayer(String),
    #[error("Could not authenticate with the payment gateway: {0}")]
    AuthFailure(String),
    #[error("The payment gateway refused the request: {0}")]
    Rejected(String),
    #[error("The payment gateway did not respond in time")]
    Timeout,
    #[error("The payment gateway is unavailable: {0}")]
    Unavailable(String),
}

/// A payment provider that can collect money from a customer.
///
/// Collection is asynchronous. [`PaymentGateway::request_collection`] returns once the provider has accepted the
/// request; the outcome arrives later as a callback (or can be polled with [`PaymentGateway::collection_status`]).
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    /// Validates a payer identifier and converts it to the form the provider expects.
    fn normalize_payer(&self, raw: &str) -> Result<String, PaymentGatewayError>;

    /// Asks the provider to collect `request.amount` from `request.payer`. Every call is a new attempt, identified to
    /// the provider by `request.reference_id`.
    async fn request_collection(&self, request: CollectionRequest) -> Result<CollectionAck, PaymentGatewayError>;

    /// Fetches the provider's current view of an earlier attempt.
    async fn collection_status(&self, reference_id: &str) -> Result<PaymentCallback, PaymentGatewayError>;
}
