use thiserror::Error;

use crate::{
    db_types::{Disposition, OrderId, ProductId, ShopId},
    state_machine::TransitionError,
    traits::{FulfillmentError, PaymentGatewayError},
};

#[derive(Debug, Clone, Error)]
#[error("Invalid query: {0}")]
pub struct OrderQueryError(pub String);

#[derive(Debug, Clone, Error)]
pub enum PlacementError {
    #[error("Only customers can place orders")]
    Forbidden,
    #[error("Shop {0} does not exist or is not trading")]
    ShopUnavailable(ShopId),
    #[error("The order contains no items")]
    EmptyOrder,
    #[error("Invalid quantity: {0}. Quantities must be at least 1 and fit in an order")]
    InvalidQuantity(i64),
    #[error("Invalid order: {0}")]
    ValidationError(String),
    #[error("Product {0} is not available")]
    ProductUnavailable(ProductId),
    #[error("Insufficient stock for product {product_id}. Requested {requested}, but only {available} available")]
    InsufficientStock { product_id: ProductId, requested: i64, available: i64 },
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<FulfillmentError> for PlacementError {
    fn from(e: FulfillmentError) -> Self {
        match e {
            FulfillmentError::ProductUnavailable(p) => Self::ProductUnavailable(p),
            FulfillmentError::InsufficientStock { product_id, requested, available } => {
                Self::InsufficientStock { product_id, requested, available }
            },
            FulfillmentError::InvalidQuantity(q) => Self::InvalidQuantity(q),
            FulfillmentError::OrderNotFound(id) => Self::DatabaseError(format!("Order {id} vanished during placement")),
            FulfillmentError::DatabaseError(s) => Self::DatabaseError(s),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Not allowed to change the status of this order")]
    Forbidden,
    #[error("Cannot move an order from {from} to {to}")]
    InvalidTransition { from: Disposition, to: Disposition },
    #[error("The order is already in the requested state")]
    NoOp,
    #[error("Order {0} kept changing while it was being updated. Try again")]
    ConcurrentModification(OrderId),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<FulfillmentError> for OrderFlowError {
    fn from(e: FulfillmentError) -> Self {
        match e {
            FulfillmentError::OrderNotFound(id) => Self::OrderNotFound(id),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<TransitionError> for OrderFlowError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::Forbidden => Self::Forbidden,
            TransitionError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            TransitionError::NoOp => Self::NoOp,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderQueryApiError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Not allowed to view these orders")]
    Forbidden,
    #[error("{0}")]
    QueryError(#[from] OrderQueryError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<FulfillmentError> for OrderQueryApiError {
    fn from(e: FulfillmentError) -> Self {
        match e {
            FulfillmentError::OrderNotFound(id) => Self::OrderNotFound(id),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentApiError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} cannot be paid for in its current state ({1})")]
    OrderNotPayable(OrderId, Disposition),
    #[error("The payment amount {requested} does not match the order total {expected}")]
    AmountMismatch { requested: String, expected: String },
    #[error("Currency {requested} is not supported for this order. Expected {expected}")]
    UnsupportedCurrency { requested: String, expected: String },
    #[error("Invalid payer identifier: {0}")]
    InvalidPayer(String),
    #[error("Could not authenticate with the payment gateway: {0}")]
    GatewayAuthFailure(String),
    #[error("The payment gateway refused the request: {0}")]
    GatewayRejected(String),
    #[error("The payment gateway did not respond in time")]
    GatewayTimeout,
    #[error("The payment gateway is unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("Payment transaction {0} does not exist")]
    TransactionNotFound(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<FulfillmentError> for PaymentApiError {
    fn from(e: FulfillmentError) -> Self {
        match e {
            FulfillmentError::OrderNotFound(id) => Self::OrderNotFound(id),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<PaymentGatewayError> for PaymentApiError {
    fn from(e: PaymentGatewayError) -> Self {
        match e {
            PaymentGatewayError::InvalidPayer(s) => Self::InvalidPayer(s),
            PaymentGatewayError::AuthFailure(s) => Self::GatewayAuthFailure(s),
            PaymentGatewayError::Rejected(s) => Self::GatewayRejected(s),
            PaymentGatewayError::Timeout => Self::GatewayTimeout,
            PaymentGatewayError::Unavailable(s) => Self::GatewayUnavailable(s),
        }
    }
}

/// The only reasons a payment callback is not acknowledged.
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("Malformed payment callback: {0}")]
    MalformedPayload(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<FulfillmentError> for ReconcileError {
    fn from(e: FulfillmentError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
