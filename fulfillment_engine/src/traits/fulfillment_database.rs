use thiserror::Error;

use crate::{
    db_types::{NewOrder, NewPaymentTransaction, Order, OrderId, PaymentResolution, PaymentTransaction, ProductId},
    traits::{data_objects::DispositionUpdate, Catalog, OrderManagement, ShopDirectory},
};

#[derive(Debug, Clone, Error)]
pub enum FulfillmentError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Product {0} is not available")]
    ProductUnavailable(ProductId),
    #[error("Insufficient stock for product {product_id}. Requested {requested}, but only {available} available")]
    InsufficientStock { product_id: ProductId, requested: i64, available: i64 },
    #[error("Invalid quantity: {0}. Quantities must be at least 1 and fit in an order")]
    InvalidQuantity(i64),
}

impl From<sqlx::Error> for FulfillmentError {
    fn from(e: sqlx::Error) -> Self {
        FulfillmentError::DatabaseError(e.to_string())
    }
}

/// This trait defines the highest level of behaviour for backends supporting the fulfillment engine.
///
/// This behaviour includes:
/// * Placing orders, with the stock reservations and the order record written in one atomic unit.
/// * Persisting order status changes, guarded against concurrent modification.
/// * Recording payment attempts and resolving them once the gateway reports an outcome.
#[allow(async_fn_in_trait)]
pub trait FulfillmentDatabase: Clone + Catalog + ShopDirectory + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// In a single atomic transaction:
    /// * reserves stock for every line of the order, failing with `ProductUnavailable` or `InsufficientStock` for the
    ///   first line that cannot be satisfied,
    /// * captures each product's current price as the line's unit price,
    /// * stores the order, with status `PENDING`/`pending` and a total equal to the sum of the line totals,
    /// * stores the line items.
    ///
    /// If anything fails, nothing is changed.
    async fn insert_order_with_reservations(&self, order: NewOrder) -> Result<Order, FulfillmentError>;

    /// Moves the order from `update.expected` to `update.new` and appends a status history record, atomically.
    ///
    /// The update only applies if the order is still in `update.expected`. If someone else changed it first, nothing
    /// is written and `None` is returned. When the order is cancelled, its line items are returned to stock in the
    /// same transaction.
    async fn update_order_disposition(&self, update: DispositionUpdate) -> Result<Option<Order>, FulfillmentError>;

    /// Records a payment attempt with status `PENDING`.
    async fn insert_payment_transaction(
        &self,
        transaction: NewPaymentTransaction,
    ) -> Result<PaymentTransaction, FulfillmentError>;

    /// Sets the final status of a payment attempt. Only pending attempts are updated, so this happens at most once per
    /// attempt. Returns `None` if the attempt does not exist or was already resolved.
    async fn resolve_payment_transaction(
        &self,
        reference_id: &str,
        resolution: PaymentResolution,
    ) -> Result<Option<PaymentTransaction>, FulfillmentError>;

    /// The most recent payment attempt for the order that has not been resolved yet.
    async fn fetch_latest_pending_payment(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<PaymentTransaction>, FulfillmentError>;

    async fn close(&mut self) -> Result<(), FulfillmentError>;
}
