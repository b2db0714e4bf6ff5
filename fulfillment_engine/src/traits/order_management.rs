use crate::{
    db_types::{Order, OrderId, PaymentTransaction, ProductId, ShopId, StatusHistory},
    order_objects::OrderQueryFilter,
    traits::FulfillmentError,
};

/// Read access to orders and everything recorded about them.
///
/// Orders returned from these methods always carry their line items.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, FulfillmentError>;

    /// All orders placed by the customer, newest first.
    async fn fetch_orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, FulfillmentError>;

    /// All orders placed with the shop, newest first.
    async fn fetch_orders_for_shop(&self, shop_id: &ShopId) -> Result<Vec<Order>, FulfillmentError>;

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, FulfillmentError>;

    /// Every status change recorded for the order, oldest first.
    async fn fetch_status_history(&self, order_id: &OrderId) -> Result<Vec<StatusHistory>, FulfillmentError>;

    async fn fetch_payment_transaction(&self, reference_id: &str)
        -> Result<Option<PaymentTransaction>, FulfillmentError>;

    async fn fetch_payments_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentTransaction>, FulfillmentError>;

    /// `true` if the customer has at least one delivered order containing the product.
    async fn has_received_product(&self, customer_id: &str, product_id: &ProductId) -> Result<bool, FulfillmentError>;

    /// `true` if the customer has at least one delivered order from the shop.
    async fn has_received_from_shop(&self, customer_id: &str, shop_id: &ShopId) -> Result<bool, FulfillmentError>;
}
