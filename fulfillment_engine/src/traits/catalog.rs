use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Product, ProductId, Shop, ShopId},
    traits::FulfillmentError,
};

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reservation {
    Reserved { remaining: i64 },
    InsufficientStock { available: i64 },
    /// The product does not exist, belongs to another shop, or has been withdrawn from sale.
    ProductUnavailable,
}

/// Stock keeping for products. The catalog itself (names, prices, images) is maintained elsewhere; the engine only
/// reads products and moves stock.
///
/// Stock never goes negative. An unavailable product behaves as if it had no stock.
#[allow(async_fn_in_trait)]
pub trait Catalog {
    async fn fetch_product(&self, product_id: &ProductId) -> Result<Option<Product>, FulfillmentError>;

    /// Decrements the stock of `product_id` by `quantity` if, and only if, the product belongs to `shop_id`, is
    /// available, and has at least `quantity` units in stock. The check and the decrement are one atomic step.
    async fn reserve_stock(
        &self,
        shop_id: &ShopId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Reservation, FulfillmentError>;

    /// Returns `quantity` units to stock. Returns the new stock level.
    async fn release_stock(&self, product_id: &ProductId, quantity: i64) -> Result<i64, FulfillmentError>;
}

#[allow(async_fn_in_trait)]
pub trait ShopDirectory {
    /// Fetches the shop if it exists and is currently trading.
    async fn fetch_active_shop(&self, shop_id: &ShopId) -> Result<Option<Shop>, FulfillmentError>;

    /// Fetches the shop owned by the given vendor, if any.
    async fn fetch_shop_by_owner(&self, owner_id: &str) -> Result<Option<Shop>, FulfillmentError>;
}
