use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderId, PaymentTransaction, Principal, ProductId, Role, ShopId, StatusHistory},
    fe_api::{
        errors::OrderQueryApiError,
        order_objects::{OrderQueryFilter, ReviewEligibility},
    },
    traits::{OrderManagement, ShopDirectory},
};

/// Read-only access to orders, scoped to what the caller is allowed to see.
///
/// * Customers see their own orders.
/// * Vendors see the orders placed with the shop they own.
/// * Admins see everything.
///
/// An order outside the caller's scope is reported as not found, so its existence is not leaked.
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement + ShopDirectory
{
    /// The customer's orders, newest first.
    pub async fn orders_for_customer(&self, principal: &Principal) -> Result<Vec<Order>, OrderQueryApiError> {
        require_role(principal, Role::Customer)?;
        let orders = self.db.fetch_orders_for_customer(&principal.user_id).await?;
        trace!("💻️ {} orders found for customer {}", orders.len(), principal.user_id);
        Ok(orders)
    }

    pub async fn customer_order(&self, principal: &Principal, order_id: &OrderId) -> Result<Order, OrderQueryApiError> {
        require_role(principal, Role::Customer)?;
        self.db
            .fetch_order(order_id)
            .await?
            .filter(|o| o.customer_id == principal.user_id)
            .ok_or_else(|| OrderQueryApiError::OrderNotFound(order_id.clone()))
    }

    /// Orders placed with the vendor's shop, newest first. A vendor without a shop has no orders.
    pub async fn orders_for_vendor(&self, principal: &Principal) -> Result<Vec<Order>, OrderQueryApiError> {
        let Some(shop_id) = self.vendor_shop(principal).await? else {
            debug!("💻️ Vendor {} does not own a shop", principal.user_id);
            return Ok(Vec::new());
        };
        let orders = self.db.fetch_orders_for_shop(&shop_id).await?;
        Ok(orders)
    }

    pub async fn vendor_order(&self, principal: &Principal, order_id: &OrderId) -> Result<Order, OrderQueryApiError> {
        let shop_id = self.vendor_shop(principal).await?;
        self.db
            .fetch_order(order_id)
            .await?
            .filter(|o| shop_id.as_ref() == Some(&o.shop_id))
            .ok_or_else(|| OrderQueryApiError::OrderNotFound(order_id.clone()))
    }

    pub async fn order_by_id(&self, order_id: &OrderId) -> Result<Order, OrderQueryApiError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| OrderQueryApiError::OrderNotFound(order_id.clone()))
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderQueryApiError> {
        trace!("💻️ Searching orders. {query}");
        let orders = self.db.search_orders(query).await?;
        Ok(orders)
    }

    pub async fn history_for_order(&self, order_id: &OrderId) -> Result<Vec<StatusHistory>, OrderQueryApiError> {
        if self.db.fetch_order(order_id).await?.is_none() {
            return Err(OrderQueryApiError::OrderNotFound(order_id.clone()));
        }
        let history = self.db.fetch_status_history(order_id).await?;
        Ok(history)
    }

    pub async fn payments_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentTransaction>, OrderQueryApiError> {
        let payments = self.db.fetch_payments_for_order(order_id).await?;
        Ok(payments)
    }

    /// A customer may review a product once an order containing it has been delivered to them.
    pub async fn can_review_product(
        &self,
        principal: &Principal,
        product_id: &ProductId,
    ) -> Result<ReviewEligibility, OrderQueryApiError> {
        require_role(principal, Role::Customer)?;
        let eligible = self.db.has_received_product(&principal.user_id, product_id).await?;
        Ok(ReviewEligibility { eligible })
    }

    /// A customer may review a shop once an order from it has been delivered to them.
    pub async fn can_review_shop(
        &self,
        principal: &Principal,
        shop_id: &ShopId,
    ) -> Result<ReviewEligibility, OrderQueryApiError> {
        require_role(principal, Role::Customer)?;
        let eligible = self.db.has_received_from_shop(&principal.user_id, shop_id).await?;
        Ok(ReviewEligibility { eligible })
    }

    async fn vendor_shop(&self, principal: &Principal) -> Result<Option<ShopId>, OrderQueryApiError> {
        require_role(principal, Role::Vendor)?;
        let shop = self.db.fetch_shop_by_owner(&principal.user_id).await?;
        Ok(shop.map(|s| s.id))
    }
}

fn require_role(principal: &Principal, role: Role) -> Result<(), OrderQueryApiError> {
    if principal.role == role {
        Ok(())
    } else {
        Err(OrderQueryApiError::Forbidden)
    }
}
