use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderLine, OrderRequest, Principal, Role, DEFAULT_CURRENCY_CODE},
    events::{EventProducers, OrderCreatedEvent},
    fe_api::errors::PlacementError,
    traits::FulfillmentDatabase,
};

/// `PlacementApi` turns a customer's cart into an order, reserving stock for every line as it does so.
pub struct PlacementApi<B> {
    db: B,
    producers: EventProducers,
    currency: String,
}

impl<B> Debug for PlacementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PlacementApi ({})", self.currency)
    }
}

impl<B> PlacementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, currency: DEFAULT_CURRENCY_CODE.to_string() }
    }

    /// Orders are placed in this currency. The default is the marketplace currency.
    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn currency(&self) -> &str {
        self.currency.as_str()
    }
}

impl<B> PlacementApi<B>
where B: FulfillmentDatabase
{
    /// Places an order on behalf of a customer.
    ///
    /// Checks are made in this order, and the first one to fail determines the error:
    /// 1. the caller is a customer,
    /// 2. the shop exists and is trading,
    /// 3. the cart is not empty, every quantity is at least one, and the address and payment method are filled in,
    /// 4. every product exists, belongs to the shop and is available,
    /// 5. there is enough stock for every line.
    ///
    /// Steps 4 and 5 happen in the same transaction as the stock decrements and the order insert, so a failure on any
    /// line leaves stock exactly as it was. Lines for the same product are merged before anything is reserved.
    ///
    /// Once the order is committed, an [`OrderCreatedEvent`] is published.
    pub async fn place_order(&self, principal: &Principal, request: OrderRequest) -> Result<Order, PlacementError> {
        if principal.role != Role::Customer {
            debug!("🛒️ {principal} tried to place an order, but is not a customer");
            return Err(PlacementError::Forbidden);
        }
        if self.db.fetch_active_shop(&request.shop_id).await?.is_none() {
            debug!("🛒️ Order for shop {} refused. The shop is unavailable", request.shop_id);
            return Err(PlacementError::ShopUnavailable(request.shop_id));
        }
        let new_order = self.validate(principal, request)?;
        let order_id = new_order.id.clone();
        trace!("🛒️ Placing order {order_id} for {} with {} lines", new_order.customer_id, new_order.items.len());
        let order = self.db.insert_order_with_reservations(new_order).await.map_err(|e| {
            debug!("🛒️ Order {order_id} was not placed. {e}");
            PlacementError::from(e)
        })?;
        info!(
            "🛒️ Order {} placed by {} at shop {}. Total {} {}",
            order.id, order.customer_id, order.shop_id, order.total_price, order.currency
        );
        self.producers.publish_order_created(OrderCreatedEvent::new(order.clone())).await;
        Ok(order)
    }

    fn validate(&self, principal: &Principal, request: OrderRequest) -> Result<NewOrder, PlacementError> {
        if request.items.is_empty() {
            return Err(PlacementError::EmptyOrder);
        }
        if let Some(line) = request.items.iter().find(|l| l.quantity < 1) {
            return Err(PlacementError::InvalidQuantity(line.quantity));
        }
        if request.shipping_address.trim().is_empty() {
            return Err(PlacementError::ValidationError("A shipping address is required".into()));
        }
        if request.payment_method.trim().is_empty() {
            return Err(PlacementError::ValidationError("A payment method is required".into()));
        }
        let contact_phone = request.contact_phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        Ok(NewOrder {
            id: OrderId::random(),
            customer_id: principal.user_id.clone(),
            shop_id: request.shop_id,
            items: merge_lines(request.items)?,
            currency: self.currency.clone(),
            shipping_address: request.shipping_address.trim().to_string(),
            contact_phone,
            payment_method: request.payment_method.trim().to_string(),
            created_at: Utc::now(),
        })
    }
}

/// Combines lines for the same product, keeping the order in which products first appear.
fn merge_lines(lines: Vec<OrderLine>) -> Result<Vec<OrderLine>, PlacementError> {
    let mut merged: Vec<OrderLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or(PlacementError::InvalidQuantity(line.quantity))?;
            },
            None => merged.push(line),
        }
    }
    Ok(merged)
}
