//! `SqliteDatabase` is a concrete implementation of a fulfillment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::SqlitePool;

use super::db::{catalog, db_url, history, new_pool, orders, payments};
use crate::{
    db_types::{
        Money,
        NewOrder,
        NewPaymentTransaction,
        Order,
        OrderId,
        OrderStatusType,
        PaymentResolution,
        PaymentTransaction,
        Product,
        ProductId,
        Shop,
        ShopId,
        StatusHistory,
    },
    order_objects::OrderQueryFilter,
    traits::{
        Catalog,
        DispositionUpdate,
        FulfillmentDatabase,
        FulfillmentError,
        OrderManagement,
        Reservation,
        ShopDirectory,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl FulfillmentDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order_with_reservations(&self, order: NewOrder) -> Result<Order, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let mut lines = Vec::with_capacity(order.items.len());
        for line in &order.items {
            if line.quantity < 1 {
                return Err(FulfillmentError::InvalidQuantity(line.quantity));
            }
            // The reservation is the first statement, so this transaction holds the write lock from here on
            match catalog::reserve(&order.shop_id, &line.product_id, line.quantity, &mut tx).await? {
                Reservation::Reserved { .. } => {},
                Reservation::InsufficientStock { available } => {
                    return Err(FulfillmentError::InsufficientStock {
                        product_id: line.product_id.clone(),
                        requested: line.quantity,
                        available,
                    });
                },
                Reservation::ProductUnavailable => {
                    return Err(FulfillmentError::ProductUnavailable(line.product_id.clone()));
                },
            }
            let product = catalog::fetch_product(&line.product_id, &mut tx)
                .await?
                .ok_or_else(|| FulfillmentError::ProductUnavailable(line.product_id.clone()))?;
            lines.push((line, product.price));
        }
        let mut total = Money::default();
        for (line, price) in &lines {
            total = price
                .checked_mul(line.quantity)
                .and_then(|t| total.checked_add(t))
                .ok_or(FulfillmentError::InvalidQuantity(line.quantity))?;
        }
        let mut inserted = orders::insert_order(&order, total, &mut tx).await?;
        for (line, unit_price) in lines {
            let item = orders::insert_line_item(&inserted.id, &line.product_id, line.quantity, unit_price, &mut tx).await?;
            inserted.items.push(item);
        }
        tx.commit().await?;
        debug!("🗃️ Order {} placed with {} line items", inserted.id, inserted.items.len());
        Ok(inserted)
    }

    async fn update_order_disposition(&self, update: DispositionUpdate) -> Result<Option<Order>, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let changed =
            orders::compare_and_set_disposition(&update.order_id, update.expected, update.new, now, &mut tx).await?;
        let Some(mut order) = changed else {
            trace!("🗃️ Order {} is no longer {}. Update skipped", update.order_id, update.expected);
            return Ok(None);
        };
        history::insert_history(&update, now, &mut tx).await?;
        order.items = orders::fetch_line_items(&order.id, &mut tx).await?;
        // Goods only go back on the shelf if the vendor has not started on the order
        let restock = update.new.status == OrderStatusType::Cancelled &&
            matches!(update.expected.status, OrderStatusType::Pending | OrderStatusType::Confirmed);
        if restock {
            for item in &order.items {
                if catalog::release(&item.product_id, item.quantity, &mut tx).await?.is_none() {
                    warn!(
                        "🗃️ Product {} from cancelled order {} no longer exists. {} units could not be restocked.",
                        item.product_id, order.id, item.quantity
                    );
                }
            }
        }
        tx.commit().await?;
        debug!("🗃️ Order {} moved from {} to {}", order.id, update.expected, update.new);
        Ok(Some(order))
    }

    async fn insert_payment_transaction(
        &self,
        transaction: NewPaymentTransaction,
    ) -> Result<PaymentTransaction, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::insert_payment(transaction, &mut conn).await?;
        Ok(payment)
    }

    async fn resolve_payment_transaction(
        &self,
        reference_id: &str,
        resolution: PaymentResolution,
    ) -> Result<Option<PaymentTransaction>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::resolve_payment(reference_id, resolution, &mut conn).await?;
        match &payment {
            Some(p) => debug!("🗃️ Payment {reference_id} resolved as {}", p.status),
            None => debug!("🗃️ Payment {reference_id} is unknown or already resolved"),
        }
        Ok(payment)
    }

    async fn fetch_latest_pending_payment(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<PaymentTransaction>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_latest_pending_payment(order_id, &mut conn).await?;
        Ok(payment)
    }

    async fn close(&mut self) -> Result<(), FulfillmentError> {
        self.pool.close().await;
        Ok(())
    }
}

impl Catalog for SqliteDatabase {
    async fn fetch_product(&self, product_id: &ProductId) -> Result<Option<Product>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn reserve_stock(
        &self,
        shop_id: &ShopId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Reservation, FulfillmentError> {
        if quantity < 1 {
            return Err(FulfillmentError::InvalidQuantity(quantity));
        }
        let mut tx = self.pool.begin().await?;
        let result = catalog::reserve(shop_id, product_id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn release_stock(&self, product_id: &ProductId, quantity: i64) -> Result<i64, FulfillmentError> {
        if quantity < 1 {
            return Err(FulfillmentError::InvalidQuantity(quantity));
        }
        let mut conn = self.pool.acquire().await?;
        catalog::release(product_id, quantity, &mut conn)
            .await?
            .ok_or_else(|| FulfillmentError::ProductUnavailable(product_id.clone()))
    }
}

impl ShopDirectory for SqliteDatabase {
    async fn fetch_active_shop(&self, shop_id: &ShopId) -> Result<Option<Shop>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let shop = catalog::fetch_active_shop(shop_id, &mut conn).await?;
        Ok(shop)
    }

    async fn fetch_shop_by_owner(&self, owner_id: &str) -> Result<Option<Shop>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let shop = catalog::fetch_shop_by_owner(owner_id, &mut conn).await?;
        Ok(shop)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let order = match orders::fetch_order(order_id, &mut conn).await? {
            Some(mut order) => {
                order.items = orders::fetch_line_items(order_id, &mut conn).await?;
                Some(order)
            },
            None => None,
        };
        Ok(order)
    }

    async fn fetch_orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, FulfillmentError> {
        let query = OrderQueryFilter::default().with_customer_id(customer_id.to_string());
        self.search_orders(query).await
    }

    async fn fetch_orders_for_shop(&self, shop_id: &ShopId) -> Result<Vec<Order>, FulfillmentError> {
        let query = OrderQueryFilter::default().with_shop_id(shop_id.clone());
        self.search_orders(query).await
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_status_history(&self, order_id: &OrderId) -> Result<Vec<StatusHistory>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let history = history::fetch_history(order_id, &mut conn).await?;
        Ok(history)
    }

    async fn fetch_payment_transaction(
        &self,
        reference_id: &str,
    ) -> Result<Option<PaymentTransaction>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment(reference_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payments_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentTransaction>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_payments_for_order(order_id, &mut conn).await?;
        Ok(payments)
    }

    async fn has_received_product(&self, customer_id: &str, product_id: &ProductId) -> Result<bool, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let received = orders::has_received_product(customer_id, product_id, &mut conn).await?;
        Ok(received)
    }

    async fn has_received_from_shop(&self, customer_id: &str, shop_id: &ShopId) -> Result<bool, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let received = orders::has_received_from_shop(customer_id, shop_id, &mut conn).await?;
        Ok(received)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `FM_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), FulfillmentError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| FulfillmentError::DatabaseError(e.to_string()))?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
