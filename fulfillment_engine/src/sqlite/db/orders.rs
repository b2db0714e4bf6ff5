use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Disposition, LineItem, Money, NewOrder, Order, OrderId, OrderStatusType, ProductId, ShopId},
    order_objects::OrderQueryFilter,
};

/// Inserts the order header. This is not atomic on its own; placement calls it inside the same transaction as the
/// stock reservations and the line items.
pub async fn insert_order(order: &NewOrder, total: Money, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                customer_id,
                shop_id,
                total_price,
                currency,
                shipping_address,
                contact_phone,
                payment_method,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING *;
        "#,
    )
    .bind(order.id.as_str())
    .bind(order.customer_id.as_str())
    .bind(order.shop_id.as_str())
    .bind(total)
    .bind(order.currency.as_str())
    .bind(order.shipping_address.as_str())
    .bind(order.contact_phone.as_deref())
    .bind(order.payment_method.as_str())
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order {} inserted with a total of {total}", order.id);
    Ok(order)
}

pub async fn insert_line_item(
    order_id: &OrderId,
    product_id: &ProductId,
    quantity: i64,
    unit_price: Money,
    conn: &mut SqliteConnection,
) -> Result<LineItem, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price) VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(product_id.as_str())
    .bind(quantity)
    .bind(unit_price)
    .fetch_one(conn)
    .await
}

/// Fetches the order header only. Use [`hydrate`] to attach the line items.
pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id.as_str()).fetch_optional(conn).await
}

pub async fn fetch_line_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<LineItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await
}

/// Attaches line items to each order.
pub async fn hydrate(mut orders: Vec<Order>, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    for order in orders.iter_mut() {
        order.items = fetch_line_items(&order.id, &mut *conn).await?;
    }
    Ok(orders)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are sorted newest first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("id = ");
        where_clause.push_bind_unseparated(order_id.0);
    }
    if let Some(cid) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(cid);
    }
    if let Some(shop_id) = query.shop_id {
        where_clause.push("shop_id = ");
        where_clause.push_bind_unseparated(shop_id.0);
    }
    if let Some(currency) = query.currency {
        where_clause.push("currency = ");
        where_clause.push_bind_unseparated(currency);
    }
    // Enum display values are fixed identifiers, so they can be inlined safely
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        let list = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({list})"));
    }
    if let Some(statuses) = query.payment_status.filter(|s| !s.is_empty()) {
        let list = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("payment_status IN ({list})"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC, rowid DESC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(&mut *conn).await?;
    trace!("🗃️ Result of search_orders: {} orders", orders.len());
    hydrate(orders, conn).await
}

/// Moves the order from `expected` to `new` if it is still in `expected`. Returns `None` if the order does not exist
/// or has been changed by someone else in the meantime.
pub async fn compare_and_set_disposition(
    order_id: &OrderId,
    expected: Disposition,
    new: Disposition,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, payment_status = $2, updated_at = $3
            WHERE id = $4 AND status = $5 AND payment_status = $6
            RETURNING *;
        "#,
    )
    .bind(new.status.to_string())
    .bind(new.payment_status.to_string())
    .bind(now)
    .bind(order_id.as_str())
    .bind(expected.status.to_string())
    .bind(expected.payment_status.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn has_received_product(
    customer_id: &str,
    product_id: &ProductId,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        r#"
            SELECT EXISTS (
                SELECT 1 FROM orders o JOIN order_items i ON i.order_id = o.id
                WHERE o.customer_id = $1 AND i.product_id = $2 AND o.status = $3
            )
        "#,
    )
    .bind(customer_id)
    .bind(product_id.as_str())
    .bind(OrderStatusType::Delivered.to_string())
    .fetch_one(conn)
    .await
}

pub async fn has_received_from_shop(
    customer_id: &str,
    shop_id: &ShopId,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM orders WHERE customer_id = $1 AND shop_id = $2 AND status = $3)",
    )
    .bind(customer_id)
    .bind(shop_id.as_str())
    .bind(OrderStatusType::Delivered.to_string())
    .fetch_one(conn)
    .await
}
