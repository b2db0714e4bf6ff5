use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Money, Product, ProductId, Shop, ShopId},
    traits::Reservation,
};

/// Decrements stock only if the product belongs to the shop, is available and has enough units. When nothing
/// matches, the product is read again to tell the caller why.
pub async fn reserve(
    shop_id: &ShopId,
    product_id: &ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Reservation, sqlx::Error> {
    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
            UPDATE products SET stock_quantity = stock_quantity - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND shop_id = $3 AND is_available AND stock_quantity >= $1
            RETURNING stock_quantity
        "#,
    )
    .bind(quantity)
    .bind(product_id.as_str())
    .bind(shop_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(remaining) = remaining {
        trace!("🗃️ Reserved {quantity} x {product_id}. {remaining} left in stock");
        return Ok(Reservation::Reserved { remaining });
    }
    let result = match fetch_product(product_id, conn).await? {
        Some(p) if p.shop_id == *shop_id && p.is_available => {
            Reservation::InsufficientStock { available: p.stock_quantity }
        },
        _ => Reservation::ProductUnavailable,
    };
    debug!("🗃️ Could not reserve {quantity} x {product_id}: {result:?}");
    Ok(result)
}

/// Returns units to stock. Returns the new stock level, or `None` if the product no longer exists.
pub async fn release(
    product_id: &ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, sqlx::Error> {
    let stock = sqlx::query_scalar(
        r#"
            UPDATE products SET stock_quantity = stock_quantity + $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING stock_quantity
        "#,
    )
    .bind(quantity)
    .bind(product_id.as_str())
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Released {quantity} x {product_id}. Stock is now {stock:?}");
    Ok(stock)
}

pub async fn fetch_product(product_id: &ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id.as_str()).fetch_optional(conn).await
}

pub async fn fetch_active_shop(shop_id: &ShopId, conn: &mut SqliteConnection) -> Result<Option<Shop>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM shops WHERE id = $1 AND is_active").bind(shop_id.as_str()).fetch_optional(conn).await
}

pub async fn fetch_shop_by_owner(owner_id: &str, conn: &mut SqliteConnection) -> Result<Option<Shop>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM shops WHERE owner_id = $1 ORDER BY created_at ASC LIMIT 1")
        .bind(owner_id)
        .fetch_optional(conn)
        .await
}

//--------------------------------------  Catalog maintenance  ---------------------------------------------------------
// Shops and products are owned by the catalog service. These are used to mirror its records and to seed test data.

pub async fn upsert_shop(
    shop_id: &ShopId,
    owner_id: &str,
    name: &str,
    is_active: bool,
    conn: &mut SqliteConnection,
) -> Result<Shop, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO shops (id, owner_id, name, is_active) VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET owner_id = excluded.owner_id, name = excluded.name,
                is_active = excluded.is_active
            RETURNING *
        "#,
    )
    .bind(shop_id.as_str())
    .bind(owner_id)
    .bind(name)
    .bind(is_active)
    .fetch_one(conn)
    .await
}

pub async fn upsert_product(
    product_id: &ProductId,
    shop_id: &ShopId,
    name: &str,
    price: Money,
    stock_quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO products (id, shop_id, name, price, stock_quantity) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET shop_id = excluded.shop_id, name = excluded.name, price = excluded.price,
                stock_quantity = excluded.stock_quantity, updated_at = CURRENT_TIMESTAMP
            RETURNING *
        "#,
    )
    .bind(product_id.as_str())
    .bind(shop_id.as_str())
    .bind(name)
    .bind(price)
    .bind(stock_quantity)
    .fetch_one(conn)
    .await
}

pub async fn set_product_price(
    product_id: &ProductId,
    price: Money,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("UPDATE products SET price = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
        .bind(price)
        .bind(product_id.as_str())
        .fetch_optional(conn)
        .await
}

pub async fn set_product_availability(
    product_id: &ProductId,
    is_available: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("UPDATE products SET is_available = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
        .bind(is_available)
        .bind(product_id.as_str())
        .fetch_optional(conn)
        .await
}
