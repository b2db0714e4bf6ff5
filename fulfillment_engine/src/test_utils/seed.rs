//! Catalog fixtures for tests. Shops and products normally arrive from the catalog service.
use crate::{
    db_types::{Money, Principal, Product, ProductId, Role, Shop, ShopId},
    sqlite::db::catalog,
    SqliteDatabase,
};

pub const CUSTOMER_ID: &str = "alice";
pub const OTHER_CUSTOMER_ID: &str = "bob";
pub const VENDOR_ID: &str = "vera";
pub const OTHER_VENDOR_ID: &str = "victor";
pub const ADMIN_ID: &str = "admin";
pub const SHOP_ID: &str = "fresh-greens";
pub const OTHER_SHOP_ID: &str = "butchery";

pub fn customer() -> Principal {
    Principal::new(CUSTOMER_ID, Role::Customer)
}

pub fn other_customer() -> Principal {
    Principal::new(OTHER_CUSTOMER_ID, Role::Customer)
}

pub fn vendor() -> Principal {
    Principal::new(VENDOR_ID, Role::Vendor)
}

pub fn other_vendor() -> Principal {
    Principal::new(OTHER_VENDOR_ID, Role::Vendor)
}

pub fn admin() -> Principal {
    Principal::new(ADMIN_ID, Role::Admin)
}

pub async fn seed_shop(db: &SqliteDatabase, shop_id: &str, owner_id: &str, is_active: bool) -> Shop {
    let mut conn = db.pool().acquire().await.expect("Could not get a connection");
    catalog::upsert_shop(&ShopId::from(shop_id), owner_id, shop_id, is_active, &mut conn)
        .await
        .expect("Could not seed shop")
}

pub async fn seed_product(db: &SqliteDatabase, product_id: &str, shop_id: &str, price: i64, stock: i64) -> Product {
    let mut conn = db.pool().acquire().await.expect("Could not get a connection");
    catalog::upsert_product(&ProductId::from(product_id), &ShopId::from(shop_id), product_id, Money::from(price), stock, &mut conn)
        .await
        .expect("Could not seed product")
}

pub async fn set_price(db: &SqliteDatabase, product_id: &str, price: i64) {
    let mut conn = db.pool().acquire().await.expect("Could not get a connection");
    catalog::set_product_price(&ProductId::from(product_id), Money::from(price), &mut conn)
        .await
        .expect("Could not change price");
}

pub async fn set_availability(db: &SqliteDatabase, product_id: &str, is_available: bool) {
    let mut conn = db.pool().acquire().await.expect("Could not get a connection");
    catalog::set_product_availability(&ProductId::from(product_id), is_available, &mut conn)
        .await
        .expect("Could not change availability");
}

/// Two shops: `fresh-greens` (owned by `vera`) with tomatoes, avocados and a single pineapple, and `butchery` (owned by
/// `victor`) with beef. Prices are in minor units.
pub async fn seed_marketplace(db: &SqliteDatabase) {
    seed_shop(db, SHOP_ID, VENDOR_ID, true).await;
    seed_shop(db, OTHER_SHOP_ID, OTHER_VENDOR_ID, true).await;
    seed_product(db, "tomato", SHOP_ID, 50_000, 100).await;
    seed_product(db, "avocado", SHOP_ID, 30_000, 10).await;
    seed_product(db, "pineapple", SHOP_ID, 120_000, 1).await;
    seed_product(db, "beef", OTHER_SHOP_ID, 900_000, 20).await;
}
