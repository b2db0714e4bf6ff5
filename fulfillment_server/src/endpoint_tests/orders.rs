use actix_web::{
    http::{Method, StatusCode},
    test::TestRequest,
};
use chrono::{Duration, Utc};
use fulfillment_engine::{
    db_types::{Order, OrderStatusType, PaymentStatus, Role, StatusHistory},
    test_utils::seed::{ADMIN_ID, CUSTOMER_ID, OTHER_CUSTOMER_ID, OTHER_VENDOR_ID, SHOP_ID, VENDOR_ID},
};
use log::debug;
use serde_json::{json, Value};

use super::helpers::{issue_token, token_for, TestContext};
use crate::auth::JwtClaims;

fn cart(lines: &[(&str, i64)]) -> Value {
    let items = lines.iter().map(|(p, q)| json!({"product_id": p, "quantity": q})).collect::<Vec<_>>();
    json!({
        "shop_id": SHOP_ID,
        "items": items,
        "shipping_address": "KG 7 Ave, Kigali",
        "contact_phone": "0788123456",
        "payment_method": "MOMO"
    })
}

pub(super) async fn place(ctx: &TestContext, lines: &[(&str, i64)]) -> Order {
    let token = token_for(CUSTOMER_ID, Role::Customer);
    let (status, body) = ctx.send_json(Method::POST, &token, "/api/orders", &cart(lines)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    serde_json::from_str(&body).expect("order json")
}

async fn set_status(ctx: &TestContext, token: &str, path: &str, status: &str) -> (StatusCode, String) {
    ctx.send_json(Method::PATCH, token, path, &json!({"status": status})).await
}

#[actix_web::test]
async fn api_requires_an_access_token() {
    let ctx = TestContext::new().await;
    let (status, _) = ctx.get("", "/api/customer/orders").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    ctx.finish().await;
}

#[actix_web::test]
async fn tampered_and_expired_tokens_are_refused() {
    let ctx = TestContext::new().await;
    let mut token = token_for(CUSTOMER_ID, Role::Customer);
    token.replace_range(token.len() - 10..token.len() - 5, "00000");
    debug!("Calling /api/customer/orders with invalid token {token}");
    let (status, _) = ctx.get(&token, "/api/customer/orders").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = issue_token(JwtClaims::new(CUSTOMER_ID, Role::Customer), Utc::now() - Duration::hours(1));
    let (status, _) = ctx.get(&expired, "/api/customer/orders").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    ctx.finish().await;
}

#[actix_web::test]
async fn only_customers_place_orders() {
    let ctx = TestContext::new().await;
    for (user, role) in [(VENDOR_ID, Role::Vendor), (ADMIN_ID, Role::Admin)] {
        let token = token_for(user, role);
        let (status, body) = ctx.send_json(Method::POST, &token, "/api/orders", &cart(&[("tomato", 1)])).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("may not use this endpoint"), "{body}");
    }
    ctx.finish().await;
}

#[actix_web::test]
async fn customer_places_and_reads_an_order() {
    let ctx = TestContext::new().await;
    let order = place(&ctx, &[("tomato", 2), ("avocado", 1)]).await;
    assert_eq!(order.customer_id, CUSTOMER_ID);
    assert_eq!(order.total_price.value(), 130_000);
    assert_eq!(order.currency, "RWF");
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.items.len(), 2);

    let alice = token_for(CUSTOMER_ID, Role::Customer);
    let (status, body) = ctx.get(&alice, &format!("/api/customer/orders/{}", order.id)).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(fetched.id, order.id);

    let (status, body) = ctx.get(&alice, "/api/customer/orders").await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 1);

    let bob = token_for(OTHER_CUSTOMER_ID, Role::Customer);
    let (status, _) = ctx.get(&bob, &format!("/api/customer/orders/{}", order.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = ctx.get(&bob, "/api/customer/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
    ctx.finish().await;
}

#[actix_web::test]
async fn placement_failures() {
    let ctx = TestContext::new().await;
    let token = token_for(CUSTOMER_ID, Role::Customer);

    let (status, body) = ctx.send_json(Method::POST, &token, "/api/orders", &cart(&[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = ctx.send_json(Method::POST, &token, "/api/orders", &cart(&[("tomato", 0)])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx.send_json(Method::POST, &token, "/api/orders", &cart(&[("pineapple", 2)])).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let mut elsewhere = cart(&[("tomato", 1)]);
    elsewhere["shop_id"] = json!("no-such-shop");
    let (status, _) = ctx.send_json(Method::POST, &token, "/api/orders", &elsewhere).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = TestRequest::post()
        .uri("/api/orders")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"shop_id\": ");
    let (status, body) = ctx.send(req, &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body).expect("errors are json");
    assert!(body["error"].is_string());

    // The single pineapple is still available after all of that
    place(&ctx, &[("pineapple", 1)]).await;
    ctx.finish().await;
}

#[actix_web::test]
async fn vendors_only_manage_their_own_shop() {
    let ctx = TestContext::new().await;
    let order = place(&ctx, &[("tomato", 1)]).await;
    let vera = token_for(VENDOR_ID, Role::Vendor);
    let victor = token_for(OTHER_VENDOR_ID, Role::Vendor);

    let (status, body) = ctx.get(&vera, "/api/vendor/orders").await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 1);
    let (status, body) = ctx.get(&victor, "/api/vendor/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");

    let (status, _) = ctx.get(&victor, &format!("/api/vendor/orders/{}", order.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let path = format!("/api/vendor/orders/{}/status", order.id);
    let (status, _) = set_status(&ctx, &victor, &path, "PREPARING").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = set_status(&ctx, &vera, &path, "PREPARING").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let updated: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(updated.status, OrderStatusType::Preparing);

    let (status, _) = set_status(&ctx, &vera, &path, "PENDING").await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = set_status(&ctx, &vera, &path, "PREPARING").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let alice = token_for(CUSTOMER_ID, Role::Customer);
    let (status, _) = set_status(&ctx, &alice, &path, "CANCELLED").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    ctx.finish().await;
}

#[actix_web::test]
async fn admin_search_and_history() {
    let ctx = TestContext::new().await;
    let order = place(&ctx, &[("avocado", 3)]).await;
    let admin = token_for(ADMIN_ID, Role::Admin);

    let (status, body) = ctx.get(&admin, "/api/admin/orders?shop_id=fresh-greens&status=PENDING,CONFIRMED").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 1);
    let (status, body) = ctx.get(&admin, "/api/admin/orders?shop_id=butchery").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");

    let (status, _) = ctx.get(&admin, "/api/admin/orders?status=LOST").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = ctx.get(&admin, "/api/admin/orders?colour=blue").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let path = format!("/api/admin/orders/{}/status", order.id);
    let (status, body) = set_status(&ctx, &admin, &path, "CANCELLED").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, _) = set_status(&ctx, &admin, &path, "DELIVERED").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx.get(&admin, &format!("/api/admin/orders/{}/history", order.id)).await;
    assert_eq!(status, StatusCode::OK);
    let history: Vec<StatusHistory> = serde_json::from_str(&body).unwrap();
    let last = history.last().expect("history has entries");
    assert_eq!(last.new_status, OrderStatusType::Cancelled);
    assert_eq!(last.actor, ADMIN_ID);

    let (status, _) = ctx.get(&admin, "/api/admin/orders/no-such-order").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let alice = token_for(CUSTOMER_ID, Role::Customer);
    let (status, _) = ctx.get(&alice, "/api/admin/orders").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    ctx.finish().await;
}

#[actix_web::test]
async fn reviews_need_a_delivered_order() {
    let ctx = TestContext::new().await;
    let order = place(&ctx, &[("tomato", 1)]).await;
    let alice = token_for(CUSTOMER_ID, Role::Customer);
    let (status, body) = ctx.get(&alice, "/api/customer/received/product/tomato").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"eligible":false}"#);

    let admin = token_for(ADMIN_ID, Role::Admin);
    let (status, _) = set_status(&ctx, &admin, &format!("/api/admin/orders/{}/status", order.id), "DELIVERED").await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = ctx.get(&alice, "/api/customer/received/product/tomato").await;
    assert_eq!(body, r#"{"eligible":true}"#);
    let (_, body) = ctx.get(&alice, &format!("/api/customer/received/shop/{SHOP_ID}")).await;
    assert_eq!(body, r#"{"eligible":true}"#);
    let (_, body) = ctx.get(&alice, "/api/customer/received/product/avocado").await;
    assert_eq!(body, r#"{"eligible":false}"#);
    let bob = token_for(OTHER_CUSTOMER_ID, Role::Customer);
    let (_, body) = ctx.get(&bob, "/api/customer/received/product/tomato").await;
    assert_eq!(body, r#"{"eligible":false}"#);
    ctx.finish().await;
}
