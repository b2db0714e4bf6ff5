use actix_web::http::{Method, StatusCode};
use fulfillment_engine::{
    db_types::{Order, OrderStatusType, PaymentStatus, PaymentTransaction, PaymentTransactionStatus, Role},
    fe_api::payment_objects::PaymentInitiated,
    test_utils::seed::{ADMIN_ID, CUSTOMER_ID, OTHER_CUSTOMER_ID, VENDOR_ID},
    traits::PaymentGatewayError,
};
use serde_json::{json, Value};

use super::{
    helpers::{token_for, TestContext},
    orders::place,
};

fn payment_for(order: &Order, payer: &str) -> Value {
    json!({
        "order_id": order.id,
        "amount": order.total_price,
        "currency": order.currency,
        "payer": payer,
    })
}

async fn initiate(ctx: &TestContext, user: &str, body: &Value) -> (StatusCode, String) {
    let token = token_for(user, Role::Customer);
    ctx.send_json(Method::POST, &token, "/api/payments/momo/initiate", body).await
}

#[actix_web::test]
async fn customer_initiates_a_payment() {
    let ctx = TestContext::new().await;
    let order = place(&ctx, &[("tomato", 2)]).await;
    let (status, body) = initiate(&ctx, CUSTOMER_ID, &payment_for(&order, "0788 123 456")).await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    let initiated: PaymentInitiated = serde_json::from_str(&body).unwrap();

    let requests = ctx.gateway.requests();
    assert_eq!(requests.len(), 1);
    let (reference, request) = &requests[0];
    assert_eq!(reference, &initiated.transaction_id);
    assert_eq!(request.payer, "250788123456");
    assert_eq!(request.amount.value(), 100_000);

    let admin = token_for(ADMIN_ID, Role::Admin);
    let (status, body) = ctx.get(&admin, &format!("/api/admin/orders/{}/payments", order.id)).await;
    assert_eq!(status, StatusCode::OK);
    let payments: Vec<PaymentTransaction> = serde_json::from_str(&body).unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].reference_id, initiated.transaction_id);
    assert_eq!(payments[0].status, PaymentTransactionStatus::Pending);

    // Nothing changes on the order until the gateway reports back
    let order = ctx.fetch_order(order.id.as_str()).await;
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    ctx.finish().await;
}

#[actix_web::test]
async fn payment_preconditions() {
    let ctx = TestContext::new().await;
    let order = place(&ctx, &[("avocado", 1)]).await;

    let mut wrong_amount = payment_for(&order, "0788123456");
    wrong_amount["amount"] = json!(1);
    let (status, _) = initiate(&ctx, CUSTOMER_ID, &wrong_amount).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut wrong_currency = payment_for(&order, "0788123456");
    wrong_currency["currency"] = json!("USD");
    let (status, _) = initiate(&ctx, CUSTOMER_ID, &wrong_currency).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = initiate(&ctx, CUSTOMER_ID, &payment_for(&order, "12345")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = initiate(&ctx, OTHER_CUSTOMER_ID, &payment_for(&order, "0788123456")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let vendor = token_for(VENDOR_ID, Role::Vendor);
    let (status, _) = ctx
        .send_json(Method::POST, &vendor, "/api/payments/momo/initiate", &payment_for(&order, "0788123456"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = token_for(ADMIN_ID, Role::Admin);
    let path = format!("/api/admin/orders/{}/status", order.id);
    let (status, _) = ctx.send_json(Method::PATCH, &admin, &path, &json!({"status": "CANCELLED"})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = initiate(&ctx, CUSTOMER_ID, &payment_for(&order, "0788123456")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert!(ctx.gateway.requests().is_empty());
    ctx.finish().await;
}

#[actix_web::test]
async fn gateway_failures_map_to_statuses() {
    let ctx = TestContext::new().await;
    let order = place(&ctx, &[("tomato", 1)]).await;
    let cases = [
        (PaymentGatewayError::Rejected("PAYER_NOT_FOUND".into()), StatusCode::UNPROCESSABLE_ENTITY),
        (PaymentGatewayError::AuthFailure("bad subscription key".into()), StatusCode::BAD_GATEWAY),
        (PaymentGatewayError::Timeout, StatusCode::GATEWAY_TIMEOUT),
        (PaymentGatewayError::Unavailable("maintenance".into()), StatusCode::SERVICE_UNAVAILABLE),
    ];
    for (err, expected) in cases {
        ctx.gateway.fail_next(err);
        let (status, body) = initiate(&ctx, CUSTOMER_ID, &payment_for(&order, "0788123456")).await;
        assert_eq!(status, expected, "{body}");
    }
    let admin = token_for(ADMIN_ID, Role::Admin);
    let (_, body) = ctx.get(&admin, &format!("/api/admin/orders/{}/payments", order.id)).await;
    let payments: Vec<PaymentTransaction> = serde_json::from_str(&body).unwrap();
    assert_eq!(payments.len(), 4);
    assert!(payments.iter().all(|p| p.status == PaymentTransactionStatus::Failed));
    assert!(ctx.gateway.requests().is_empty());
    let order = ctx.fetch_order(order.id.as_str()).await;
    assert_eq!(order.status, OrderStatusType::Pending);

    // A later attempt still goes through
    let (status, _) = initiate(&ctx, CUSTOMER_ID, &payment_for(&order, "0788123456")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    ctx.finish().await;
}

#[actix_web::test]
async fn admin_refresh_reconciles_the_payment() {
    let ctx = TestContext::new().await;
    let order = place(&ctx, &[("tomato", 1)]).await;
    let (_, body) = initiate(&ctx, CUSTOMER_ID, &payment_for(&order, "0788123456")).await;
    let initiated: PaymentInitiated = serde_json::from_str(&body).unwrap();
    let admin = token_for(ADMIN_ID, Role::Admin);
    let path = format!("/api/admin/payments/{}/refresh", initiated.transaction_id);

    let (status, body) = ctx.send_json(Method::POST, &admin, &path, &json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let outcome: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(outcome["outcome"], "applied");
    let updated = ctx.fetch_order(order.id.as_str()).await;
    assert_eq!(updated.status, OrderStatusType::Confirmed);
    assert_eq!(updated.payment_status, PaymentStatus::Paid);

    let (status, body) = ctx.send_json(Method::POST, &admin, &path, &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let outcome: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(outcome["outcome"], "duplicate");

    let (_, body) = ctx.get(&admin, &format!("/api/admin/orders/{}/payments", order.id)).await;
    let payments: Vec<PaymentTransaction> = serde_json::from_str(&body).unwrap();
    assert_eq!(payments[0].status, PaymentTransactionStatus::Successful);

    let (status, _) = ctx.send_json(Method::POST, &admin, "/api/admin/payments/nope/refresh", &json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let alice = token_for(CUSTOMER_ID, Role::Customer);
    let (status, _) = ctx.send_json(Method::POST, &alice, &path, &json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    ctx.finish().await;
}
