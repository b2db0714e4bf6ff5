use actix_web::http::{Method, StatusCode};
use fulfillment_engine::{
    db_types::{Order, OrderStatusType, PaymentStatus, Role},
    fe_api::payment_objects::PaymentInitiated,
    test_utils::seed::CUSTOMER_ID,
};
use serde_json::json;

use super::{
    helpers::{sign_callback, token_for, TestContext},
    orders::place,
};

const ACK: &str = r#"{"received":true}"#;

fn callback(order_id: &str, status: &str, reference: Option<&str>) -> String {
    let mut body = json!({
        "externalId": order_id,
        "status": status,
        "financialTransactionId": "1234567890",
        "amount": "50000",
        "currency": "RWF",
    });
    if let Some(reference) = reference {
        body["referenceId"] = json!(reference);
    }
    body.to_string()
}

async fn start_payment(ctx: &TestContext, order: &Order) -> String {
    let token = token_for(CUSTOMER_ID, Role::Customer);
    let body = json!({
        "order_id": order.id,
        "amount": order.total_price,
        "currency": order.currency,
        "payer": "0788123456",
    });
    let (status, body) = ctx.send_json(Method::POST, &token, "/api/payments/momo/initiate", &body).await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    serde_json::from_str::<PaymentInitiated>(&body).unwrap().transaction_id
}

#[actix_web::test]
async fn successful_callback_confirms_the_order() {
    let ctx = TestContext::new().await;
    let order = place(&ctx, &[("tomato", 1)]).await;
    let reference = start_payment(&ctx, &order).await;

    let body = callback(order.id.as_str(), "SUCCESSFUL", Some(&reference));
    let (status, response) = ctx.post_callback(&body, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, ACK);
    let updated = ctx.fetch_order(order.id.as_str()).await;
    assert_eq!(updated.status, OrderStatusType::Confirmed);
    assert_eq!(updated.payment_status, PaymentStatus::Paid);

    // Redelivery is acknowledged and changes nothing
    let (status, response) = ctx.post_callback(&body, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, ACK);
    let again = ctx.fetch_order(order.id.as_str()).await;
    assert_eq!(again.updated_at, updated.updated_at);
    ctx.finish().await;
}

#[actix_web::test]
async fn failed_callback_cancels_and_restocks() {
    let ctx = TestContext::new().await;
    let order = place(&ctx, &[("pineapple", 1)]).await;
    start_payment(&ctx, &order).await;

    let (status, response) = ctx.post_callback(&callback(order.id.as_str(), "FAILED", None), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, ACK);
    let updated = ctx.fetch_order(order.id.as_str()).await;
    assert_eq!(updated.status, OrderStatusType::Cancelled);
    assert_eq!(updated.payment_status, PaymentStatus::Failed);

    // The pineapple went back on the shelf
    place(&ctx, &[("pineapple", 1)]).await;
    ctx.finish().await;
}

#[actix_web::test]
async fn callbacks_that_change_nothing_are_still_acknowledged() {
    let ctx = TestContext::new().await;
    let order = place(&ctx, &[("avocado", 2)]).await;

    for body in [
        callback("no-such-order", "SUCCESSFUL", None),
        callback(order.id.as_str(), "PENDING", None),
        callback(order.id.as_str(), "ONGOING", None),
    ] {
        let (status, response) = ctx.post_callback(&body, None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(response, ACK);
    }
    let unchanged = ctx.fetch_order(order.id.as_str()).await;
    assert_eq!(unchanged.status, OrderStatusType::Pending);
    assert_eq!(unchanged.payment_status, PaymentStatus::Pending);
    ctx.finish().await;
}

#[actix_web::test]
async fn malformed_callbacks_are_rejected() {
    let ctx = TestContext::new().await;
    let (status, body) = ctx.post_callback("this is not json", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("error"), "{body}");

    let (status, _) = ctx.post_callback(r#"{"status": "SUCCESSFUL"}"#, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = ctx.post_callback(r#"{"externalId": "  ", "status": "SUCCESSFUL"}"#, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    ctx.finish().await;
}

#[actix_web::test]
async fn signed_callbacks() {
    let ctx = TestContext::new().await.with_hmac_checks();
    let order = place(&ctx, &[("tomato", 1)]).await;
    let body = callback(order.id.as_str(), "SUCCESSFUL", None);

    let (status, _) = ctx.post_callback(&body, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = ctx.post_callback(&body, Some("bm90IGEgc2lnbmF0dXJl")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let order_now = ctx.fetch_order(order.id.as_str()).await;
    assert_eq!(order_now.payment_status, PaymentStatus::Pending);

    let signature = sign_callback(&body);
    let (status, response) = ctx.post_callback(&body, Some(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, ACK);
    let order_now = ctx.fetch_order(order.id.as_str()).await;
    assert_eq!(order_now.payment_status, PaymentStatus::Paid);
    ctx.finish().await;
}
