use fulfillment_engine::{
    db_types::{Money, OrderStatusType, PaymentStatus, Principal, ProductId, Role},
    notifications::NotificationKind,
    test_utils::seed::{self, customer, vendor, OTHER_SHOP_ID, SHOP_ID},
    traits::{OrderManagement, ShopDirectory},
    PlacementError,
};
use futures_util::future::join_all;
use log::*;

mod support;
use support::{cart, count_of, rwf, Harness};

#[tokio::test]
async fn only_one_customer_gets_the_last_pineapple() {
    let h = Harness::new().await;
    let buyers = (0..8).map(|i| Principal::new(format!("buyer-{i}"), Role::Customer)).collect::<Vec<_>>();
    let attempts = buyers.iter().map(|b| h.placement.place_order(b, cart(SHOP_ID, &[("pineapple", 1)])));
    let results = join_all(attempts).await;
    let placed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 1);
    for r in results.iter().filter_map(|r| r.as_ref().err()) {
        match r {
            PlacementError::InsufficientStock { product_id, requested, available } => {
                assert_eq!(product_id.as_str(), "pineapple");
                assert_eq!(*requested, 1);
                assert_eq!(*available, 0);
            },
            e => panic!("Unexpected error: {e}"),
        }
    }
    assert_eq!(h.stock_of("pineapple").await, 0);
    let notifications = h.finish().await;
    assert_eq!(count_of(&notifications, NotificationKind::OrderCreated), 1);
}

#[tokio::test]
async fn total_is_captured_at_order_time() {
    let h = Harness::new().await;
    let order = h.place(&customer(), &[("tomato", 2), ("avocado", 1)]).await;
    assert_eq!(order.total_price, rwf(130_000));
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.currency, "RWF");

    seed::set_price(&h.db, "tomato", 99_999).await;
    let stored = h.db.fetch_order(&order.id).await.unwrap().expect("order exists");
    assert_eq!(stored.total_price, rwf(130_000));
    let tomato = stored.items.iter().find(|i| i.product_id.as_str() == "tomato").unwrap();
    assert_eq!(tomato.unit_price, rwf(50_000));
    let sum = stored.items.iter().map(|i| i.line_total().expect("line total fits")).sum::<Money>();
    assert_eq!(stored.total_price, sum);

    // New orders pick up the new price
    let second = h.place(&customer(), &[("tomato", 1)]).await;
    assert_eq!(second.total_price, rwf(99_999));
    h.finish().await;
}

#[tokio::test]
async fn a_failing_line_rolls_back_the_whole_order() {
    let h = Harness::new().await;
    let err = h
        .placement
        .place_order(&customer(), cart(SHOP_ID, &[("tomato", 5), ("avocado", 11)]))
        .await
        .expect_err("avocado stock is 10");
    match err {
        PlacementError::InsufficientStock { product_id, requested, available } => {
            assert_eq!(product_id, ProductId::from("avocado"));
            assert_eq!(requested, 11);
            assert_eq!(available, 10);
        },
        e => panic!("Unexpected error: {e}"),
    }
    assert_eq!(h.stock_of("tomato").await, 100);
    assert_eq!(h.stock_of("avocado").await, 10);
    let orders = h.db.fetch_orders_for_customer(seed::CUSTOMER_ID).await.unwrap();
    assert!(orders.is_empty());
    let notifications = h.finish().await;
    assert!(notifications.is_empty());
}

#[tokio::test]
async fn duplicate_lines_are_merged() {
    let h = Harness::new().await;
    let order = h.place(&customer(), &[("tomato", 2), ("avocado", 1), ("tomato", 3)]).await;
    assert_eq!(order.items.len(), 2);
    let tomato = order.items.iter().find(|i| i.product_id.as_str() == "tomato").unwrap();
    assert_eq!(tomato.quantity, 5);
    assert_eq!(h.stock_of("tomato").await, 95);
    h.finish().await;
}

#[tokio::test]
async fn placement_checks_happen_in_order() {
    let h = Harness::new().await;
    let p = &h.placement;

    let err = p.place_order(&vendor(), cart(SHOP_ID, &[])).await.unwrap_err();
    assert!(matches!(err, PlacementError::Forbidden), "{err}");

    let err = p.place_order(&customer(), cart("no-such-shop", &[])).await.unwrap_err();
    assert!(matches!(err, PlacementError::ShopUnavailable(_)), "{err}");

    seed::seed_shop(&h.db, "closed-shop", "someone", false).await;
    assert!(h.db.fetch_active_shop(&"closed-shop".into()).await.unwrap().is_none());
    let err = p.place_order(&customer(), cart("closed-shop", &[("tomato", 1)])).await.unwrap_err();
    assert!(matches!(err, PlacementError::ShopUnavailable(_)), "{err}");

    let err = p.place_order(&customer(), cart(SHOP_ID, &[])).await.unwrap_err();
    assert!(matches!(err, PlacementError::EmptyOrder), "{err}");

    let err = p.place_order(&customer(), cart(SHOP_ID, &[("tomato", 1), ("avocado", 0)])).await.unwrap_err();
    assert!(matches!(err, PlacementError::InvalidQuantity(0)), "{err}");

    let overflowing = cart(SHOP_ID, &[("tomato", i64::MAX), ("tomato", 2)]);
    let err = p.place_order(&customer(), overflowing).await.unwrap_err();
    assert!(matches!(err, PlacementError::InvalidQuantity(2)), "{err}");

    let mut blank_address = cart(SHOP_ID, &[("tomato", 1)]);
    blank_address.shipping_address = "   ".into();
    let err = p.place_order(&customer(), blank_address).await.unwrap_err();
    assert!(matches!(err, PlacementError::ValidationError(_)), "{err}");

    let mut no_method = cart(SHOP_ID, &[("tomato", 1)]);
    no_method.payment_method = String::new();
    let err = p.place_order(&customer(), no_method).await.unwrap_err();
    assert!(matches!(err, PlacementError::ValidationError(_)), "{err}");

    // Beef is sold by the butchery, not by this shop
    let err = p.place_order(&customer(), cart(SHOP_ID, &[("beef", 1)])).await.unwrap_err();
    assert!(matches!(err, PlacementError::ProductUnavailable(ref id) if id.as_str() == "beef"), "{err}");
    let err = p.place_order(&customer(), cart(SHOP_ID, &[("mango", 1)])).await.unwrap_err();
    assert!(matches!(err, PlacementError::ProductUnavailable(_)), "{err}");

    seed::set_availability(&h.db, "avocado", false).await;
    let err = p.place_order(&customer(), cart(SHOP_ID, &[("tomato", 1), ("avocado", 1)])).await.unwrap_err();
    assert!(matches!(err, PlacementError::ProductUnavailable(ref id) if id.as_str() == "avocado"), "{err}");
    assert_eq!(h.stock_of("tomato").await, 100);

    let order = p.place_order(&customer(), cart(OTHER_SHOP_ID, &[("beef", 2)])).await.expect("butchery order");
    assert_eq!(order.total_price, rwf(1_800_000));
    info!("🚀️ placement checks complete");
    h.finish().await;
}
