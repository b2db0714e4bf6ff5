#![allow(dead_code)]

use std::{
    future::Future,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
        Mutex,
    },
};

use fulfillment_engine::{
    db_types::{Money, Order, OrderLine, OrderRequest, Principal, ShopId},
    events::{EventHandlers, EventHooks},
    notifications::{notifier_hooks, Notification, NotificationKind, Notifier, NotifierError},
    payment_objects::{CollectionAck, CollectionRequest, PaymentCallback},
    test_utils::{prepare_test_env, random_db_path, seed},
    traits::{FulfillmentDatabase, PaymentGateway, PaymentGatewayError},
    OrderFlowApi,
    OrderQueryApi,
    PlacementApi,
    SqliteDatabase,
    WebhookReconciler,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tokio::task::JoinHandle;

#[derive(Default, Clone)]
pub struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

/// Keeps every notification it is given.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> impl Future<Output = Result<(), NotifierError>> + Send {
        self.sent.lock().unwrap().push(notification);
        async { Ok(()) }
    }
}

pub fn count_of(notifications: &[Notification], kind: NotificationKind) -> usize {
    notifications.iter().filter(|n| n.kind == kind).count()
}

/// A payment gateway that accepts or refuses requests as told, and remembers what it was asked.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    pub fail_with: Arc<Mutex<Option<PaymentGatewayError>>>,
    pub requests: Arc<Mutex<Vec<(String, CollectionRequest)>>>,
}

impl ScriptedGateway {
    pub fn fail_next_with(&self, e: PaymentGatewayError) {
        *self.fail_with.lock().unwrap() = Some(e);
    }

    pub fn references(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }
}

impl PaymentGateway for ScriptedGateway {
    fn normalize_payer(&self, raw: &str) -> Result<String, PaymentGatewayError> {
        let mut digits = raw.chars().filter(|c| c.is_ascii_digit()).collect::<String>();
        if digits.len() == 10 && digits.starts_with("07") {
            digits = format!("250{}", &digits[1..]);
        }
        if digits.len() == 12 && digits.starts_with("2507") {
            Ok(digits)
        } else {
            Err(PaymentGatewayError::InvalidPayer(raw.to_string()))
        }
    }

    async fn request_collection(&self, request: CollectionRequest) -> Result<CollectionAck, PaymentGatewayError> {
        if let Some(e) = self.fail_with.lock().unwrap().take() {
            return Err(e);
        }
        let reference_id = request.reference_id.clone();
        self.requests.lock().unwrap().push((reference_id.clone(), request));
        Ok(CollectionAck { reference_id, message: "Payment request sent".into() })
    }

    async fn collection_status(&self, reference_id: &str) -> Result<PaymentCallback, PaymentGatewayError> {
        let requests = self.requests.lock().unwrap();
        let (_, request) = requests
            .iter()
            .find(|(r, _)| r == reference_id)
            .ok_or_else(|| PaymentGatewayError::Rejected(format!("{reference_id} not found")))?;
        Ok(PaymentCallback {
            external_id: Some(request.order_id.to_string()),
            status: Some("SUCCESSFUL".into()),
            financial_transaction_id: Some("fin-0001".into()),
            amount: Some(request.amount.to_string()),
            currency: Some(request.currency.clone()),
            reason: None,
            correlation_id: None,
        })
    }
}

/// A seeded database with every engine API wired to a recording notifier.
pub struct Harness {
    pub db: SqliteDatabase,
    pub placement: PlacementApi<SqliteDatabase>,
    pub flow: OrderFlowApi<SqliteDatabase>,
    pub queries: OrderQueryApi<SqliteDatabase>,
    pub reconciler: WebhookReconciler<SqliteDatabase>,
    notifier: RecordingNotifier,
    handlers: Vec<JoinHandle<()>>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_hooks(EventHooks::default()).await
    }

    pub async fn with_hooks(extra: EventHooks) -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        seed::seed_marketplace(&db).await;
        let notifier = RecordingNotifier::default();
        let hooks = notifier_hooks(notifier.clone()).merge(extra);
        let handlers = EventHandlers::new(16, hooks);
        let producers = handlers.producers();
        let mut tasks = Vec::new();
        tasks.extend(handlers.on_order_created.into_iter().map(|h| tokio::spawn(h.start_handler())));
        tasks.extend(handlers.on_status_changed.into_iter().map(|h| tokio::spawn(h.start_handler())));
        tasks.extend(handlers.on_anomaly.into_iter().map(|h| tokio::spawn(h.start_handler())));
        Self {
            placement: PlacementApi::new(db.clone(), producers.clone()),
            flow: OrderFlowApi::new(db.clone(), producers.clone()),
            queries: OrderQueryApi::new(db.clone()),
            reconciler: WebhookReconciler::new(db.clone(), producers),
            db,
            notifier,
            handlers: tasks,
        }
    }

    pub async fn place(&self, principal: &Principal, lines: &[(&str, i64)]) -> Order {
        let request = cart(seed::SHOP_ID, lines);
        self.placement.place_order(principal, request).await.expect("Error placing order")
    }

    pub async fn stock_of(&self, product_id: &str) -> i64 {
        use fulfillment_engine::traits::Catalog;
        self.db.fetch_product(&product_id.into()).await.unwrap().expect("product exists").stock_quantity
    }

    /// Drops every event producer, waits for the hooks to finish, deletes the database and returns every notification
    /// that was sent.
    pub async fn finish(self) -> Vec<Notification> {
        let Harness { mut db, placement, flow, queries, reconciler, notifier, handlers } = self;
        drop(placement);
        drop(flow);
        drop(queries);
        drop(reconciler);
        futures_util::future::join_all(handlers).await;
        let url = db.url().to_string();
        if let Err(e) = db.close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        let _ = Sqlite::drop_database(&url).await;
        notifier.sent()
    }
}

pub fn cart(shop_id: &str, lines: &[(&str, i64)]) -> OrderRequest {
    OrderRequest {
        shop_id: ShopId::from(shop_id),
        items: lines.iter().map(|(p, q)| OrderLine::new(*p, *q)).collect(),
        shipping_address: "KG 11 Ave, Kigali".into(),
        contact_phone: Some("0788123456".into()),
        payment_method: "mtn_momo".into(),
    }
}

pub fn callback(order: &Order, status: &str) -> PaymentCallback {
    PaymentCallback {
        external_id: Some(order.id.to_string()),
        status: Some(status.to_string()),
        financial_transaction_id: Some("fin-1234".into()),
        amount: Some(order.total_price.to_string()),
        currency: Some(order.currency.clone()),
        reason: None,
        correlation_id: None,
    }
}

pub fn rwf(minor_units: i64) -> Money {
    Money::from(minor_units)
}
