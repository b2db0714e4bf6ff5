use actix_jwt_auth_middleware::AuthenticationService;
use actix_web::{
    body::MessageBody,
    http::{Method, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use chrono::{DateTime, Days, Utc};
use fm_common::Secret;
use fulfillment_engine::{
    db_types::{Order, Role},
    events::EventProducers,
    test_utils::{prepare_test_env, random_db_path, seed::seed_marketplace},
    traits::FulfillmentDatabase,
    OrderFlowApi,
    OrderQueryApi,
    PaymentApi,
    PlacementApi,
    SqliteDatabase,
    WebhookReconciler,
};
use jwt_compact::{
    alg::{Hs256, Hs256Key},
    AlgorithmExt,
    Claims,
    Header,
};
use log::debug;
use serde::Serialize;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use super::mocks::ScriptedGateway;
use crate::{
    auth::{build_fm_authority, JwtClaims, ACCESS_TOKEN_HEADER},
    config::{AuthConfig, DEFAULT_HMAC_HEADER},
    helpers::calculate_hmac,
    middleware::SignedCallbacks,
    routes::health,
    server::{api_routes, configure_extractors, webhook_routes},
};

// DO NOT re-use this secret anywhere.
pub const TEST_JWT_SECRET: &str = "endpoint-tests-only-hs256-secret-0123456789";
pub const TEST_HMAC_SECRET: &str = "endpoint-tests-only-callback-secret";

pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new(TEST_JWT_SECRET)
}

pub fn issue_token(claims: JwtClaims, expiry: DateTime<Utc>) -> String {
    let header = Header::empty().with_token_type("JWT");
    let key = Hs256Key::new(TEST_JWT_SECRET.as_bytes());
    let mut claims = Claims::new(claims);
    claims.expiration = Some(expiry);
    Hs256.token(&header, &claims, &key).expect("Failed to sign token")
}

pub fn token_for(user: &str, role: Role) -> String {
    issue_token(JwtClaims::new(user, role), Utc::now() + Days::new(1))
}

pub fn sign_callback(body: &str) -> String {
    calculate_hmac(TEST_HMAC_SECRET, body.as_bytes())
}

/// A seeded marketplace database and a scripted gateway, served through the same routes and middleware as the real
/// server.
pub struct TestContext {
    pub db: SqliteDatabase,
    pub gateway: ScriptedGateway,
    hmac_checks: bool,
}

impl TestContext {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        seed_marketplace(&db).await;
        Self { db, gateway: ScriptedGateway::default(), hmac_checks: false }
    }

    pub fn with_hmac_checks(mut self) -> Self {
        self.hmac_checks = true;
        self
    }

    pub async fn get(&self, token: &str, path: &str) -> (StatusCode, String) {
        self.send(TestRequest::get().uri(path), token).await
    }

    pub async fn send_json<T: Serialize>(
        &self,
        method: Method,
        token: &str,
        path: &str,
        body: &T,
    ) -> (StatusCode, String) {
        self.send(TestRequest::default().method(method).uri(path).set_json(body), token).await
    }

    pub async fn post_callback(&self, body: &str, signature: Option<&str>) -> (StatusCode, String) {
        let mut req = TestRequest::post()
            .uri("/payments/momo/webhook")
            .insert_header(("Content-Type", "application/json"))
            .set_payload(body.to_string());
        if let Some(signature) = signature {
            req = req.insert_header((DEFAULT_HMAC_HEADER, signature));
        }
        self.send(req, "").await
    }

    /// Middleware rejections arrive as errors rather than responses. Both are flattened into a status and body.
    pub async fn send(&self, req: TestRequest, token: &str) -> (StatusCode, String) {
        let req = if token.is_empty() { req } else { req.insert_header((ACCESS_TOKEN_HEADER, token)) };
        let producers = EventProducers::default();
        let authority = build_fm_authority(&get_auth_config());
        let app = App::new()
            .app_data(web::Data::new(PlacementApi::new(self.db.clone(), producers.clone())))
            .app_data(web::Data::new(OrderFlowApi::new(self.db.clone(), producers.clone())))
            .app_data(web::Data::new(OrderQueryApi::new(self.db.clone())))
            .app_data(web::Data::new(PaymentApi::new(self.db.clone(), self.gateway.clone())))
            .app_data(web::Data::new(WebhookReconciler::new(self.db.clone(), producers)))
            .configure(configure_extractors)
            .service(health)
            .service(
                web::scope("/api")
                    .wrap(AuthenticationService::new(authority))
                    .configure(api_routes::<SqliteDatabase, ScriptedGateway>),
            )
            .service(
                web::scope("/payments/momo")
                    .wrap(SignedCallbacks::new(
                        DEFAULT_HMAC_HEADER,
                        Secret::new(TEST_HMAC_SECRET.to_string()),
                        self.hmac_checks,
                    ))
                    .configure(webhook_routes::<SqliteDatabase>),
            );
        let service = test::init_service(app).await;
        debug!("Making request");
        match test::try_call_service(&service, req.to_request()).await {
            Ok(res) => {
                let status = res.status();
                let body = res.into_body().try_into_bytes().unwrap_or_default();
                (status, String::from_utf8_lossy(&body).into_owned())
            },
            Err(e) => {
                let res = e.error_response();
                let status = res.status();
                let body = res.into_body().try_into_bytes().unwrap_or_default();
                (status, String::from_utf8_lossy(&body).into_owned())
            },
        }
    }

    pub async fn fetch_order(&self, order_id: &str) -> Order {
        let token = token_for("admin", Role::Admin);
        let (status, body) = self.get(&token, &format!("/api/admin/orders/{order_id}")).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        serde_json::from_str(&body).expect("order json")
    }

    pub async fn finish(self) {
        let mut db = self.db;
        let url = db.url().to_string();
        if let Err(e) = db.close().await {
            debug!("Could not close test database {url}: {e}");
        }
        if let Err(e) = Sqlite::drop_database(&url).await {
            debug!("Could not drop test database {url}: {e}");
        }
    }
}
