use std::{net::IpAddr, time::Duration};

use actix_jwt_auth_middleware::use_jwt::UseJWTOnApp;
use actix_web::{
    dev::{Server, Service},
    error::{InternalError, JsonPayloadError, QueryPayloadError},
    http::KeepAlive,
    middleware::Logger,
    web,
    web::ServiceConfig,
    App,
    Error,
    HttpRequest,
    HttpServer,
    ResponseError,
};
use fulfillment_engine::{
    events::{EventHandlers, EventProducers},
    notifications::notifier_hooks,
    traits::{FulfillmentDatabase, PaymentGateway},
    OrderFlowApi,
    OrderQueryApi,
    PaymentApi,
    PlacementApi,
    SqliteDatabase,
    WebhookReconciler,
};
use futures::{future::ok, FutureExt};
use log::*;

use crate::{
    auth::build_fm_authority,
    config::{ServerConfig, ServerOptions},
    errors::{AuthError, ServerError},
    helpers::get_remote_ip,
    integrations::momo::MomoGateway,
    middleware::SignedCallbacks,
    notifier::ServerNotifier,
    routes::{
        health,
        AdminUpdateStatusRoute,
        CanReviewProductRoute,
        CanReviewShopRoute,
        InitiatePaymentRoute,
        MomoWebhookRoute,
        MyOrderRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        OrderHistoryRoute,
        OrderPaymentsRoute,
        PlaceOrderRoute,
        RefreshPaymentRoute,
        SearchOrdersRoute,
        ShopOrderRoute,
        ShopOrdersRoute,
        VendorUpdateStatusRoute,
    },
};

const DB_MAX_CONNECTIONS: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, DB_MAX_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not run migrations. {e}")))?;
    let gateway =
        MomoGateway::new(config.momo.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let notifier = ServerNotifier::from_url(config.notifier_url.as_deref());
    let handlers = EventHandlers::new(config.event_buffer_size, notifier_hooks(notifier));
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: MomoGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let bind_addr = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let placement_api = PlacementApi::new(db.clone(), producers.clone()).with_currency(config.currency.as_str());
        let flow_api = OrderFlowApi::new(db.clone(), producers.clone());
        let query_api = OrderQueryApi::new(db.clone());
        let payment_api = PaymentApi::new(db.clone(), gateway.clone());
        let reconciler = WebhookReconciler::new(db.clone(), producers.clone());
        let authority = build_fm_authority(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("fm::access_log"))
            .app_data(web::Data::new(placement_api))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(payment_api))
            .app_data(web::Data::new(reconciler))
            .configure(configure_extractors);
        // Routes that require authentication
        let auth_scope = web::scope("/api").configure(api_routes::<SqliteDatabase, MomoGateway>);
        let options = ServerOptions::from_config(&config);
        let whitelist = config.webhook.whitelist.clone();
        let webhook_scope = web::scope("/payments/momo")
            .wrap(SignedCallbacks::new(
                &config.webhook.hmac_header,
                config.webhook.hmac_secret.clone(),
                config.webhook.hmac_checks,
            ))
            .wrap_fn(move |req, srv| {
                let peer_ip = get_remote_ip(req.request(), options.use_x_forwarded_for, options.use_forwarded);
                if is_whitelisted(peer_ip, whitelist.as_deref()) {
                    srv.call(req).boxed_local()
                } else {
                    let err = ServerError::AuthenticationError(AuthError::ForbiddenPeer);
                    ok(req.error_response(err)).boxed_local()
                }
            })
            .configure(webhook_routes::<SqliteDatabase>);
        app.use_jwt(authority, auth_scope).service(health).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((bind_addr.0.as_str(), bind_addr.1))?
    .run();
    Ok(srv)
}

/// Registers every route under `/api`. All of them need a valid access token.
pub fn api_routes<B, G>(cfg: &mut ServiceConfig)
where
    B: FulfillmentDatabase + 'static,
    G: PaymentGateway + 'static,
{
    cfg.service(PlaceOrderRoute::<B>::new())
        .service(MyOrdersRoute::<B>::new())
        .service(MyOrderRoute::<B>::new())
        .service(CanReviewProductRoute::<B>::new())
        .service(CanReviewShopRoute::<B>::new())
        .service(ShopOrdersRoute::<B>::new())
        .service(ShopOrderRoute::<B>::new())
        .service(VendorUpdateStatusRoute::<B>::new())
        .service(SearchOrdersRoute::<B>::new())
        .service(OrderByIdRoute::<B>::new())
        .service(OrderHistoryRoute::<B>::new())
        .service(OrderPaymentsRoute::<B>::new())
        .service(AdminUpdateStatusRoute::<B>::new())
        .service(RefreshPaymentRoute::<B, G>::new())
        .service(InitiatePaymentRoute::<B, G>::new());
}

/// Registers the payment gateway callback routes.
pub fn webhook_routes<B: FulfillmentDatabase + 'static>(cfg: &mut ServiceConfig) {
    cfg.service(MomoWebhookRoute::<B>::new());
}

/// Reports unreadable JSON bodies and query strings in the same `{"error": ..}` shape as every other error.
pub fn configure_extractors(cfg: &mut ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error)).app_data(
        web::QueryConfig::default().error_handler(query_error),
    );
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    debug!("💻️ Rejected request body. {err}");
    let server_error = ServerError::InvalidRequestBody(err.to_string());
    let response = server_error.error_response();
    InternalError::from_response(err, response).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> Error {
    debug!("💻️ Rejected query string. {err}");
    let server_error = ServerError::InvalidRequestPath(err.to_string());
    let response = server_error.error_response();
    InternalError::from_response(err, response).into()
}

/// Without a whitelist, every peer is allowed. With one, the peer's address must be known and on the list.
pub fn is_whitelisted(peer_ip: Option<IpAddr>, whitelist: Option<&[IpAddr]>) -> bool {
    match (peer_ip, whitelist) {
        (_, None) => true,
        (Some(ip), Some(whitelist)) => {
            let allowed = whitelist.contains(&ip);
            if allowed {
                debug!("🔐️ Payment callback from {ip}");
            } else {
                warn!("🔐️ Payment callback from {ip}, which is not whitelisted. Denying access.");
            }
            allowed
        },
        (None, Some(_)) => {
            warn!("🔐️ No IP address found in payment callback request. Denying access.");
            false
        },
    }
}
