//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use fulfillment_engine::{
    db_types::{OrderId, OrderRequest, ProductId, Role, ShopId},
    order_objects::{OrderQueryFilter, StatusUpdateRequest},
    payment_objects::{InitiatePayment, PaymentCallback},
    traits::{FulfillmentDatabase, PaymentGateway},
    OrderFlowApi,
    OrderQueryApi,
    PaymentApi,
    PlacementApi,
    ReconcileError,
    WebhookReconciler,
};
use log::*;

use crate::{
    auth::JwtClaims,
    data_objects::{OrderSearchParams, WebhookAck},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Placement  ----------------------------------------------------
route!(place_order => Post "/orders" impl FulfillmentDatabase where requires [Role::Customer]);
/// Route handler for order placement
///
/// Customers submit their cart for a single shop. Stock for every line is reserved and the order is recorded in one
/// atomic step; either all of it happens, or none of it does. Prices are taken from the catalog at this moment, so the
/// order total does not move if the catalog price changes later.
///
/// Returns `201 Created` with the new order.
pub async fn place_order<B: FulfillmentDatabase>(
    claims: JwtClaims,
    body: web::Json<OrderRequest>,
    api: web::Data<PlacementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let principal = claims.principal();
    debug!("💻️ POST place_order for {principal}");
    let order = api.place_order(&principal, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

//----------------------------------------------   Customer  ----------------------------------------------------
route!(my_orders => Get "/customer/orders" impl FulfillmentDatabase where requires [Role::Customer]);
/// Route handler for the customer's own orders, newest first.
pub async fn my_orders<B: FulfillmentDatabase>(
    claims: JwtClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for {}", claims.sub);
    let orders = api.orders_for_customer(&claims.principal()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(my_order => Get "/customer/orders/{id}" impl FulfillmentDatabase where requires [Role::Customer]);
/// Route handler for one of the customer's own orders. Orders belonging to anyone else are reported as not found.
pub async fn my_order<B: FulfillmentDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET my_order {order_id} for {}", claims.sub);
    let order = api.customer_order(&claims.principal(), &order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(can_review_product => Get "/customer/received/product/{id}" impl FulfillmentDatabase where requires [Role::Customer]);
pub async fn can_review_product<B: FulfillmentDatabase>(
    claims: JwtClaims,
    path: web::Path<ProductId>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    trace!("💻️ GET can_review_product {product_id} for {}", claims.sub);
    let result = api.can_review_product(&claims.principal(), &product_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(can_review_shop => Get "/customer/received/shop/{id}" impl FulfillmentDatabase where requires [Role::Customer]);
pub async fn can_review_shop<B: FulfillmentDatabase>(
    claims: JwtClaims,
    path: web::Path<ShopId>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let shop_id = path.into_inner();
    trace!("💻️ GET can_review_shop {shop_id} for {}", claims.sub);
    let result = api.can_review_shop(&claims.principal(), &shop_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Vendor  ----------------------------------------------------
route!(shop_orders => Get "/vendor/orders" impl FulfillmentDatabase where requires [Role::Vendor]);
/// Route handler for the orders placed with the vendor's shop. Vendors without a shop get an empty list.
pub async fn shop_orders<B: FulfillmentDatabase>(
    claims: JwtClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET shop_orders for {}", claims.sub);
    let orders = api.orders_for_vendor(&claims.principal()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(shop_order => Get "/vendor/orders/{id}" impl FulfillmentDatabase where requires [Role::Vendor]);
/// Route handler for an order of the vendor's shop. Orders of other shops are reported as not found.
pub async fn shop_order<B: FulfillmentDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET shop_order {order_id} for {}", claims.sub);
    let order = api.vendor_order(&claims.principal(), &order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(vendor_update_status => Patch "/vendor/orders/{id}/status" impl FulfillmentDatabase where requires [Role::Vendor]);
/// Route handler for vendors moving their own shop's orders along. Orders of other shops are refused with a 403.
pub async fn vendor_update_status<B: FulfillmentDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    update_status(claims, path.into_inner(), body.into_inner(), api.as_ref()).await
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(search_orders => Get "/admin/orders" impl FulfillmentDatabase where requires [Role::Admin]);
/// Route handler for the admin order search.
///
/// All query parameters are optional and are combined with AND:
/// * `order_id`, `customer_id`, `shop_id`, `currency` match exactly.
/// * `since` and `until` are RFC 3339 timestamps bounding the creation time.
/// * `status` and `payment_status` are comma-separated lists, e.g. `?status=PENDING,CONFIRMED`.
pub async fn search_orders<B: FulfillmentDatabase>(
    query: web::Query<OrderSearchParams>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let filter = OrderQueryFilter::try_from(query.into_inner())
        .map_err(|e| ServerError::InvalidRequestPath(e.to_string()))?;
    debug!("💻️ GET search_orders. {filter}");
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/admin/orders/{id}" impl FulfillmentDatabase where requires [Role::Admin]);
pub async fn order_by_id<B: FulfillmentDatabase>(
    path: web::Path<OrderId>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order_by_id {order_id}");
    let order = api.order_by_id(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_history => Get "/admin/orders/{id}/history" impl FulfillmentDatabase where requires [Role::Admin]);
/// Route handler for the status history of an order, oldest first.
pub async fn order_history<B: FulfillmentDatabase>(
    path: web::Path<OrderId>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order_history {order_id}");
    let history = api.history_for_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(history))
}

route!(order_payments => Get "/admin/orders/{id}/payments" impl FulfillmentDatabase where requires [Role::Admin]);
/// Route handler for every payment attempt made for an order.
pub async fn order_payments<B: FulfillmentDatabase>(
    path: web::Path<OrderId>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order_payments {order_id}");
    let payments = api.payments_for_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(payments))
}

route!(admin_update_status => Patch "/admin/orders/{id}/status" impl FulfillmentDatabase where requires [Role::Admin]);
pub async fn admin_update_status<B: FulfillmentDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    update_status(claims, path.into_inner(), body.into_inner(), api.as_ref()).await
}

async fn update_status<B: FulfillmentDatabase>(
    claims: JwtClaims,
    order_id: OrderId,
    request: StatusUpdateRequest,
    api: &OrderFlowApi<B>,
) -> Result<HttpResponse, ServerError> {
    let principal = claims.principal();
    info!("💻️ PATCH status of {order_id} to {} by {principal}", request.status);
    let outcome = api.update_status(&principal, &order_id, request).await?;
    Ok(HttpResponse::Ok().json(outcome.order))
}

route!(refresh_payment => Post "/admin/payments/{reference}/refresh" impl FulfillmentDatabase, PaymentGateway where requires [Role::Admin]);
/// Route handler for pulling the outcome of a payment attempt from the gateway.
///
/// Use this when a callback never arrived. The gateway's answer is reconciled exactly as if it had been delivered to
/// the webhook, so it is safe to call repeatedly.
pub async fn refresh_payment<B: FulfillmentDatabase, G: PaymentGateway>(
    path: web::Path<String>,
    payments: web::Data<PaymentApi<B, G>>,
    reconciler: web::Data<WebhookReconciler<B>>,
) -> Result<HttpResponse, ServerError> {
    let reference = path.into_inner();
    info!("💻️ POST refresh_payment for {reference}");
    let callback = payments.collection_status(&reference).await?;
    let outcome = reconciler.handle_callback(callback).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(initiate_payment => Post "/payments/momo/initiate" impl FulfillmentDatabase, PaymentGateway where requires [Role::Customer]);
/// Route handler for starting a mobile money payment for one of the caller's orders.
///
/// The payer gets a prompt on their handset. The order itself is only updated once the gateway reports the outcome to
/// the webhook. Returns `202 Accepted` with the reference of this attempt.
pub async fn initiate_payment<B: FulfillmentDatabase, G: PaymentGateway>(
    claims: JwtClaims,
    body: web::Json<InitiatePayment>,
    api: web::Data<PaymentApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let principal = claims.principal();
    let request = body.into_inner();
    info!("💻️ POST initiate_payment for order {} by {principal}", request.order_id);
    let result = api.initiate_payment(&principal, request).await?;
    Ok(HttpResponse::Accepted().json(result))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(momo_webhook => Post "/webhook" impl FulfillmentDatabase);
/// Route handler for mobile money payment callbacks.
///
/// The gateway retries deliveries it considers failed, so every well-formed callback is acknowledged with
/// `{"received": true}`, whatever the reconciler made of it. Only unreadable payloads (400) and database faults (500)
/// are reported as errors, the latter so that the gateway delivers the callback again.
pub async fn momo_webhook<B: FulfillmentDatabase>(
    body: web::Bytes,
    api: web::Data<WebhookReconciler<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received payment callback");
    let callback = serde_json::from_slice::<PaymentCallback>(body.as_ref()).map_err(|e| {
        warn!("💻️ Could not deserialize payment callback. {e}. {}", String::from_utf8_lossy(body.as_ref()));
        ServerError::from(ReconcileError::MalformedPayload(e.to_string()))
    })?;
    let outcome = api.handle_callback(callback).await?;
    info!("💻️ Payment callback handled: {outcome}");
    Ok(HttpResponse::Ok().json(WebhookAck::received()))
}
