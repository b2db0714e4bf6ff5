//! # Fulfillment engine public API
//!
//! The `fe_api` module exposes the programmatic API for the fulfillment engine. Each API is a thin struct over a
//! backend, so clients pick the pieces they need.
//!
//! * [`placement_api`] turns carts into orders, reserving stock atomically.
//! * [`order_flow_api`] is the single path through which order and payment statuses change.
//! * [`order_query_api`] provides role-scoped read access to orders, their history and review eligibility.
//! * [`payment_api`] starts mobile money collections and polls the gateway for their outcome.
//! * [`reconciler`] applies payment outcomes reported by the gateway to orders.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits the API needs,
//! plus the event producers if the API publishes events.
//!
//! ```rust,ignore
//! use fulfillment_engine::{events::EventProducers, OrderQueryApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/fulfillment.db", 5).await?;
//! let api = OrderQueryApi::new(db);
//! let orders = api.orders_for_customer(&principal).await?;
//! ```
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod order_query_api;
pub mod payment_api;
pub mod payment_objects;
pub mod placement_api;
pub mod reconciler;
