//! # Fulfillment server
//! This crate hosts the HTTP surface of the marketplace fulfillment engine. It is responsible for:
//! * Authenticating callers with access tokens issued by the marketplace identity service, and gating every route on
//!   the caller's role.
//! * Exposing order placement, order queries, status changes and payment initiation to customers, vendors and
//!   administrators.
//! * Receiving MTN Mobile Money payment callbacks and handing them to the engine's reconciler.
//! * Delivering the engine's notifications.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: Authenticated routes. See [routes](routes/index.html).
//! * `/payments/momo/webhook`: Payment callbacks from the mobile money gateway.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod notifier;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
