//! Marketplace Fulfillment Engine
//!
//! The fulfillment engine takes a customer's cart all the way to a delivered (or cancelled) order, and keeps orders in
//! step with what the mobile money gateway says about their payments. It is transport-agnostic: the HTTP surface lives
//! in the server crate.
//!
//! The library is divided into these sections:
//! 1. Domain types ([`mod@db_types`]) and the order state machine ([`mod@state_machine`]). The state machine is a pure
//!    function; it decides transitions but persists nothing.
//! 2. Backend traits ([`mod@traits`]) and their SQLite implementation, [`SqliteDatabase`]. You should never need to
//!    access the database directly. Instead, use the public API.
//! 3. The engine public API ([`mod@fe_api`]): order placement, status changes, scoped queries, payment initiation and
//!    payment reconciliation.
//!
//! The engine also emits events when orders are created, change status, or disagree with the payment gateway. Hooks
//! can be registered for these events; [`notifications::notifier_hooks`] wires them to a [`notifications::Notifier`].
pub mod db_types;
pub mod events;
pub mod fe_api;
pub mod notifications;
pub mod state_machine;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use fe_api::{
    errors::{
        OrderFlowError,
        OrderQueryApiError,
        OrderQueryError,
        PaymentApiError,
        PlacementError,
        ReconcileError,
    },
    order_flow_api::OrderFlowApi,
    order_objects,
    order_query_api::OrderQueryApi,
    payment_api::PaymentApi,
    payment_objects,
    placement_api::PlacementApi,
    reconciler::{ReconcileOutcome, WebhookReconciler},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
