//! # Backend and collaborator interfaces
//!
//! This module defines the interface contracts the engine relies on. The engine APIs in [`crate::fe_api`] are generic
//! over these traits, so any backend that implements them can drive the engine.
//!
//! * [`FulfillmentDatabase`] is the highest level of backend behaviour: atomic order placement, guarded status
//!   changes and the payment transaction audit trail.
//! * [`Catalog`] and [`ShopDirectory`] expose the slices of the product catalog and shop directory that fulfillment
//!   needs: stock reservation and shop lookups.
//! * [`OrderManagement`] provides read access to orders, their history and their payments.
//! * [`PaymentGateway`] abstracts a payment provider. Mobile money is the only implementation today.
mod catalog;
mod data_objects;
mod fulfillment_database;
mod order_management;
mod payment_gateway;

pub use catalog::{Catalog, Reservation, ShopDirectory};
pub use data_objects::DispositionUpdate;
pub use fulfillment_database::{FulfillmentDatabase, FulfillmentError};
pub use order_management::OrderManagement;
pub use payment_gateway::{PaymentGateway, PaymentGatewayError};
