//! A small client for the MTN Mobile Money collection ("request to pay") API.
//!
//! * [`MomoApi`] issues collection requests and status queries.
//! * [`CredentialCache`] holds the bearer token between calls and refreshes it just before it expires.
//! * [`helpers::normalize_msisdn`] turns user-entered phone numbers into the form the gateway accepts.
mod api;
mod config;
mod credentials;
mod data_objects;
mod error;

pub mod helpers;

pub use api::MomoApi;
pub use config::{MomoConfig, DEFAULT_MOMO_BASE_URL, DEFAULT_TARGET_ENVIRONMENT, MOMO_CALLBACK_PATH};
pub use credentials::{AccessToken, Clock, CredentialCache, SystemClock};
pub use data_objects::{
    CollectionReceipt,
    CollectionReport,
    FailureReason,
    Party,
    RequestToPay,
    TokenResponse,
    PARTY_ID_TYPE_MSISDN,
};
pub use error::MomoApiError;
