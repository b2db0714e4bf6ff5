//! Access-token caching for the collection API.
//!
//! Tokens are valid for about an hour. [`CredentialCache`] keeps the current one together with its expiry and hands
//! it out until its remaining lifetime drops below the configured margin. Refreshes are single-flight: callers that
//! find a stale token queue on an async mutex, and only the first of them actually talks to the gateway.
use std::{
    future::Future,
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Duration, Utc};
use fm_common::Secret;
use log::*;
use tokio::sync::Mutex;

use crate::{data_objects::TokenResponse, MomoApiError};

/// A source of the current time. Production code uses [`SystemClock`]; tests substitute a controllable one.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        self.as_ref().now()
    }
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    token: Secret<String>,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: String, expires_at: DateTime<Utc>) -> Self {
        Self { token: Secret::new(token), expires_at }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn reveal(&self) -> &str {
        self.token.reveal().as_str()
    }

    /// `true` while more than `margin` of the token's lifetime remains.
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - now > margin
    }
}

pub struct CredentialCache<C = SystemClock> {
    clock: C,
    margin: Duration,
    current: RwLock<Option<AccessToken>>,
    refresh_lock: Mutex<()>,
}

impl<C: Clock> CredentialCache<C> {
    pub fn new(clock: C, margin: Duration) -> Self {
        Self { clock, margin, current: RwLock::new(None), refresh_lock: Mutex::new(()) }
    }

    /// Returns the cached token if it is still fresh.
    pub fn cached(&self) -> Option<AccessToken> {
        let now = self.clock.now();
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.as_ref().filter(|t| t.is_fresh(now, self.margin)).cloned()
    }

    /// Drops the cached token, e.g. after the gateway rejected it before its advertised expiry.
    pub fn invalidate(&self) {
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
    }

    /// Returns a fresh token, calling `refresh` at most once across all concurrent callers when the cache is stale.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<AccessToken, MomoApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TokenResponse, MomoApiError>>,
    {
        if let Some(token) = self.cached() {
            return Ok(token);
        }
        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = self.cached() {
            trace!("🔐️ Access token was refreshed by a concurrent request");
            return Ok(token);
        }
        let requested_at = self.clock.now();
        debug!("🔐️ Requesting a new gateway access token");
        let response = refresh().await?;
        if response.expires_in <= 0 {
            return Err(MomoApiError::AuthFailure(format!("Token lifetime of {}s is not usable", response.expires_in)));
        }
        // Lifetime counts from when we asked, so network latency eats into the margin rather than past it
        let token = AccessToken::new(response.access_token, requested_at + Duration::seconds(response.expires_in));
        if !token.is_fresh(requested_at, self.margin) {
            warn!(
                "🔐️ The gateway issued a token valid for {}s, which is inside the refresh margin. Every request will \
                 fetch a new token.",
                response.expires_in
            );
        }
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(token.clone());
        info!("🔐️ Obtained gateway access token, valid until {}", token.expires_at);
        Ok(token)
    }
}
