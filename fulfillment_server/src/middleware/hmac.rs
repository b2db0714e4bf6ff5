//! Signature checks for payment callbacks.
//!
//! A callback may be signed by the gateway, or by the proxy that relays it, with a shared secret. The signature is the
//! base64-encoded HMAC-SHA256 of the raw request body and travels in a configurable header (`X-Callback-Signature` by
//! default). Unsigned or tampered callbacks are refused with `403` before they reach a handler.
//!
//! The body has to be read in full to check it, so it is put back on the request afterwards for the handler's own
//! extractors.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::HeaderMap,
    web,
    Error,
};
use fm_common::Secret;
use futures::future::LocalBoxFuture;
use log::{debug, trace, warn};

use crate::{
    errors::{AuthError, ServerError},
    helpers::verify_hmac,
};

/// What the webhook scope demands of incoming callbacks.
#[derive(Clone)]
pub enum SignaturePolicy {
    /// Every callback is let through unchecked
    Unchecked,
    Required { header: String, key: Secret<String> },
}

impl SignaturePolicy {
    pub fn new(header: &str, key: Secret<String>, enabled: bool) -> Self {
        if enabled {
            Self::Required { header: header.to_string(), key }
        } else {
            Self::Unchecked
        }
    }

    /// Checks `body` against the signature in `headers`. Always succeeds for [`SignaturePolicy::Unchecked`].
    pub fn check(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AuthError> {
        let Self::Required { header, key } = self else {
            return Ok(());
        };
        let signature = headers
            .get(header.as_str())
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.trim().is_empty())
            .ok_or(AuthError::MissingSignature)?;
        if verify_hmac(key.reveal(), body, signature.trim()) {
            Ok(())
        } else {
            Err(AuthError::InvalidSignature)
        }
    }
}

/// Wraps a scope so that only correctly signed callbacks get through.
pub struct SignedCallbacks {
    policy: SignaturePolicy,
}

impl SignedCallbacks {
    pub fn new(header: &str, key: Secret<String>, enabled: bool) -> Self {
        Self { policy: SignaturePolicy::new(header, key, enabled) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignedCallbacks
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignedCallbacksService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignedCallbacksService { policy: Rc::new(self.policy.clone()), service: Rc::new(service) }))
    }
}

pub struct SignedCallbacksService<S> {
    policy: Rc<SignaturePolicy>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignedCallbacksService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let policy = Rc::clone(&self.policy);
        Box::pin(async move {
            if matches!(*policy, SignaturePolicy::Unchecked) {
                trace!("🔐️ Callback signatures are not checked");
                return service.call(req).await;
            }
            let body = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Could not read callback body. {e}");
                ServerError::InvalidRequestBody("Could not read the request body.".into())
            })?;
            if let Err(e) = policy.check(req.headers(), &body) {
                warn!("🔐️ Refusing callback from {:?}. {e}", req.peer_addr());
                return Err(ServerError::AuthenticationError(e).into());
            }
            debug!("🔐️ Callback signature verified");
            req.set_payload(replay(body));
            service.call(req).await
        })
    }
}

fn replay(body: web::Bytes) -> Payload {
    let (_, mut payload) = h1::Payload::create(true);
    payload.unread_data(body);
    Payload::from(payload)
}
