mod acl;
mod hmac;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use hmac::{SignaturePolicy, SignedCallbacks, SignedCallbacksService};
