//! Access tokens are issued by the marketplace's identity service and signed with a shared HS256 secret. This server
//! only verifies them; [`TokenIssuer`] exists for tooling and tests.
use std::time::Duration;

use actix_jwt_auth_middleware::{Authority, FromRequest, TokenSigner};
use actix_web::error::Error as ActixWebError;
use fulfillment_engine::db_types::{Principal, Role};
use futures::future::{ready, Ready};
use jwt_compact::{
    alg::{Hs256, Hs256Key},
    Header,
};
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, errors::ServerError};

/// The request header that carries the access token.
pub const ACCESS_TOKEN_HEADER: &str = "access_token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRequest)]
pub struct JwtClaims {
    /// The user id
    pub sub: String,
    pub role: Role,
}

impl JwtClaims {
    pub fn new<S: Into<String>>(sub: S, role: Role) -> Self {
        Self { sub: sub.into(), role }
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.sub.clone(), self.role)
    }
}

pub type RefreshAuthorizer = fn() -> Ready<Result<(), ActixWebError>>;

pub type FmAuthority = Authority<JwtClaims, Hs256, RefreshAuthorizer, ()>;

fn allow_refresh() -> Ready<Result<(), ActixWebError>> {
    ready(Ok(()))
}

fn signing_key(auth_config: &AuthConfig) -> Hs256Key {
    Hs256Key::new(auth_config.jwt_secret.reveal().as_bytes())
}

fn build_jwt_signer(key: Hs256Key) -> TokenSigner<JwtClaims, Hs256> {
    let header = Header::empty().with_token_type("JWT");
    TokenSigner::new()
        .signing_key(key)
        .algorithm(Hs256)
        .header(header)
        .build()
        .expect("Failed to build token signer")
}

pub fn build_fm_authority(auth_config: &AuthConfig) -> FmAuthority {
    let key = signing_key(auth_config);
    let token_signer = build_jwt_signer(key.clone());
    Authority::<JwtClaims, Hs256, RefreshAuthorizer, ()>::new()
        .refresh_authorizer(allow_refresh as RefreshAuthorizer)
        .enable_header_tokens(true)
        .algorithm(Hs256)
        .verifying_key(key)
        .token_signer(Some(token_signer))
        .build()
        .expect("Failed to build authority")
}

pub struct TokenIssuer {
    signer: TokenSigner<JwtClaims, Hs256>,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let signer = build_jwt_signer(signing_key(config));
        Self { signer }
    }

    /// Issue an access token for the given user. This does not check that the user exists or holds the role.
    pub fn issue_token(&self, claims: JwtClaims, duration: Option<Duration>) -> Result<String, ServerError> {
        let duration = duration.unwrap_or_else(|| Duration::from_secs(60 * 60 * 24));
        self.signer
            .create_signed_token(&claims, duration)
            .map_err(|e| ServerError::Unspecified(format!("Could not sign access token. {e:?}")))
    }
}
