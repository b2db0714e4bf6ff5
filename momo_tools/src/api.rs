use std::sync::Arc;

use chrono::Duration;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    StatusCode,
};
use uuid::Uuid;

use crate::{
    config::MomoConfig,
    credentials::{AccessToken, Clock, CredentialCache, SystemClock},
    data_objects::{CollectionReceipt, CollectionReport, RequestToPay, TokenResponse},
    MomoApiError,
};

/// Client for the collection product of the MTN MoMo Open API.
///
/// Cheap to clone: the HTTP client and the credential cache are shared between clones, so every clone benefits from
/// a token obtained by any other.
pub struct MomoApi<C = SystemClock> {
    config: MomoConfig,
    client: Arc<Client>,
    credentials: Arc<CredentialCache<C>>,
}

impl<C> Clone for MomoApi<C> {
    fn clone(&self) -> Self {
        Self { config: self.config.clone(), client: Arc::clone(&self.client), credentials: Arc::clone(&self.credentials) }
    }
}

impl MomoApi<SystemClock> {
    pub fn new(config: MomoConfig) -> Result<Self, MomoApiError> {
        Self::new_with_clock(config, SystemClock)
    }
}

impl<C: Clock> MomoApi<C> {
    pub fn new_with_clock(config: MomoConfig, clock: C) -> Result<Self, MomoApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let val = HeaderValue::from_str(config.subscription_key.reveal().as_str())
            .map_err(|e| MomoApiError::Initialization(e.to_string()))?;
        headers.insert("Ocp-Apim-Subscription-Key", val);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| MomoApiError::Initialization(e.to_string()))?;
        let margin = Duration::from_std(config.token_refresh_margin)
            .map_err(|e| MomoApiError::Initialization(format!("Invalid token refresh margin. {e}")))?;
        let credentials = CredentialCache::new(clock, margin);
        Ok(Self { config, client: Arc::new(client), credentials: Arc::new(credentials) })
    }

    pub fn config(&self) -> &MomoConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Returns a bearer token for the collection product, fetching a new one only when the cached one is about to
    /// expire.
    pub async fn access_token(&self) -> Result<AccessToken, MomoApiError> {
        self.credentials.get_or_refresh(|| self.fetch_token()).await
    }

    async fn fetch_token(&self) -> Result<TokenResponse, MomoApiError> {
        let url = self.url("/collection/token/");
        trace!("💳️ Requesting access token from {url}");
        let basic = base64::encode(format!("{}:{}", self.config.api_user, self.config.api_key.reveal()));
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Basic {basic}"))
            .header("Content-Length", "0")
            .send()
            .await
            .map_err(|e| match MomoApiError::from(e) {
                MomoApiError::Timeout => MomoApiError::Timeout,
                other => MomoApiError::AuthFailure(other.to_string()),
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            warn!("💳️ The gateway refused our API credentials. {status}. {message}");
            return Err(MomoApiError::AuthFailure(format!("{status}. {message}")));
        }
        response.json::<TokenResponse>().await.map_err(|e| MomoApiError::AuthFailure(e.to_string()))
    }

    /// Asks the payer to approve a collection on their handset.
    ///
    /// `reference_id` is sent as the `X-Reference-Id` and must be a UUID that has not been used before. Callers record
    /// it before calling, since the callback can arrive before this call returns. The gateway answers `202 Accepted`
    /// immediately; the outcome arrives later at the callback URL.
    pub async fn request_to_pay(
        &self,
        reference_id: &str,
        request: &RequestToPay,
    ) -> Result<CollectionReceipt, MomoApiError> {
        if Uuid::parse_str(reference_id).is_err() {
            return Err(MomoApiError::Rejected { status: 400, message: format!("{reference_id} is not a UUID") });
        }
        let token = self.access_token().await?;
        let url = self.url("/collection/v1_0/requesttopay");
        debug!(
            "💳️ Requesting {} {} from {} for {} [{reference_id}]",
            request.amount, request.currency, request.payer.party_id, request.external_id
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(token.reveal())
            .header("X-Reference-Id", reference_id)
            .header("X-Target-Environment", self.config.target_environment.as_str())
            .header("X-Callback-Url", self.config.callback_url())
            .json(request)
            .send()
            .await?;
        match response.status() {
            StatusCode::ACCEPTED | StatusCode::OK => {
                info!("💳️ Collection request {reference_id} for {} accepted by the gateway", request.external_id);
                Ok(CollectionReceipt { reference_id: reference_id.to_string() })
            },
            StatusCode::UNAUTHORIZED => {
                self.credentials.invalidate();
                let message = response.text().await.unwrap_or_default();
                warn!("💳️ The gateway rejected our access token. {message}");
                Err(MomoApiError::AuthFailure(message))
            },
            status => {
                let message = response.text().await.unwrap_or_default();
                warn!("💳️ Collection request for {} was refused. {status}. {message}", request.external_id);
                Err(MomoApiError::Rejected { status: status.as_u16(), message })
            },
        }
    }

    /// Fetches the current disposition of an earlier collection request.
    pub async fn request_to_pay_status(&self, reference_id: &str) -> Result<CollectionReport, MomoApiError> {
        let token = self.access_token().await?;
        let url = self.url(&format!("/collection/v1_0/requesttopay/{reference_id}/status"));
        trace!("💳️ Fetching status of collection {reference_id}");
        let response = self
            .client
            .get(url)
            .bearer_auth(token.reveal())
            .header("X-Target-Environment", self.config.target_environment.as_str())
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.credentials.invalidate();
            let message = response.text().await.unwrap_or_default();
            return Err(MomoApiError::AuthFailure(message));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MomoApiError::Rejected { status: status.as_u16(), message });
        }
        let report = response.json::<CollectionReport>().await?;
        debug!("💳️ Collection {reference_id} is {}", report.status.as_deref().unwrap_or("(no status)"));
        Ok(report)
    }
}
