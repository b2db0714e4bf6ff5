use std::time::Duration;

use fm_common::{helpers::parse_duration_secs, Secret};
use log::*;

pub const DEFAULT_MOMO_BASE_URL: &str = "https://sandbox.momodeveloper.mtn.com";
pub const DEFAULT_TARGET_ENVIRONMENT: &str = "sandbox";
/// The path on our server that receives collection callbacks. Appended to `callback_host`.
pub const MOMO_CALLBACK_PATH: &str = "/payments/momo/webhook";
const DEFAULT_CALLBACK_HOST: &str = "http://localhost:8470";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct MomoConfig {
    /// e.g. `https://sandbox.momodeveloper.mtn.com`. No trailing slash.
    pub base_url: String,
    /// The API user id (a UUID) provisioned for the collection product.
    pub api_user: String,
    /// The API key belonging to `api_user`.
    pub api_key: Secret<String>,
    /// The `Ocp-Apim-Subscription-Key` for the collection product.
    pub subscription_key: Secret<String>,
    /// Publicly reachable scheme and host of this server, used to build the callback URL.
    pub callback_host: String,
    /// `sandbox`, or the production environment name assigned by MTN (e.g. `mtnrwanda`).
    pub target_environment: String,
    /// Upper bound for any single gateway HTTP request.
    pub timeout: Duration,
    /// Cached access tokens are renewed once their remaining lifetime drops below this margin.
    pub token_refresh_margin: Duration,
}

impl Default for MomoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MOMO_BASE_URL.to_string(),
            api_user: String::default(),
            api_key: Secret::default(),
            subscription_key: Secret::default(),
            callback_host: DEFAULT_CALLBACK_HOST.to_string(),
            target_environment: DEFAULT_TARGET_ENVIRONMENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            token_refresh_margin: DEFAULT_TOKEN_REFRESH_MARGIN,
        }
    }
}

impl MomoConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("FM_MOMO_BASE_URL").unwrap_or_else(|_| {
            info!("🪛️ FM_MOMO_BASE_URL not set, using {DEFAULT_MOMO_BASE_URL}");
            DEFAULT_MOMO_BASE_URL.to_string()
        });
        let api_user = std::env::var("FM_MOMO_API_USER").unwrap_or_else(|_| {
            warn!("🪛️ FM_MOMO_API_USER not set. Payment requests will be refused by the gateway.");
            String::default()
        });
        let api_key = Secret::new(std::env::var("FM_MOMO_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ FM_MOMO_API_KEY not set. Payment requests will be refused by the gateway.");
            String::default()
        }));
        let subscription_key = Secret::new(std::env::var("FM_MOMO_SUBSCRIPTION_KEY").unwrap_or_else(|_| {
            warn!("🪛️ FM_MOMO_SUBSCRIPTION_KEY not set. Payment requests will be refused by the gateway.");
            String::default()
        }));
        let callback_host = std::env::var("FM_MOMO_CALLBACK_HOST").unwrap_or_else(|_| {
            warn!(
                "🪛️ FM_MOMO_CALLBACK_HOST not set, using {DEFAULT_CALLBACK_HOST}. The gateway will not be able to \
                 reach this address."
            );
            DEFAULT_CALLBACK_HOST.to_string()
        });
        let target_environment = std::env::var("FM_MOMO_TARGET_ENVIRONMENT").unwrap_or_else(|_| {
            info!("🪛️ FM_MOMO_TARGET_ENVIRONMENT not set, using {DEFAULT_TARGET_ENVIRONMENT}");
            DEFAULT_TARGET_ENVIRONMENT.to_string()
        });
        let timeout = parse_duration_secs(std::env::var("FM_MOMO_TIMEOUT_SECS").ok())
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_TIMEOUT);
        let token_refresh_margin = parse_duration_secs(std::env::var("FM_MOMO_TOKEN_MARGIN_SECS").ok())
            .unwrap_or(DEFAULT_TOKEN_REFRESH_MARGIN);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_user,
            api_key,
            subscription_key,
            callback_host: callback_host.trim_end_matches('/').to_string(),
            target_environment,
            timeout,
            token_refresh_margin,
        }
    }

    pub fn callback_url(&self) -> String {
        format!("{}{MOMO_CALLBACK_PATH}", self.callback_host)
    }
}
