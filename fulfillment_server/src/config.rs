use std::{env, io::Write, net::IpAddr};

use fm_common::{helpers::parse_boolean_flag, Secret, DEFAULT_CURRENCY_CODE};
use log::*;
use momo_tools::MomoConfig;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde_json::json;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_FM_HOST: &str = "127.0.0.1";
const DEFAULT_FM_PORT: u16 = 8470;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/fulfillment.db";
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;
pub const DEFAULT_HMAC_HEADER: &str = "X-Callback-Signature";
const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// The single currency the marketplace trades in.
    pub currency: String,
    /// Capacity of each event hook's channel.
    pub event_buffer_size: usize,
    /// Where notifications are POSTed. When unset, notifications are only logged.
    pub notifier_url: Option<String>,
    pub webhook: WebhookConfig,
    pub momo: MomoConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_FM_HOST.to_string(),
            port: DEFAULT_FM_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            notifier_url: None,
            webhook: WebhookConfig::default(),
            momo: MomoConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("FM_HOST").ok().unwrap_or_else(|| DEFAULT_FM_HOST.into());
        let port = env::var("FM_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for FM_PORT. {e} Using the default, {DEFAULT_FM_PORT}, instead.");
                    DEFAULT_FM_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_FM_PORT);
        let database_url = env::var("FM_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ FM_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("FM_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("FM_USE_FORWARDED").ok(), false);
        let currency = env::var("FM_CURRENCY")
            .ok()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                info!("🪛️ FM_CURRENCY is not set. Using {DEFAULT_CURRENCY_CODE}.");
                DEFAULT_CURRENCY_CODE.to_string()
            });
        let event_buffer_size = env::var("FM_EVENT_BUFFER_SIZE")
            .ok()
            .and_then(|s| {
                s.parse::<usize>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for FM_EVENT_BUFFER_SIZE. {e}"))
                    .ok()
            })
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        let notifier_url = env::var("FM_NOTIFIER_URL").ok().filter(|s| !s.trim().is_empty());
        match &notifier_url {
            Some(url) => info!("🪛️ Notifications will be sent to {url}"),
            None => info!("🪛️ FM_NOTIFIER_URL is not set. Notifications will only be logged."),
        }
        let webhook = WebhookConfig::from_env_or_defaults();
        let momo = MomoConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            auth,
            use_x_forwarded_for,
            use_forwarded,
            currency,
            event_buffer_size,
            notifier_url,
            webhook,
            momo,
        }
    }
}

//-------------------------------------------------  WebhookConfig  ----------------------------------------------------
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// When true, payment callbacks must carry a valid HMAC-SHA256 signature of the body.
    pub hmac_checks: bool,
    pub hmac_secret: Secret<String>,
    /// The header that carries the signature
    pub hmac_header: String,
    /// If supplied, payment callbacks are only accepted from these addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            hmac_checks: false,
            hmac_secret: Secret::default(),
            hmac_header: DEFAULT_HMAC_HEADER.to_string(),
            whitelist: None,
        }
    }
}

impl WebhookConfig {
    pub fn from_env_or_defaults() -> Self {
        let hmac_checks = parse_boolean_flag(env::var("FM_WEBHOOK_HMAC_CHECKS").ok(), false);
        let hmac_secret = env::var("FM_WEBHOOK_HMAC_SECRET").ok().unwrap_or_else(|| {
            if hmac_checks {
                error!(
                    "🪛️ FM_WEBHOOK_HMAC_CHECKS is on, but FM_WEBHOOK_HMAC_SECRET is not set. No payment callback \
                     will pass the signature check."
                );
            }
            String::default()
        });
        let hmac_header = env::var("FM_WEBHOOK_HMAC_HEADER")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HMAC_HEADER.to_string());
        if !hmac_checks {
            info!("🪛️ Payment callback signature checks are disabled.");
        }
        let whitelist = env::var("FM_WEBHOOK_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The payment callback IP whitelist was configured, but is empty. The server will run, but won't \
                     accept any payment callbacks."
                );
            },
            None => {
                info!("🪛️ No payment callback IP whitelist is set.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Payment callback IP whitelist: {addrs}");
            },
        }
        Self { hmac_checks, hmac_secret: Secret::new(hmac_secret), hmac_header, whitelist }
    }
}

fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0", ""].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Payment callback IP whitelist is disabled. If this is not what you want, set FM_WEBHOOK_IP_WHITELIST \
             to a comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .filter_map(|s| {
            let s = s.trim();
            s.parse()
                .map_err(|e| {
                    warn!("🪛️ Ignoring invalid IP address ({s}) in FM_WEBHOOK_IP_WHITELIST: {e}");
                })
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Shared HS256 secret used by the identity service to sign access tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate in \
             production like this, since no token issued by your identity service will be accepted. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        match &mut tmpfile {
            Some((f, p)) => {
                let key_data = json!({ "jwt_secret": secret }).to_string();
                match writeln!(f, "{key_data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, \
                         you are doing it wrong! Set the FM_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
                }
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret.");
            },
        }
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("FM_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [FM_JWT_SECRET]")))?;
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ServerError::ConfigurationError(format!(
                "FM_JWT_SECRET must be at least {MIN_JWT_SECRET_LENGTH} characters long"
            )));
        }
        Ok(Self::new(secret))
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
