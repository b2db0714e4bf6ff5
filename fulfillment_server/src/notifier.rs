//! Notifiers the server can plug into the engine's event hooks.
//!
//! [`LogNotifier`] writes notifications to the log and is the default. [`HttpNotifier`] POSTs each notification as
//! JSON to a messaging service. Delivery is best-effort in both cases.
use std::{future::Future, time::Duration};

use fulfillment_engine::notifications::{Notification, Notifier, NotifierError};
use log::*;
use reqwest::Client;

const NOTIFIER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) -> impl Future<Output = Result<(), NotifierError>> + Send {
        info!("📬️ [{}] to {}: {}", notification.kind, notification.recipient, notification.payload);
        async { Ok(()) }
    }
}

#[derive(Debug, Clone)]
pub struct HttpNotifier {
    url: String,
    client: Client,
}

impl HttpNotifier {
    pub fn new<S: Into<String>>(url: S) -> Result<Self, NotifierError> {
        let client = Client::builder()
            .timeout(NOTIFIER_TIMEOUT)
            .build()
            .map_err(|e| NotifierError::DeliveryFailed(format!("Could not create HTTP client. {e}")))?;
        Ok(Self { url: url.into(), client })
    }
}

impl Notifier for HttpNotifier {
    fn notify(&self, notification: Notification) -> impl Future<Output = Result<(), NotifierError>> + Send {
        let client = self.client.clone();
        let url = self.url.clone();
        async move {
            let response = client
                .post(url.as_str())
                .json(&notification)
                .send()
                .await
                .map_err(|e| NotifierError::DeliveryFailed(e.to_string()))?;
            let status = response.status();
            if status.is_success() {
                trace!("📬️ {url} accepted {} notification", notification.kind);
                Ok(())
            } else {
                let message = response.text().await.unwrap_or_default();
                Err(NotifierError::Rejected(format!("{status}. {message}")))
            }
        }
    }
}

/// The notifier selected by configuration.
#[derive(Debug, Clone)]
pub enum ServerNotifier {
    Log(LogNotifier),
    Http(HttpNotifier),
}

impl ServerNotifier {
    pub fn from_url(url: Option<&str>) -> Self {
        match url.map(HttpNotifier::new) {
            Some(Ok(n)) => Self::Http(n),
            Some(Err(e)) => {
                warn!("📬️ {e}. Falling back to logging notifications.");
                Self::Log(LogNotifier)
            },
            None => Self::Log(LogNotifier),
        }
    }
}

impl Notifier for ServerNotifier {
    fn notify(&self, notification: Notification) -> impl Future<Output = Result<(), NotifierError>> + Send {
        let this = self.clone();
        async move {
            match this {
                Self::Log(n) => n.notify(notification).await,
                Self::Http(n) => n.notify(notification).await,
            }
        }
    }
}
