use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub const PARTY_ID_TYPE_MSISDN: &str = "MSISDN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime of the token in seconds
    pub expires_in: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub party_id_type: String,
    pub party_id: String,
}

impl Party {
    pub fn msisdn<S: Into<String>>(number: S) -> Self {
        Self { party_id_type: PARTY_ID_TYPE_MSISDN.to_string(), party_id: number.into() }
    }
}

/// Body of a `requesttopay` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestToPay {
    /// Decimal string with two places, e.g. `"2000.00"`
    pub amount: String,
    pub currency: String,
    /// Our reference for the collection. The gateway echoes it back in callbacks.
    pub external_id: String,
    pub payer: Party,
    pub payer_message: String,
    pub payee_note: String,
}

/// What the gateway hands back once it has accepted a collection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReceipt {
    /// The `X-Reference-Id` sent with the request. Unique per attempt.
    pub reference_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailureReason {
    Text(String),
    Detail {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Detail { code, message } => {
                let code = code.as_deref().unwrap_or("UNKNOWN");
                match message {
                    Some(m) => write!(f, "{code}: {m}"),
                    None => write!(f, "{code}"),
                }
            },
        }
    }
}

/// The disposition of a collection, as delivered to the callback URL or returned by the status endpoint.
///
/// Every field is optional here; deciding what is mandatory is the reconciler's business, so that a malformed
/// delivery can be logged in full rather than rejected by the deserializer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub financial_transaction_id: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub reason: Option<FailureReason>,
    #[serde(default)]
    pub payer: Option<Party>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}
