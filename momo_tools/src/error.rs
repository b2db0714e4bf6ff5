use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MomoApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not obtain an access token from the gateway: {0}")]
    AuthFailure(String),
    #[error("The gateway refused the request. Error {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("The gateway did not respond in time")]
    Timeout,
    #[error("Could not reach the gateway: {0}")]
    Transport(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Invalid payer identifier: {0}")]
    InvalidPayer(String),
}

impl MomoApiError {
    /// Errors where the same request may succeed later without the caller changing anything.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_)) ||
            matches!(self, Self::Rejected { status, .. } if *status >= 500)
    }
}

impl From<reqwest::Error> for MomoApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::JsonError(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
