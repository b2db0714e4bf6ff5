use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use fulfillment_engine::{
    OrderFlowError,
    OrderQueryApiError,
    PaymentApiError,
    PlacementError,
    ReconcileError,
};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    GatewayRejected(String),
    #[error("{0}")]
    GatewayAuthFailure(String),
    #[error("{0}")]
    GatewayUnavailable(String),
    #[error("{0}")]
    GatewayTimeout(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
                AuthError::MissingSignature => StatusCode::FORBIDDEN,
                AuthError::InvalidSignature => StatusCode::FORBIDDEN,
                AuthError::MissingClaims => StatusCode::UNAUTHORIZED,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::GatewayRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::GatewayAuthFailure(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Requests from this address are not accepted.")]
    ForbiddenPeer,
    #[error("No signature found in request.")]
    MissingSignature,
    #[error("Invalid request signature.")]
    InvalidSignature,
    #[error("No access token claims found in request.")]
    MissingClaims,
}

impl From<PlacementError> for ServerError {
    fn from(e: PlacementError) -> Self {
        match e {
            PlacementError::Forbidden => Self::InsufficientPermissions(e.to_string()),
            PlacementError::EmptyOrder | PlacementError::InvalidQuantity(_) | PlacementError::ValidationError(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            PlacementError::ShopUnavailable(_) |
            PlacementError::ProductUnavailable(_) |
            PlacementError::InsufficientStock { .. } => Self::Conflict(e.to_string()),
            PlacementError::DatabaseError(s) => {
                error!("💻️ Database error while placing an order. {s}");
                Self::BackendError(s)
            },
        }
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::Forbidden => Self::InsufficientPermissions(e.to_string()),
            OrderFlowError::InvalidTransition { .. } |
            OrderFlowError::NoOp |
            OrderFlowError::ConcurrentModification(_) => Self::Conflict(e.to_string()),
            OrderFlowError::DatabaseError(s) => {
                error!("💻️ Database error while changing an order's status. {s}");
                Self::BackendError(s)
            },
        }
    }
}

impl From<OrderQueryApiError> for ServerError {
    fn from(e: OrderQueryApiError) -> Self {
        match e {
            OrderQueryApiError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderQueryApiError::Forbidden => Self::InsufficientPermissions(e.to_string()),
            OrderQueryApiError::QueryError(e) => Self::InvalidRequestPath(e.to_string()),
            OrderQueryApiError::DatabaseError(s) => {
                error!("💻️ Database error while fetching orders. {s}");
                Self::BackendError(s)
            },
        }
    }
}

impl From<PaymentApiError> for ServerError {
    fn from(e: PaymentApiError) -> Self {
        match e {
            PaymentApiError::OrderNotFound(_) | PaymentApiError::TransactionNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            PaymentApiError::OrderNotPayable(..) |
            PaymentApiError::AmountMismatch { .. } |
            PaymentApiError::UnsupportedCurrency { .. } => Self::Conflict(e.to_string()),
            PaymentApiError::InvalidPayer(_) => Self::InvalidRequestBody(e.to_string()),
            PaymentApiError::GatewayAuthFailure(_) => Self::GatewayAuthFailure(e.to_string()),
            PaymentApiError::GatewayRejected(_) => Self::GatewayRejected(e.to_string()),
            PaymentApiError::GatewayTimeout => Self::GatewayTimeout(e.to_string()),
            PaymentApiError::GatewayUnavailable(_) => Self::GatewayUnavailable(e.to_string()),
            PaymentApiError::DatabaseError(s) => {
                error!("💻️ Database error while handling a payment. {s}");
                Self::BackendError(s)
            },
        }
    }
}

impl From<ReconcileError> for ServerError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::MalformedPayload(_) => Self::InvalidRequestBody(e.to_string()),
            ReconcileError::DatabaseError(s) => {
                error!("💻️ Database error while reconciling a payment callback. {s}");
                Self::BackendError(s)
            },
        }
    }
}
