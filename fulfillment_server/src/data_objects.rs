use std::fmt::Display;

use chrono::{DateTime, Utc};
use fulfillment_engine::{
    db_types::{OrderId, OrderStatusType, PaymentStatus},
    order_objects::OrderQueryFilter,
    OrderQueryError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The only answer the payment gateway ever gets to a well-formed callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

/// Query string for the admin order search. Lists are comma-separated, e.g. `?status=PENDING,CONFIRMED`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderSearchParams {
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    pub shop_id: Option<String>,
    pub currency: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

impl TryFrom<OrderSearchParams> for OrderQueryFilter {
    type Error = OrderQueryError;

    fn try_from(params: OrderSearchParams) -> Result<Self, Self::Error> {
        let mut filter = OrderQueryFilter::default();
        if let Some(id) = params.order_id {
            filter = filter.with_order_id(OrderId::from(id));
        }
        if let Some(id) = params.customer_id {
            filter = filter.with_customer_id(id);
        }
        if let Some(id) = params.shop_id {
            filter = filter.with_shop_id(id.as_str().into());
        }
        if let Some(currency) = params.currency {
            filter = filter.with_currency(currency);
        }
        if let Some(since) = params.since {
            filter = filter.since(since)?;
        }
        if let Some(until) = params.until {
            filter = filter.until(until)?;
        }
        for s in split_list(params.status.as_deref()) {
            let status = s.parse::<OrderStatusType>().map_err(|e| OrderQueryError(e.to_string()))?;
            filter = filter.with_status(status);
        }
        for s in split_list(params.payment_status.as_deref()) {
            let status = s.parse::<PaymentStatus>().map_err(|e| OrderQueryError(e.to_string()))?;
            filter = filter.with_payment_status(status);
        }
        Ok(filter)
    }
}

fn split_list(s: Option<&str>) -> impl Iterator<Item = &str> {
    s.unwrap_or_default().split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn search_params_to_filter() {
        let params = OrderSearchParams {
            shop_id: Some("fresh-greens".into()),
            status: Some("PENDING, CONFIRMED".into()),
            payment_status: Some("paid".into()),
            ..Default::default()
        };
        let filter = OrderQueryFilter::try_from(params).expect("valid params");
        assert_eq!(filter.shop_id.as_ref().map(|s| s.as_str()), Some("fresh-greens"));
        assert_eq!(filter.status, Some(vec![OrderStatusType::Pending, OrderStatusType::Confirmed]));
        assert_eq!(filter.payment_status, Some(vec![PaymentStatus::Paid]));
        assert!(filter.customer_id.is_none());
    }

    #[test]
    fn bad_status_is_a_query_error() {
        let params = OrderSearchParams { status: Some("LOST".into()), ..Default::default() };
        let err = OrderQueryFilter::try_from(params).expect_err("LOST is not a status");
        assert!(err.to_string().starts_with("Invalid query"));
    }

    #[test]
    fn empty_params_are_an_empty_filter() {
        let filter = OrderQueryFilter::try_from(OrderSearchParams::default()).unwrap();
        assert!(filter.is_empty());
    }
}
