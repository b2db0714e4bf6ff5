use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use fm_common::{Money, DEFAULT_CURRENCY_CODE};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

//--------------------------------------        Ids        ---------------------------------------------------------
string_id!(
    /// Opaque order identifier. Also sent to the payment gateway as the collection's `externalId`.
    OrderId
);
string_id!(ShopId);
string_id!(ProductId);

impl OrderId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order has been placed and stock reserved. Payment may still be outstanding.
    Pending,
    /// Payment has been received (or the vendor accepted a cash order).
    Confirmed,
    Preparing,
    OutForDelivery,
    /// Terminal.
    Delivered,
    /// Terminal. Reachable from every non-terminal status.
    Cancelled,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Position on the happy path. `Cancelled` is off the path and has no position.
    pub fn progress(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Preparing => Some(2),
            Self::OutForDelivery => Some(3),
            Self::Delivered => Some(4),
            Self::Cancelled => None,
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Preparing => "PREPARING",
            Self::OutForDelivery => "OUT_FOR_DELIVERY",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "PREPARING" => Ok(Self::Preparing),
            "OUT_FOR_DELIVERY" => Ok(Self::OutForDelivery),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to PENDING");
            Self::Pending
        })
    }
}

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    /// Payment status only moves forward: `pending -> paid`, `pending -> failed` and `failed -> paid` (a successful
    /// retry). `paid` is final as far as the engine is concerned.
    pub fn can_become(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!((self, next), (Pending, Paid) | (Pending, Failed) | (Failed, Paid))
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            _ => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------   Disposition     ---------------------------------------------------------
/// The pair of order status and payment status that together describe where an order is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disposition {
    pub status: OrderStatusType,
    pub payment_status: PaymentStatus,
}

impl Disposition {
    pub fn new(status: OrderStatusType, payment_status: PaymentStatus) -> Self {
        Self { status, payment_status }
    }
}

impl Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.status, self.payment_status)
    }
}

//--------------------------------------        Role        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Vendor,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Customer => "Customer",
            Role::Vendor => "Vendor",
            Role::Admin => "Admin",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "vendor" => Ok(Role::Vendor),
            "admin" => Ok(Role::Admin),
            _ => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------      Principal       ---------------------------------------------------------
pub const SYSTEM_USER_ID: &str = "system";

/// An authenticated caller: who they are and what role their token grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    pub fn new<S: Into<String>>(user_id: S, role: Role) -> Self {
        Self { user_id: user_id.into(), role }
    }

    /// The principal that automated processes (e.g. payment reconciliation) act as.
    pub fn system() -> Self {
        Self::new(SYSTEM_USER_ID, Role::Admin)
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.user_id, self.role)
    }
}

//--------------------------------------        Shop        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub owner_id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      Product       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub shop_id: ShopId,
    pub name: String,
    pub price: Money,
    pub stock_quantity: i64,
    pub is_available: bool,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      LineItem       ---------------------------------------------------------
/// A snapshot of one product in an order. Created with the order and never modified.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LineItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price per unit at the time the order was placed
    pub unit_price: Money,
}

impl LineItem {
    /// `None` only if the line could never have been placed, since order totals are checked when the order is created.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: String,
    pub shop_id: ShopId,
    /// Sum of `unit_price * quantity` over the line items, fixed when the order is placed
    pub total_price: Money,
    pub currency: String,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatus,
    pub shipping_address: String,
    pub contact_phone: Option<String>,
    /// Free-form, e.g. `MOMO` or `Cash on Delivery`
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<LineItem>,
}

impl Order {
    pub fn disposition(&self) -> Disposition {
        Disposition::new(self.status, self.payment_status)
    }
}

//--------------------------------------    OrderRequest     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new<P: Into<ProductId>>(product_id: P, quantity: i64) -> Self {
        Self { product_id: product_id.into(), quantity }
    }
}

/// A cart submitted by a customer for checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub shop_id: ShopId,
    pub items: Vec<OrderLine>,
    pub shipping_address: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
    pub payment_method: String,
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
/// A validated order, ready to be written to the database together with its stock reservations.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub customer_id: String,
    pub shop_id: ShopId,
    /// Product ids are unique within this list
    pub items: Vec<OrderLine>,
    pub currency: String,
    pub shipping_address: String,
    pub contact_phone: Option<String>,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

//-----------------------------------   PaymentTransactionStatus   ----------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentTransactionStatus {
    Pending,
    Successful,
    Failed,
}

impl PaymentTransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl Display for PaymentTransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Successful => "SUCCESSFUL",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

impl FromStr for PaymentTransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "SUCCESSFUL" => Ok(Self::Successful),
            "FAILED" => Ok(Self::Failed),
            _ => Err(ConversionError(format!("Invalid payment transaction status: {s}"))),
        }
    }
}

//--------------------------------------  PaymentTransaction   --------------------------------------------------------
/// One collection attempt at the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: i64,
    /// The correlation id sent to the gateway with the attempt
    pub reference_id: String,
    pub order_id: OrderId,
    pub amount: Money,
    pub currency: String,
    pub payer: String,
    pub status: PaymentTransactionStatus,
    pub financial_transaction_id: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentTransaction {
    pub reference_id: String,
    pub order_id: OrderId,
    pub amount: Money,
    pub currency: String,
    pub payer: String,
}

/// The gateway's final word on a payment transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentResolution {
    pub status: PaymentTransactionStatus,
    pub financial_transaction_id: Option<String>,
    pub reason: Option<String>,
}

//--------------------------------------   StatusHistory      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StatusHistory {
    pub id: i64,
    pub order_id: OrderId,
    pub old_status: OrderStatusType,
    pub new_status: OrderStatusType,
    pub old_payment_status: PaymentStatus,
    pub new_payment_status: PaymentStatus,
    /// User id of whoever made the change, or `system`
    pub actor: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
