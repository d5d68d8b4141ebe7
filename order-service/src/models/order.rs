//! Order header, order line and order draft models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Sent,
    Confirmed,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Sent => "sent",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "sent" => OrderStatus::Sent,
            "confirmed" => OrderStatus::Confirmed,
            "fulfilled" => OrderStatus::Fulfilled,
            "cancelled" => OrderStatus::Cancelled,
            _ => OrderStatus::Draft,
        }
    }

    /// Terminal statuses accept no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Fulfilled | OrderStatus::Cancelled)
    }
}

/// Persisted order header.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub order_id: Uuid,
    pub number: String,
    pub number_year: i32,
    pub number_sequence: i32,
    pub order_date: NaiveDate,
    pub company_id: Uuid,
    pub customer_id: Uuid,
    pub payment_terms: Option<String>,
    pub delivery_type: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_province: Option<String>,
    pub delivery_postal_code: Option<String>,
    pub total_units: i32,
    pub total_cartons: i32,
    pub subtotal: Decimal,
    pub closing_discount_percent: Decimal,
    pub final_total: Decimal,
    pub status: String,
    pub note: Option<String>,
    pub sent_utc: Option<DateTime<Utc>>,
    pub confirmed_utc: Option<DateTime<Utc>>,
    pub fulfilled_utc: Option<DateTime<Utc>>,
    pub cancelled_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Order {
    pub fn status(&self) -> OrderStatus {
        OrderStatus::from_string(&self.status)
    }
}

/// Persisted order line. Product code and name are snapshots taken at order time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderLine {
    pub line_id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub cartons: i32,
    pub loose_units: i32,
    pub total_units: i32,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub final_unit_price: Decimal,
    pub line_amount: Decimal,
    pub position: i32,
    pub created_utc: DateTime<Utc>,
}

/// One entry of the agent's cart, before pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    pub product_id: Uuid,
    #[serde(default)]
    pub cartons: i32,
    #[serde(default)]
    pub loose_units: i32,
    /// Overrides the product list price when present.
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub discount_percent: Decimal,
}

/// Alternative delivery site for an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub address: String,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
}

/// Everything the caller collected for one order save.
///
/// `order_id` set means an edit of an existing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    #[serde(default)]
    pub order_id: Option<Uuid>,
    pub company_id: Uuid,
    pub customer_id: Uuid,
    #[serde(default)]
    pub order_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub delivery_type: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<DeliveryAddress>,
    #[serde(default)]
    pub closing_discount_percent: Decimal,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub send_on_save: bool,
    pub entries: Vec<CartEntry>,
}

/// Filter parameters for listing orders.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListOrdersFilter {
    pub status: Option<OrderStatus>,
    pub company_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
}

impl ListOrdersFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.status.map_or(true, |s| order.status() == s)
            && self.company_id.map_or(true, |c| order.company_id == c)
            && self.customer_id.map_or(true, |c| order.customer_id == c)
            && self.start_date.map_or(true, |d| order.order_date >= d)
            && self.end_date.map_or(true, |d| order.order_date <= d)
    }

    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 500)
    }
}
