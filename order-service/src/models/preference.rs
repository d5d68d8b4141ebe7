//! Last price and quantity used by a customer for a product.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Unique on (customer_id, company_id, product_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PreferenceRecord {
    pub customer_id: Uuid,
    pub company_id: Uuid,
    pub product_id: Uuid,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub cartons: i32,
    pub loose_units: i32,
    pub updated_utc: DateTime<Utc>,
}

impl PreferenceRecord {
    pub fn key(&self) -> (Uuid, Uuid, Uuid) {
        (self.customer_id, self.company_id, self.product_id)
    }
}
