//! Numbered documents: proforma records and the resolved view handed to renderers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Customer, Order, OrderLine, SupplierCompany};

/// Kind of numbered document. Each kind has its own sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Order,
    Proforma,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Order => "order",
            DocumentKind::Proforma => "proforma",
        }
    }
}

/// Proforma confirmation issued for an order (at most one per order).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProformaDocument {
    pub proforma_id: Uuid,
    pub order_id: Uuid,
    pub company_id: Uuid,
    pub number: String,
    pub number_year: i32,
    pub number_sequence: i32,
    pub issue_date: NaiveDate,
    pub subtotal: Decimal,
    pub artifact_path: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Order header with its lines and the joined company/customer records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub company: SupplierCompany,
    pub customer: Customer,
    pub proforma: Option<ProformaDocument>,
}
