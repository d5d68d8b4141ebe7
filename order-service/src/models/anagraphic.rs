//! Supplier company, customer and product records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Units in one carton. Fixed for every product.
pub const CARTON_SIZE: i32 = 6;

/// Supplier company represented by the agent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SupplierCompany {
    pub company_id: Uuid,
    pub display_name: String,
    pub legal_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub vat_number: Option<String>,
    pub logo_path: Option<String>,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Customer (point of sale) placing orders.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub customer_id: Uuid,
    pub legal_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub vat_number: Option<String>,
    pub tax_code: Option<String>,
    pub category: Option<String>,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Product sold by a supplier company.
///
/// `carton_size` mirrors the stored column; pricing never reads it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub product_id: Uuid,
    pub company_id: Uuid,
    pub code: String,
    pub name: String,
    pub unit_of_measure: String,
    pub list_price: Decimal,
    pub carton_size: i32,
    pub available: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating or updating a supplier company.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveCompany {
    pub company_id: Option<Uuid>,
    pub display_name: String,
    pub legal_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub vat_number: Option<String>,
    pub logo_path: Option<String>,
}

/// Input for creating or updating a customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveCustomer {
    pub customer_id: Option<Uuid>,
    pub legal_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub vat_number: Option<String>,
    pub tax_code: Option<String>,
    pub category: Option<String>,
}

/// Input for creating or updating a product.
///
/// Has no carton size field; writes always store [`CARTON_SIZE`].
#[derive(Debug, Clone, Deserialize)]
pub struct SaveProduct {
    pub product_id: Option<Uuid>,
    pub company_id: Uuid,
    pub code: String,
    pub name: String,
    #[serde(default = "default_unit_of_measure")]
    pub unit_of_measure: String,
    pub list_price: Decimal,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_unit_of_measure() -> String {
    "PZ".to_string()
}

fn default_available() -> bool {
    true
}

impl SupplierCompany {
    /// Build a new record from input, stamping timestamps.
    pub fn from_input(input: &SaveCompany, now: DateTime<Utc>) -> Self {
        Self {
            company_id: input.company_id.unwrap_or_else(Uuid::new_v4),
            display_name: input.display_name.clone(),
            legal_name: input.legal_name.clone(),
            address: input.address.clone(),
            city: input.city.clone(),
            province: input.province.clone(),
            postal_code: input.postal_code.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            vat_number: input.vat_number.clone(),
            logo_path: input.logo_path.clone(),
            active: true,
            created_utc: now,
            updated_utc: now,
        }
    }
}

impl Customer {
    pub fn from_input(input: &SaveCustomer, now: DateTime<Utc>) -> Self {
        Self {
            customer_id: input.customer_id.unwrap_or_else(Uuid::new_v4),
            legal_name: input.legal_name.clone(),
            address: input.address.clone(),
            city: input.city.clone(),
            province: input.province.clone(),
            postal_code: input.postal_code.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            vat_number: input.vat_number.clone(),
            tax_code: input.tax_code.clone(),
            category: input.category.clone(),
            active: true,
            created_utc: now,
            updated_utc: now,
        }
    }
}

impl Product {
    pub fn from_input(input: &SaveProduct, now: DateTime<Utc>) -> Self {
        Self {
            product_id: input.product_id.unwrap_or_else(Uuid::new_v4),
            company_id: input.company_id,
            code: input.code.clone(),
            name: input.name.clone(),
            unit_of_measure: input.unit_of_measure.clone(),
            list_price: input.list_price,
            carton_size: CARTON_SIZE,
            available: input.available,
            created_utc: now,
            updated_utc: now,
        }
    }
}
