//! Storage seam for order-service.
//!
//! `PgStore` backs production; `MemoryStore` implements the same traits for
//! tests and local runs, with the same unique constraints.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{
    Customer, DocumentKind, ListOrdersFilter, Order, OrderLine, PreferenceRecord, Product,
    ProformaDocument, SaveCompany, SaveCustomer, SaveProduct, SupplierCompany,
};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Names the violated constraint.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation(db_err.constraint().unwrap_or("unknown").to_string())
            }
            other => StoreError::Database(anyhow::Error::new(other)),
        }
    }
}

/// One open unit of work. Dropping it without `commit` discards every write.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Active or inactive company; locks the row until the transaction ends.
    async fn find_company(&mut self, company_id: Uuid)
        -> Result<Option<SupplierCompany>, StoreError>;

    async fn find_customer(&mut self, customer_id: Uuid) -> Result<Option<Customer>, StoreError>;

    async fn find_products(&mut self, product_ids: &[Uuid]) -> Result<Vec<Product>, StoreError>;

    /// Locks the order row until the transaction ends.
    async fn find_order(&mut self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Highest sequence among the company's documents of `kind` numbered in `year`,
    /// whatever prefix they carry.
    async fn highest_sequence(
        &mut self,
        kind: DocumentKind,
        company_id: Uuid,
        year: i32,
    ) -> Result<Option<i32>, StoreError>;

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn delete_order(&mut self, order_id: Uuid) -> Result<bool, StoreError>;

    async fn delete_order_lines(&mut self, order_id: Uuid) -> Result<u64, StoreError>;

    async fn insert_order_lines(&mut self, lines: &[OrderLine]) -> Result<(), StoreError>;

    async fn find_proforma(
        &mut self,
        proforma_id: Uuid,
    ) -> Result<Option<ProformaDocument>, StoreError>;

    async fn find_proforma_for_order(
        &mut self,
        order_id: Uuid,
    ) -> Result<Option<ProformaDocument>, StoreError>;

    async fn insert_proforma(&mut self, proforma: &ProformaDocument) -> Result<(), StoreError>;

    async fn set_proforma_artifact(
        &mut self,
        proforma_id: Uuid,
        artifact_path: &str,
    ) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Orders and their read paths.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Lines ordered by position.
    async fn get_order_lines(&self, order_id: Uuid) -> Result<Vec<OrderLine>, StoreError>;

    /// Newest first.
    async fn list_orders(&self, filter: &ListOrdersFilter) -> Result<Vec<Order>, StoreError>;

    async fn get_company(&self, company_id: Uuid) -> Result<Option<SupplierCompany>, StoreError>;

    async fn get_customer(&self, customer_id: Uuid) -> Result<Option<Customer>, StoreError>;

    async fn get_proforma_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Option<ProformaDocument>, StoreError>;

    /// Distinct products the customer ordered from the company in sent,
    /// confirmed or fulfilled orders.
    async fn purchased_product_ids(
        &self,
        customer_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<Uuid>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Supplier companies, customers and products.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn save_company(&self, input: &SaveCompany) -> Result<SupplierCompany, StoreError>;

    /// Soft deactivation; returns false when the company does not exist.
    async fn deactivate_company(&self, company_id: Uuid) -> Result<bool, StoreError>;

    async fn save_customer(&self, input: &SaveCustomer) -> Result<Customer, StoreError>;

    /// Always stores the fixed carton size.
    async fn save_product(&self, input: &SaveProduct) -> Result<Product, StoreError>;
}

/// Last-used price and quantity per (customer, company, product).
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Insert the record, or overwrite the stored one for its key unless that
    /// one has a later `updated_utc`.
    async fn upsert_preference(&self, record: &PreferenceRecord) -> Result<(), StoreError>;

    async fn preferences_for(
        &self,
        customer_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<PreferenceRecord>, StoreError>;
}
