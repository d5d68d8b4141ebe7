//! In-process store used by tests and local runs without PostgreSQL.
//!
//! A transaction holds the state lock for its whole lifetime and works on a
//! copy of the state, so writers are serialized and an uncommitted
//! transaction leaves nothing behind.

use super::{CatalogStore, OrderStore, PreferenceStore, StoreError, StoreTransaction};
use crate::models::{
    Customer, DocumentKind, ListOrdersFilter, Order, OrderLine, OrderStatus, PreferenceRecord,
    Product, ProformaDocument, SaveCompany, SaveCustomer, SaveProduct, SupplierCompany,
    CARTON_SIZE,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

type PreferenceKey = (Uuid, Uuid, Uuid);

#[derive(Debug, Clone, Default)]
struct MemoryState {
    companies: HashMap<Uuid, SupplierCompany>,
    customers: HashMap<Uuid, Customer>,
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
    lines: HashMap<Uuid, Vec<OrderLine>>,
    proformas: HashMap<Uuid, ProformaDocument>,
}

impl MemoryState {
    fn proforma_for_order(&self, order_id: Uuid) -> Option<&ProformaDocument> {
        self.proformas.values().find(|p| p.order_id == order_id)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    preferences: Arc<Mutex<HashMap<PreferenceKey, PreferenceRecord>>>,
    stale_reads: Arc<AtomicU32>,
    fail_preference_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` sequence lookups report one less than the real
    /// highest sequence, as if a concurrent writer had committed in between.
    pub fn inject_stale_reads(&self, count: u32) {
        self.stale_reads.store(count, Ordering::SeqCst);
    }

    /// Make every preference upsert fail until switched off again.
    pub fn fail_preference_writes(&self, fail: bool) {
        self.fail_preference_writes.store(fail, Ordering::SeqCst);
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
    stale_reads: Arc<AtomicU32>,
}

impl MemoryTransaction {
    fn take_stale_read(&self) -> bool {
        self.stale_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation(constraint.to_string())
}

fn foreign_key(constraint: &str) -> StoreError {
    StoreError::Database(anyhow::anyhow!(
        "insert or update violates foreign key constraint \"{}\"",
        constraint
    ))
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn find_company(
        &mut self,
        company_id: Uuid,
    ) -> Result<Option<SupplierCompany>, StoreError> {
        Ok(self.work.companies.get(&company_id).cloned())
    }

    async fn find_customer(&mut self, customer_id: Uuid) -> Result<Option<Customer>, StoreError> {
        Ok(self.work.customers.get(&customer_id).cloned())
    }

    async fn find_products(&mut self, product_ids: &[Uuid]) -> Result<Vec<Product>, StoreError> {
        let wanted: BTreeSet<Uuid> = product_ids.iter().copied().collect();
        Ok(wanted
            .iter()
            .filter_map(|id| self.work.products.get(id).cloned())
            .collect())
    }

    async fn find_order(&mut self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.work.orders.get(&order_id).cloned())
    }

    async fn highest_sequence(
        &mut self,
        kind: DocumentKind,
        company_id: Uuid,
        year: i32,
    ) -> Result<Option<i32>, StoreError> {
        let highest = match kind {
            DocumentKind::Order => self
                .work
                .orders
                .values()
                .filter(|o| o.company_id == company_id && o.number_year == year)
                .map(|o| o.number_sequence)
                .max(),
            DocumentKind::Proforma => self
                .work
                .proformas
                .values()
                .filter(|p| p.company_id == company_id && p.number_year == year)
                .map(|p| p.number_sequence)
                .max(),
        };

        if self.take_stale_read() {
            debug!(year, "Serving stale sequence read");
            return Ok(highest.map(|h| h - 1).filter(|h| *h > 0));
        }

        Ok(highest)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        if self.work.orders.contains_key(&order.order_id) {
            return Err(unique("orders_pkey"));
        }
        if !self.work.companies.contains_key(&order.company_id) {
            return Err(foreign_key("orders_company_id_fkey"));
        }
        if !self.work.customers.contains_key(&order.customer_id) {
            return Err(foreign_key("orders_customer_id_fkey"));
        }
        for existing in self.work.orders.values() {
            if existing.company_id != order.company_id {
                continue;
            }
            if existing.number == order.number {
                return Err(unique("orders_company_number_key"));
            }
            if existing.number_year == order.number_year
                && existing.number_sequence == order.number_sequence
            {
                return Err(unique("orders_company_sequence_key"));
            }
        }

        self.work.orders.insert(order.order_id, order.clone());
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        if !self.work.customers.contains_key(&order.customer_id) {
            return Err(foreign_key("orders_customer_id_fkey"));
        }
        if let Some(existing) = self.work.orders.get_mut(&order.order_id) {
            // Number, company and creation time are not updatable columns.
            let mut updated = order.clone();
            updated.number = existing.number.clone();
            updated.number_year = existing.number_year;
            updated.number_sequence = existing.number_sequence;
            updated.company_id = existing.company_id;
            updated.created_utc = existing.created_utc;
            *existing = updated;
        }
        Ok(())
    }

    async fn delete_order(&mut self, order_id: Uuid) -> Result<bool, StoreError> {
        let removed = self.work.orders.remove(&order_id).is_some();
        if removed {
            self.work.lines.remove(&order_id);
            self.work.proformas.retain(|_, p| p.order_id != order_id);
        }
        Ok(removed)
    }

    async fn delete_order_lines(&mut self, order_id: Uuid) -> Result<u64, StoreError> {
        Ok(self
            .work
            .lines
            .remove(&order_id)
            .map(|lines| lines.len() as u64)
            .unwrap_or(0))
    }

    async fn insert_order_lines(&mut self, lines: &[OrderLine]) -> Result<(), StoreError> {
        for line in lines {
            if !self.work.orders.contains_key(&line.order_id) {
                return Err(foreign_key("order_lines_order_id_fkey"));
            }
            let stored = self.work.lines.entry(line.order_id).or_default();
            if stored.iter().any(|l| l.position == line.position) {
                return Err(unique("order_lines_position_key"));
            }
            stored.push(line.clone());
        }
        Ok(())
    }

    async fn find_proforma(
        &mut self,
        proforma_id: Uuid,
    ) -> Result<Option<ProformaDocument>, StoreError> {
        Ok(self.work.proformas.get(&proforma_id).cloned())
    }

    async fn find_proforma_for_order(
        &mut self,
        order_id: Uuid,
    ) -> Result<Option<ProformaDocument>, StoreError> {
        Ok(self.work.proforma_for_order(order_id).cloned())
    }

    async fn insert_proforma(&mut self, proforma: &ProformaDocument) -> Result<(), StoreError> {
        if !self.work.orders.contains_key(&proforma.order_id) {
            return Err(foreign_key("proforma_documents_order_id_fkey"));
        }
        if self.work.proforma_for_order(proforma.order_id).is_some() {
            return Err(unique("proforma_documents_order_id_key"));
        }
        for existing in self.work.proformas.values() {
            if existing.company_id != proforma.company_id {
                continue;
            }
            if existing.number == proforma.number {
                return Err(unique("proforma_documents_company_number_key"));
            }
            if existing.number_year == proforma.number_year
                && existing.number_sequence == proforma.number_sequence
            {
                return Err(unique("proforma_documents_company_sequence_key"));
            }
        }

        self.work
            .proformas
            .insert(proforma.proforma_id, proforma.clone());
        Ok(())
    }

    async fn set_proforma_artifact(
        &mut self,
        proforma_id: Uuid,
        artifact_path: &str,
    ) -> Result<(), StoreError> {
        if let Some(proforma) = self.work.proformas.get_mut(&proforma_id) {
            proforma.artifact_path = Some(artifact_path.to_string());
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction {
            mut guard, work, ..
        } = *self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            work,
            stale_reads: self.stale_reads.clone(),
        }))
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.state.lock().await.orders.get(&order_id).cloned())
    }

    async fn get_order_lines(&self, order_id: Uuid) -> Result<Vec<OrderLine>, StoreError> {
        let state = self.state.lock().await;
        let mut lines = state.lines.get(&order_id).cloned().unwrap_or_default();
        lines.sort_by_key(|l| l.position);
        Ok(lines)
    }

    async fn list_orders(&self, filter: &ListOrdersFilter) -> Result<Vec<Order>, StoreError> {
        let state = self.state.lock().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.order_date
                .cmp(&a.order_date)
                .then_with(|| b.number.cmp(&a.number))
        });
        orders.truncate(filter.effective_limit() as usize);
        Ok(orders)
    }

    async fn get_company(&self, company_id: Uuid) -> Result<Option<SupplierCompany>, StoreError> {
        Ok(self.state.lock().await.companies.get(&company_id).cloned())
    }

    async fn get_customer(&self, customer_id: Uuid) -> Result<Option<Customer>, StoreError> {
        Ok(self.state.lock().await.customers.get(&customer_id).cloned())
    }

    async fn get_proforma_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Option<ProformaDocument>, StoreError> {
        Ok(self.state.lock().await.proforma_for_order(order_id).cloned())
    }

    async fn purchased_product_ids(
        &self,
        customer_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<Uuid>, StoreError> {
        let state = self.state.lock().await;
        let ids: BTreeSet<Uuid> = state
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id && o.company_id == company_id)
            .filter(|o| {
                matches!(
                    o.status(),
                    OrderStatus::Sent | OrderStatus::Confirmed | OrderStatus::Fulfilled
                )
            })
            .flat_map(|o| state.lines.get(&o.order_id).into_iter().flatten())
            .map(|l| l.product_id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn save_company(&self, input: &SaveCompany) -> Result<SupplierCompany, StoreError> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        let mut company = SupplierCompany::from_input(input, now);
        if let Some(existing) = state.companies.get(&company.company_id) {
            company.active = existing.active;
            company.created_utc = existing.created_utc;
        }
        state.companies.insert(company.company_id, company.clone());
        Ok(company)
    }

    async fn deactivate_company(&self, company_id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.companies.get_mut(&company_id) {
            Some(company) => {
                company.active = false;
                company.updated_utc = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn save_customer(&self, input: &SaveCustomer) -> Result<Customer, StoreError> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        let mut customer = Customer::from_input(input, now);
        if let Some(existing) = state.customers.get(&customer.customer_id) {
            customer.active = existing.active;
            customer.created_utc = existing.created_utc;
        }
        state.customers.insert(customer.customer_id, customer.clone());
        Ok(customer)
    }

    async fn save_product(&self, input: &SaveProduct) -> Result<Product, StoreError> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        if !state.companies.contains_key(&input.company_id) {
            return Err(foreign_key("products_company_id_fkey"));
        }
        let mut product = Product::from_input(input, now);
        product.carton_size = CARTON_SIZE;
        if let Some(existing) = state.products.get(&product.product_id) {
            product.created_utc = existing.created_utc;
        }
        state.products.insert(product.product_id, product.clone());
        Ok(product)
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn upsert_preference(&self, record: &PreferenceRecord) -> Result<(), StoreError> {
        if self.fail_preference_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(anyhow::anyhow!(
                "preference_records is unavailable"
            )));
        }
        let mut preferences = self.preferences.lock().await;
        match preferences.get(&record.key()) {
            Some(existing) if existing.updated_utc > record.updated_utc => {
                debug!(product_id = %record.product_id, "Kept newer preference record");
            }
            _ => {
                preferences.insert(record.key(), record.clone());
            }
        }
        Ok(())
    }

    async fn preferences_for(
        &self,
        customer_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<PreferenceRecord>, StoreError> {
        let preferences = self.preferences.lock().await;
        let mut records: Vec<PreferenceRecord> = preferences
            .values()
            .filter(|r| r.customer_id == customer_id && r.company_id == company_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.product_id);
        Ok(records)
    }
}
