//! Order persistence: the atomic save, status transitions, proformas and reads.

use crate::domain::{
    apply_transition, CartLineCalculator, OrderTotals, PricedLine, SequentialDocumentNumberer,
    StatusAction,
};
use crate::error::OrderError;
use crate::models::{
    Customer, DocumentKind, ListOrdersFilter, Order, OrderDraft, OrderLine, OrderStatus,
    ProformaDocument, ResolvedOrder, SupplierCompany,
};
use crate::services::metrics::{
    record_document_issued, record_error, record_numbering_conflict, record_order_saved,
    record_transition,
};
use crate::services::preferences::PreferenceMemory;
use crate::store::{OrderStore, StoreError, StoreTransaction};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub const DEFAULT_NUMBERING_MAX_ATTEMPTS: u32 = 5;

/// Outcome of a successful save.
#[derive(Debug, Clone, Serialize)]
pub struct SavedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    /// Cart entries dropped as invalid.
    pub dropped_entries: usize,
    /// Preference writes parked for a later retry.
    pub deferred_preferences: usize,
    pub attempts: u32,
}

struct WrittenOrder {
    order: Order,
    lines: Vec<OrderLine>,
    dropped_entries: usize,
    edited: bool,
}

pub struct OrderService {
    store: Arc<dyn OrderStore>,
    preferences: Arc<PreferenceMemory>,
    max_attempts: u32,
}

/// Commit on success, roll back on failure.
async fn finish<T>(
    tx: Box<dyn StoreTransaction>,
    result: Result<T, OrderError>,
) -> Result<T, OrderError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

fn numbering_error(err: StoreError, number: &str) -> OrderError {
    match err {
        StoreError::UniqueViolation(_) => OrderError::NumberingConflict {
            number: number.to_string(),
        },
        other => other.into(),
    }
}

fn require_active_company(
    company: Option<SupplierCompany>,
    company_id: Uuid,
) -> Result<SupplierCompany, OrderError> {
    company
        .filter(|c| c.active)
        .ok_or_else(|| OrderError::reference("company", company_id))
}

fn require_active_customer(
    customer: Option<Customer>,
    customer_id: Uuid,
) -> Result<Customer, OrderError> {
    customer
        .filter(|c| c.active)
        .ok_or_else(|| OrderError::reference("customer", customer_id))
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, preferences: Arc<PreferenceMemory>) -> Self {
        Self {
            store,
            preferences,
            max_attempts: DEFAULT_NUMBERING_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn preferences(&self) -> &Arc<PreferenceMemory> {
        &self.preferences
    }

    /// Run `attempt` until it stops failing with a numbering conflict.
    async fn retry_numbering<T, F, Fut>(
        &self,
        kind: DocumentKind,
        mut attempt: F,
    ) -> Result<(T, u32), OrderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OrderError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match attempt().await {
                Ok(value) => return Ok((value, attempts)),
                Err(OrderError::NumberingConflict { number }) if attempts < self.max_attempts => {
                    warn!(
                        kind = kind.as_str(),
                        number = %number,
                        attempt = attempts,
                        "Document number taken concurrently, retrying"
                    );
                    record_numbering_conflict(kind.as_str(), "retried");
                }
                Err(err @ OrderError::NumberingConflict { .. }) => {
                    warn!(kind = kind.as_str(), attempts, "Numbering retries exhausted");
                    record_numbering_conflict(kind.as_str(), "exhausted");
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Create or edit an order atomically, then update preference memory.
    #[instrument(
        skip(self, draft),
        fields(
            company_id = %draft.company_id,
            customer_id = %draft.customer_id,
            order_id = ?draft.order_id,
            entries = draft.entries.len()
        )
    )]
    pub async fn save_order(&self, draft: OrderDraft) -> Result<SavedOrder, OrderError> {
        let result = self.save_order_inner(&draft).await;
        if let Err(err) = &result {
            record_error(err.kind());
        }
        result
    }

    async fn save_order_inner(&self, draft: &OrderDraft) -> Result<SavedOrder, OrderError> {
        let closing = draft.closing_discount_percent;
        if closing < Decimal::ZERO || closing > Decimal::ONE_HUNDRED {
            return Err(OrderError::InvalidDraft(format!(
                "closing discount {} outside 0-100",
                closing
            )));
        }
        if draft.entries.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let now = Utc::now();
        let (written, attempts) = self
            .retry_numbering(DocumentKind::Order, || self.try_save(draft, now))
            .await?;

        let mode = if written.edited { "edit" } else { "create" };
        record_order_saved(&written.order.status, mode);
        if !written.edited {
            record_document_issued(DocumentKind::Order.as_str());
        }

        info!(
            order_id = %written.order.order_id,
            number = %written.order.number,
            status = %written.order.status,
            lines = written.lines.len(),
            final_total = %written.order.final_total,
            mode,
            "Order saved"
        );

        self.preferences.retry_pending().await;
        let records = PreferenceMemory::records_for(&written.order, &written.lines, now);
        let deferred_preferences = self.preferences.record(records).await;

        Ok(SavedOrder {
            order: written.order,
            lines: written.lines,
            dropped_entries: written.dropped_entries,
            deferred_preferences,
            attempts,
        })
    }

    async fn try_save(
        &self,
        draft: &OrderDraft,
        now: DateTime<Utc>,
    ) -> Result<WrittenOrder, OrderError> {
        let mut tx = self.store.begin().await?;
        let result = Self::write_order(tx.as_mut(), draft, now).await;
        finish(tx, result).await
    }

    async fn write_order(
        tx: &mut dyn StoreTransaction,
        draft: &OrderDraft,
        now: DateTime<Utc>,
    ) -> Result<WrittenOrder, OrderError> {
        let company = require_active_company(
            tx.find_company(draft.company_id).await?,
            draft.company_id,
        )?;
        let customer = require_active_customer(
            tx.find_customer(draft.customer_id).await?,
            draft.customer_id,
        )?;

        let existing = match draft.order_id {
            Some(order_id) => {
                let order = tx
                    .find_order(order_id)
                    .await?
                    .ok_or(OrderError::OrderNotFound(order_id))?;
                if order.status() != OrderStatus::Draft {
                    return Err(OrderError::invalid_transition(order.status(), "edit"));
                }
                if order.company_id != company.company_id {
                    return Err(OrderError::InvalidDraft(
                        "the supplier company of an existing order cannot change".to_string(),
                    ));
                }
                Some(order)
            }
            None => None,
        };

        let (priced, dropped_entries) = Self::price_entries(tx, draft, &company).await?;
        if priced.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        let totals = OrderTotals::aggregate(&priced, draft.closing_discount_percent)?;

        let edited = existing.is_some();
        let mut order = match existing {
            Some(existing) => {
                let order_date = draft.order_date.unwrap_or(existing.order_date);
                Self::build_header(draft, &customer, existing, order_date, &totals, now)
            }
            None => {
                let order_date = draft.order_date.unwrap_or_else(|| now.date_naive());
                let number = SequentialDocumentNumberer::next(
                    tx,
                    DocumentKind::Order,
                    &company,
                    order_date.year(),
                )
                .await?;
                let blank = Order {
                    order_id: Uuid::new_v4(),
                    number: number.to_string(),
                    number_year: number.year,
                    number_sequence: number.sequence,
                    order_date,
                    company_id: company.company_id,
                    customer_id: customer.customer_id,
                    payment_terms: None,
                    delivery_type: None,
                    delivery_address: None,
                    delivery_city: None,
                    delivery_province: None,
                    delivery_postal_code: None,
                    total_units: 0,
                    total_cartons: 0,
                    subtotal: Decimal::ZERO,
                    closing_discount_percent: Decimal::ZERO,
                    final_total: Decimal::ZERO,
                    status: OrderStatus::Draft.as_str().to_string(),
                    note: None,
                    sent_utc: None,
                    confirmed_utc: None,
                    fulfilled_utc: None,
                    cancelled_utc: None,
                    created_utc: now,
                    updated_utc: now,
                };
                Self::build_header(draft, &customer, blank, order_date, &totals, now)
            }
        };

        if draft.send_on_save {
            apply_transition(&mut order, StatusAction::Send, now)?;
        }

        let lines: Vec<OrderLine> = priced
            .into_iter()
            .enumerate()
            .map(|(index, line)| OrderLine {
                line_id: Uuid::new_v4(),
                order_id: order.order_id,
                product_id: line.product_id,
                product_code: line.product_code,
                product_name: line.product_name,
                cartons: line.cartons,
                loose_units: line.loose_units,
                total_units: line.total_units,
                unit_price: line.unit_price,
                discount_percent: line.discount_percent,
                final_unit_price: line.final_unit_price,
                line_amount: line.line_amount,
                position: index as i32 + 1,
                created_utc: now,
            })
            .collect();

        if edited {
            tx.update_order(&order).await?;
            let removed = tx.delete_order_lines(order.order_id).await?;
            debug!(order_id = %order.order_id, removed, "Previous order lines removed");
        } else {
            tx.insert_order(&order)
                .await
                .map_err(|e| numbering_error(e, &order.number))?;
        }
        tx.insert_order_lines(&lines).await?;

        Ok(WrittenOrder {
            order,
            lines,
            dropped_entries,
            edited,
        })
    }

    /// Price every entry; invalid entries are dropped and counted.
    async fn price_entries(
        tx: &mut dyn StoreTransaction,
        draft: &OrderDraft,
        company: &SupplierCompany,
    ) -> Result<(Vec<PricedLine>, usize), OrderError> {
        let product_ids: Vec<Uuid> = draft.entries.iter().map(|e| e.product_id).collect();
        let products: HashMap<Uuid, _> = tx
            .find_products(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.product_id, p))
            .collect();

        let mut priced = Vec::with_capacity(draft.entries.len());
        let mut dropped = 0;

        for entry in &draft.entries {
            let product = products
                .get(&entry.product_id)
                .filter(|p| p.company_id == company.company_id)
                .ok_or_else(|| OrderError::reference("product", entry.product_id))?;

            match CartLineCalculator::price(product, entry) {
                Ok(line) => priced.push(line),
                Err(OrderError::InvalidLine { product_id, reason }) => {
                    debug!(product_id = %product_id, reason = %reason, "Cart entry dropped");
                    dropped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        Ok((priced, dropped))
    }

    fn build_header(
        draft: &OrderDraft,
        customer: &Customer,
        mut order: Order,
        order_date: NaiveDate,
        totals: &OrderTotals,
        now: DateTime<Utc>,
    ) -> Order {
        let delivery = draft.delivery_address.as_ref();

        order.order_date = order_date;
        order.customer_id = customer.customer_id;
        order.payment_terms = draft.payment_terms.clone();
        order.delivery_type = draft.delivery_type.clone();
        order.delivery_address = delivery.map(|d| d.address.clone());
        order.delivery_city = delivery.and_then(|d| d.city.clone());
        order.delivery_province = delivery.and_then(|d| d.province.clone());
        order.delivery_postal_code = delivery.and_then(|d| d.postal_code.clone());
        order.total_units = totals.total_units;
        order.total_cartons = totals.total_cartons;
        order.subtotal = totals.subtotal;
        order.closing_discount_percent = totals.closing_discount_percent;
        order.final_total = totals.final_total;
        order.note = draft.note.clone();
        order.updated_utc = now;
        order
    }

    /// Move an order along the status machine.
    #[instrument(skip(self), fields(order_id = %order_id, action = action.as_str()))]
    pub async fn transition_order(
        &self,
        order_id: Uuid,
        action: StatusAction,
    ) -> Result<Order, OrderError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let mut order = tx
                .find_order(order_id)
                .await?
                .ok_or(OrderError::OrderNotFound(order_id))?;
            apply_transition(&mut order, action, Utc::now())?;
            tx.update_order(&order).await?;
            Ok::<_, OrderError>(order)
        }
        .await;
        let result = finish(tx, result).await;

        match &result {
            Ok(order) => {
                record_transition(action.as_str(), "ok");
                info!(number = %order.number, status = %order.status, "Order status changed");
            }
            Err(err) => {
                record_transition(action.as_str(), err.kind());
            }
        }

        result
    }

    /// Header, lines by position, company, customer and proforma.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<ResolvedOrder, OrderError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        let lines = self.store.get_order_lines(order_id).await?;
        let company = self
            .store
            .get_company(order.company_id)
            .await?
            .ok_or_else(|| OrderError::reference("company", order.company_id))?;
        let customer = self
            .store
            .get_customer(order.customer_id)
            .await?
            .ok_or_else(|| OrderError::reference("customer", order.customer_id))?;
        let proforma = self.store.get_proforma_for_order(order_id).await?;

        Ok(ResolvedOrder {
            order,
            lines,
            company,
            customer,
            proforma,
        })
    }

    pub async fn list_orders(&self, filter: &ListOrdersFilter) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list_orders(filter).await?)
    }

    /// Remove the order with its lines and proforma. Preference records stay.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), OrderError> {
        let mut tx = self.store.begin().await?;
        let result = match tx.delete_order(order_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(OrderError::OrderNotFound(order_id)),
            Err(e) => Err(e.into()),
        };
        finish(tx, result).await?;

        info!("Order deleted");
        Ok(())
    }

    /// Products the customer already bought from the company.
    pub async fn purchased_products(
        &self,
        customer_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<Uuid>, OrderError> {
        Ok(self
            .store
            .purchased_product_ids(customer_id, company_id)
            .await?)
    }

    /// Number and record the order's proforma. At most one per order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn issue_proforma(
        &self,
        order_id: Uuid,
        issue_date: Option<NaiveDate>,
    ) -> Result<ProformaDocument, OrderError> {
        let now = Utc::now();
        let issue_date = issue_date.unwrap_or_else(|| now.date_naive());

        let (proforma, _) = self
            .retry_numbering(DocumentKind::Proforma, move || async move {
                let mut tx = self.store.begin().await?;
                let result = Self::write_proforma(tx.as_mut(), order_id, issue_date, now).await;
                finish(tx, result).await
            })
            .await
            .inspect_err(|err| record_error(err.kind()))?;

        record_document_issued(DocumentKind::Proforma.as_str());
        info!(number = %proforma.number, "Proforma issued");

        Ok(proforma)
    }

    async fn write_proforma(
        tx: &mut dyn StoreTransaction,
        order_id: Uuid,
        issue_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ProformaDocument, OrderError> {
        let order = tx
            .find_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        if order.status() == OrderStatus::Cancelled {
            return Err(OrderError::invalid_transition(order.status(), "issue a proforma for"));
        }
        if tx.find_proforma_for_order(order_id).await?.is_some() {
            return Err(OrderError::ProformaAlreadyIssued(order_id));
        }

        let company = tx
            .find_company(order.company_id)
            .await?
            .ok_or_else(|| OrderError::reference("company", order.company_id))?;
        let number = SequentialDocumentNumberer::next(
            tx,
            DocumentKind::Proforma,
            &company,
            issue_date.year(),
        )
        .await?;

        let proforma = ProformaDocument {
            proforma_id: Uuid::new_v4(),
            order_id,
            company_id: company.company_id,
            number: number.to_string(),
            number_year: number.year,
            number_sequence: number.sequence,
            issue_date,
            subtotal: order.subtotal,
            artifact_path: None,
            created_utc: now,
        };

        tx.insert_proforma(&proforma).await.map_err(|e| match e {
            StoreError::UniqueViolation(ref constraint) if constraint.contains("order_id") => {
                OrderError::ProformaAlreadyIssued(order_id)
            }
            other => numbering_error(other, &proforma.number),
        })?;

        Ok(proforma)
    }

    /// Record where the proforma artifact lives. Set once.
    #[instrument(skip(self, artifact_path), fields(proforma_id = %proforma_id))]
    pub async fn attach_proforma_artifact(
        &self,
        proforma_id: Uuid,
        artifact_path: &str,
    ) -> Result<ProformaDocument, OrderError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let mut proforma = tx
                .find_proforma(proforma_id)
                .await?
                .ok_or(OrderError::ProformaNotFound(proforma_id))?;
            if proforma.artifact_path.is_some() {
                return Err(OrderError::ArtifactAlreadyAttached(proforma_id));
            }
            tx.set_proforma_artifact(proforma_id, artifact_path).await?;
            proforma.artifact_path = Some(artifact_path.to_string());
            Ok::<_, OrderError>(proforma)
        }
        .await;

        finish(tx, result).await
    }
}
