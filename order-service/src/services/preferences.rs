//! Preference memory: last price and quantity per (customer, company, product).
//!
//! Writes are best-effort and never part of the order transaction. A failed
//! upsert is parked in an in-process outbox and replayed by `retry_pending`.
//! The store only applies a record whose `updated_utc` is not older than the
//! stored one, so a late replay never overwrites a newer write.

use crate::error::OrderError;
use crate::models::{CartEntry, Order, OrderLine, PreferenceRecord};
use crate::services::metrics::record_preference_write;
use crate::store::PreferenceStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

type PreferenceKey = (Uuid, Uuid, Uuid);

pub struct PreferenceMemory {
    store: Arc<dyn PreferenceStore>,
    outbox: Mutex<HashMap<PreferenceKey, PreferenceRecord>>,
}

impl PreferenceMemory {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self {
            store,
            outbox: Mutex::new(HashMap::new()),
        }
    }

    /// One record per product of the order; a later line for the same
    /// product wins.
    pub fn records_for(order: &Order, lines: &[OrderLine], now: DateTime<Utc>) -> Vec<PreferenceRecord> {
        let mut by_key: HashMap<PreferenceKey, PreferenceRecord> = HashMap::new();
        let mut keys = Vec::new();

        for line in lines {
            let record = PreferenceRecord {
                customer_id: order.customer_id,
                company_id: order.company_id,
                product_id: line.product_id,
                unit_price: line.unit_price,
                discount_percent: line.discount_percent,
                cartons: line.cartons,
                loose_units: line.loose_units,
                updated_utc: now,
            };
            if by_key.insert(record.key(), record.clone()).is_none() {
                keys.push(record.key());
            }
        }

        keys.into_iter()
            .filter_map(|key| by_key.remove(&key))
            .collect()
    }

    /// Upsert each record. Returns how many were deferred to the outbox.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn record(&self, records: Vec<PreferenceRecord>) -> usize {
        let mut deferred = 0;

        for record in records {
            match self.store.upsert_preference(&record).await {
                Ok(()) => {
                    record_preference_write("ok");
                    // Nothing older for this key is worth replaying.
                    self.outbox.lock().await.remove(&record.key());
                }
                Err(e) => {
                    let err = OrderError::PreferenceWrite(e.to_string());
                    warn!(
                        error = %err,
                        customer_id = %record.customer_id,
                        company_id = %record.company_id,
                        product_id = %record.product_id,
                        "Preference write failed, parked for retry"
                    );
                    record_preference_write("deferred");
                    self.outbox.lock().await.insert(record.key(), record);
                    deferred += 1;
                }
            }
        }

        deferred
    }

    /// Replay parked writes. Returns how many are still pending.
    #[instrument(skip(self))]
    pub async fn retry_pending(&self) -> usize {
        let parked: Vec<PreferenceRecord> = {
            let mut outbox = self.outbox.lock().await;
            outbox.drain().map(|(_, record)| record).collect()
        };

        if parked.is_empty() {
            return 0;
        }

        debug!(count = parked.len(), "Retrying parked preference writes");

        let mut still_pending = 0;
        for record in parked {
            match self.store.upsert_preference(&record).await {
                Ok(()) => record_preference_write("recovered"),
                Err(e) => {
                    warn!(error = %e, product_id = %record.product_id, "Preference retry failed");
                    record_preference_write("deferred");
                    // Keep a newer record parked meanwhile, if any.
                    self.outbox
                        .lock()
                        .await
                        .entry(record.key())
                        .or_insert(record);
                    still_pending += 1;
                }
            }
        }

        still_pending
    }

    pub async fn pending_count(&self) -> usize {
        self.outbox.lock().await.len()
    }

    /// Last-used values for every product the customer ordered from the company.
    #[instrument(skip(self), fields(customer_id = %customer_id, company_id = %company_id))]
    pub async fn prefill(
        &self,
        customer_id: Uuid,
        company_id: Uuid,
    ) -> Result<HashMap<Uuid, PreferenceRecord>, OrderError> {
        let records = self.store.preferences_for(customer_id, company_id).await?;
        Ok(records
            .into_iter()
            .map(|record| (record.product_id, record))
            .collect())
    }

    /// Proposed cart entry for a remembered product.
    pub fn prefill_entry(record: &PreferenceRecord) -> CartEntry {
        CartEntry {
            product_id: record.product_id,
            cartons: record.cartons,
            loose_units: record.loose_units,
            unit_price: Some(record.unit_price),
            discount_percent: record.discount_percent,
        }
    }
}
