//! Common test utilities for order-service integration tests.

#![allow(dead_code)]

use axum::Router;
use chrono::NaiveDate;
use order_service::models::{
    CartEntry, Customer, OrderDraft, Product, SaveCompany, SaveCustomer, SaveProduct,
    SupplierCompany,
};
use order_service::services::{init_metrics, MockEmailTransport, SummaryRenderer};
use order_service::startup::{build_router, AppState};
use order_service::store::{CatalogStore, MemoryStore};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,order_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Services wired on an in-memory store.
pub struct TestApp {
    pub store: MemoryStore,
    pub state: AppState,
    pub transport: Arc<MockEmailTransport>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn company(&self, display_name: &str) -> SupplierCompany {
        self.store
            .save_company(&SaveCompany {
                display_name: display_name.to_string(),
                email: Some("ordini@example.com".to_string()),
                ..Default::default()
            })
            .await
            .expect("Failed to seed company")
    }

    pub async fn customer(&self, legal_name: &str) -> Customer {
        self.store
            .save_customer(&SaveCustomer {
                legal_name: legal_name.to_string(),
                email: Some("cliente@example.com".to_string()),
                city: Some("Bergamo".to_string()),
                province: Some("BG".to_string()),
                ..Default::default()
            })
            .await
            .expect("Failed to seed customer")
    }

    pub async fn product(&self, company: &SupplierCompany, code: &str, list_price: &str) -> Product {
        self.store
            .save_product(&SaveProduct {
                product_id: None,
                company_id: company.company_id,
                code: code.to_string(),
                name: format!("Prodotto {}", code),
                unit_of_measure: "PZ".to_string(),
                list_price: dec(list_price),
                available: true,
            })
            .await
            .expect("Failed to seed product")
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with_attempts(5)
}

pub fn spawn_app_with_attempts(max_attempts: u32) -> TestApp {
    init_tracing();
    init_metrics();

    let store = MemoryStore::new();
    let transport = Arc::new(MockEmailTransport::new());
    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(SummaryRenderer::new("Agenzia Test")),
        transport.clone(),
        max_attempts,
    );

    TestApp {
        store,
        state,
        transport,
    }
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid decimal literal")
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn entry(product: &Product, cartons: i32, loose_units: i32) -> CartEntry {
    CartEntry {
        product_id: product.product_id,
        cartons,
        loose_units,
        unit_price: None,
        discount_percent: Decimal::ZERO,
    }
}

pub fn priced_entry(
    product: &Product,
    cartons: i32,
    loose_units: i32,
    unit_price: &str,
    discount_percent: &str,
) -> CartEntry {
    CartEntry {
        product_id: product.product_id,
        cartons,
        loose_units,
        unit_price: Some(dec(unit_price)),
        discount_percent: dec(discount_percent),
    }
}

pub fn draft(
    company: &SupplierCompany,
    customer: &Customer,
    order_date: NaiveDate,
    entries: Vec<CartEntry>,
) -> OrderDraft {
    OrderDraft {
        order_id: None,
        company_id: company.company_id,
        customer_id: customer.customer_id,
        order_date: Some(order_date),
        payment_terms: Some("Bonifico 30 gg".to_string()),
        delivery_type: Some("Corriere".to_string()),
        delivery_address: None,
        closing_discount_percent: Decimal::ZERO,
        note: None,
        send_on_save: false,
        entries,
    }
}
