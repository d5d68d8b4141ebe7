//! PostgreSQL store for order-service.

use super::{CatalogStore, OrderStore, PreferenceStore, StoreError, StoreTransaction};
use crate::models::{
    Customer, DocumentKind, ListOrdersFilter, Order, OrderLine, PreferenceRecord, Product,
    ProformaDocument, SaveCompany, SaveCustomer, SaveProduct, SupplierCompany, CARTON_SIZE,
};
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

macro_rules! company_columns {
    () => {
        "company_id, display_name, legal_name, address, city, province, postal_code, phone, \
         email, vat_number, logo_path, active, created_utc, updated_utc"
    };
}

macro_rules! customer_columns {
    () => {
        "customer_id, legal_name, address, city, province, postal_code, phone, email, \
         vat_number, tax_code, category, active, created_utc, updated_utc"
    };
}

macro_rules! product_columns {
    () => {
        "product_id, company_id, code, name, unit_of_measure, list_price, carton_size, \
         available, created_utc, updated_utc"
    };
}

macro_rules! order_columns {
    () => {
        "order_id, number, number_year, number_sequence, order_date, company_id, customer_id, \
         payment_terms, delivery_type, delivery_address, delivery_city, delivery_province, \
         delivery_postal_code, total_units, total_cartons, subtotal, closing_discount_percent, \
         final_total, status, note, sent_utc, confirmed_utc, fulfilled_utc, cancelled_utc, \
         created_utc, updated_utc"
    };
}

macro_rules! line_columns {
    () => {
        "line_id, order_id, product_id, product_code, product_name, cartons, loose_units, \
         total_units, unit_price, discount_percent, final_unit_price, line_amount, position, \
         created_utc"
    };
}

macro_rules! proforma_columns {
    () => {
        "proforma_id, order_id, company_id, number, number_year, number_sequence, issue_date, \
         subtotal, artifact_path, created_utc"
    };
}

macro_rules! preference_columns {
    () => {
        "customer_id, company_id, product_id, unit_price, discount_percent, cartons, \
         loose_units, updated_utc"
    };
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "order-service"))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

/// An open PostgreSQL transaction. Dropping it rolls back.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

fn numbered_table(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Order => "orders",
        DocumentKind::Proforma => "proforma_documents",
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn find_company(
        &mut self,
        company_id: Uuid,
    ) -> Result<Option<SupplierCompany>, StoreError> {
        let company = sqlx::query_as::<_, SupplierCompany>(concat!(
            "SELECT ",
            company_columns!(),
            " FROM supplier_companies WHERE company_id = $1 FOR UPDATE"
        ))
        .bind(company_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(company)
    }

    async fn find_customer(&mut self, customer_id: Uuid) -> Result<Option<Customer>, StoreError> {
        let customer = sqlx::query_as::<_, Customer>(concat!(
            "SELECT ",
            customer_columns!(),
            " FROM customers WHERE customer_id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(customer)
    }

    async fn find_products(&mut self, product_ids: &[Uuid]) -> Result<Vec<Product>, StoreError> {
        let products = sqlx::query_as::<_, Product>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE product_id = ANY($1)"
        ))
        .bind(product_ids.to_vec())
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(products)
    }

    async fn find_order(&mut self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        let order = sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE order_id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(order)
    }

    async fn highest_sequence(
        &mut self,
        kind: DocumentKind,
        company_id: Uuid,
        year: i32,
    ) -> Result<Option<i32>, StoreError> {
        let sql = format!(
            "SELECT MAX(number_sequence) FROM {} WHERE company_id = $1 AND number_year = $2",
            numbered_table(kind)
        );
        let highest: Option<i32> = sqlx::query_scalar(&sql)
            .bind(company_id)
            .bind(year)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(highest)
    }

    #[instrument(skip(self, order), fields(order_id = %order.order_id, number = %order.number))]
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(concat!(
            "INSERT INTO orders (",
            order_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)"
        ))
        .bind(order.order_id)
        .bind(&order.number)
        .bind(order.number_year)
        .bind(order.number_sequence)
        .bind(order.order_date)
        .bind(order.company_id)
        .bind(order.customer_id)
        .bind(&order.payment_terms)
        .bind(&order.delivery_type)
        .bind(&order.delivery_address)
        .bind(&order.delivery_city)
        .bind(&order.delivery_province)
        .bind(&order.delivery_postal_code)
        .bind(order.total_units)
        .bind(order.total_cartons)
        .bind(order.subtotal)
        .bind(order.closing_discount_percent)
        .bind(order.final_total)
        .bind(&order.status)
        .bind(&order.note)
        .bind(order.sent_utc)
        .bind(order.confirmed_utc)
        .bind(order.fulfilled_utc)
        .bind(order.cancelled_utc)
        .bind(order.created_utc)
        .bind(order.updated_utc)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, order), fields(order_id = %order.order_id))]
    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE orders
            SET order_date = $2,
                customer_id = $3,
                payment_terms = $4,
                delivery_type = $5,
                delivery_address = $6,
                delivery_city = $7,
                delivery_province = $8,
                delivery_postal_code = $9,
                total_units = $10,
                total_cartons = $11,
                subtotal = $12,
                closing_discount_percent = $13,
                final_total = $14,
                status = $15,
                note = $16,
                sent_utc = $17,
                confirmed_utc = $18,
                fulfilled_utc = $19,
                cancelled_utc = $20,
                updated_utc = $21
            WHERE order_id = $1
            "#,
        )
        .bind(order.order_id)
        .bind(order.order_date)
        .bind(order.customer_id)
        .bind(&order.payment_terms)
        .bind(&order.delivery_type)
        .bind(&order.delivery_address)
        .bind(&order.delivery_city)
        .bind(&order.delivery_province)
        .bind(&order.delivery_postal_code)
        .bind(order.total_units)
        .bind(order.total_cartons)
        .bind(order.subtotal)
        .bind(order.closing_discount_percent)
        .bind(order.final_total)
        .bind(&order.status)
        .bind(&order.note)
        .bind(order.sent_utc)
        .bind(order.confirmed_utc)
        .bind(order.fulfilled_utc)
        .bind(order.cancelled_utc)
        .bind(order.updated_utc)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_order(&mut self, order_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_order_lines(&mut self, order_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_order_lines(&mut self, lines: &[OrderLine]) -> Result<(), StoreError> {
        for line in lines {
            sqlx::query(concat!(
                "INSERT INTO order_lines (",
                line_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
            ))
            .bind(line.line_id)
            .bind(line.order_id)
            .bind(line.product_id)
            .bind(&line.product_code)
            .bind(&line.product_name)
            .bind(line.cartons)
            .bind(line.loose_units)
            .bind(line.total_units)
            .bind(line.unit_price)
            .bind(line.discount_percent)
            .bind(line.final_unit_price)
            .bind(line.line_amount)
            .bind(line.position)
            .bind(line.created_utc)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn find_proforma(
        &mut self,
        proforma_id: Uuid,
    ) -> Result<Option<ProformaDocument>, StoreError> {
        let proforma = sqlx::query_as::<_, ProformaDocument>(concat!(
            "SELECT ",
            proforma_columns!(),
            " FROM proforma_documents WHERE proforma_id = $1 FOR UPDATE"
        ))
        .bind(proforma_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(proforma)
    }

    async fn find_proforma_for_order(
        &mut self,
        order_id: Uuid,
    ) -> Result<Option<ProformaDocument>, StoreError> {
        let proforma = sqlx::query_as::<_, ProformaDocument>(concat!(
            "SELECT ",
            proforma_columns!(),
            " FROM proforma_documents WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(proforma)
    }

    #[instrument(skip(self, proforma), fields(order_id = %proforma.order_id, number = %proforma.number))]
    async fn insert_proforma(&mut self, proforma: &ProformaDocument) -> Result<(), StoreError> {
        sqlx::query(concat!(
            "INSERT INTO proforma_documents (",
            proforma_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(proforma.proforma_id)
        .bind(proforma.order_id)
        .bind(proforma.company_id)
        .bind(&proforma.number)
        .bind(proforma.number_year)
        .bind(proforma.number_sequence)
        .bind(proforma.issue_date)
        .bind(proforma.subtotal)
        .bind(&proforma.artifact_path)
        .bind(proforma.created_utc)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn set_proforma_artifact(
        &mut self,
        proforma_id: Uuid,
        artifact_path: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE proforma_documents SET artifact_path = $2 WHERE proforma_id = $1")
            .bind(proforma_id)
            .bind(artifact_path)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_order"])
            .start_timer();

        let order = sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn get_order_lines(&self, order_id: Uuid) -> Result<Vec<OrderLine>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_order_lines"])
            .start_timer();

        let lines = sqlx::query_as::<_, OrderLine>(concat!(
            "SELECT ",
            line_columns!(),
            " FROM order_lines WHERE order_id = $1 ORDER BY position"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(lines)
    }

    #[instrument(skip(self, filter))]
    async fn list_orders(&self, filter: &ListOrdersFilter) -> Result<Vec<Order>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_orders"])
            .start_timer();

        let status = filter.status.map(|s| s.as_str().to_string());

        let orders = sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            r#"
            FROM orders
            WHERE ($1::varchar IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR company_id = $2)
              AND ($3::uuid IS NULL OR customer_id = $3)
              AND ($4::date IS NULL OR order_date >= $4)
              AND ($5::date IS NULL OR order_date <= $5)
            ORDER BY order_date DESC, number DESC
            LIMIT $6
            "#
        ))
        .bind(&status)
        .bind(filter.company_id)
        .bind(filter.customer_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.effective_limit())
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(orders)
    }

    async fn get_company(&self, company_id: Uuid) -> Result<Option<SupplierCompany>, StoreError> {
        let company = sqlx::query_as::<_, SupplierCompany>(concat!(
            "SELECT ",
            company_columns!(),
            " FROM supplier_companies WHERE company_id = $1"
        ))
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(company)
    }

    async fn get_customer(&self, customer_id: Uuid) -> Result<Option<Customer>, StoreError> {
        let customer = sqlx::query_as::<_, Customer>(concat!(
            "SELECT ",
            customer_columns!(),
            " FROM customers WHERE customer_id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    async fn get_proforma_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Option<ProformaDocument>, StoreError> {
        let proforma = sqlx::query_as::<_, ProformaDocument>(concat!(
            "SELECT ",
            proforma_columns!(),
            " FROM proforma_documents WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(proforma)
    }

    #[instrument(skip(self), fields(customer_id = %customer_id, company_id = %company_id))]
    async fn purchased_product_ids(
        &self,
        customer_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<Uuid>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["purchased_product_ids"])
            .start_timer();

        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT l.product_id
            FROM order_lines l
            JOIN orders o ON o.order_id = l.order_id
            WHERE o.customer_id = $1
              AND o.company_id = $2
              AND o.status IN ('sent', 'confirmed', 'fulfilled')
            ORDER BY l.product_id
            "#,
        )
        .bind(customer_id)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(ids)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    #[instrument(skip(self, input), fields(display_name = %input.display_name))]
    async fn save_company(&self, input: &SaveCompany) -> Result<SupplierCompany, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["save_company"])
            .start_timer();

        let company = SupplierCompany::from_input(input, Utc::now());
        let saved = sqlx::query_as::<_, SupplierCompany>(concat!(
            r#"
            INSERT INTO supplier_companies (
                company_id, display_name, legal_name, address, city, province, postal_code,
                phone, email, vat_number, logo_path, active, created_utc, updated_utc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (company_id) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                legal_name = EXCLUDED.legal_name,
                address = EXCLUDED.address,
                city = EXCLUDED.city,
                province = EXCLUDED.province,
                postal_code = EXCLUDED.postal_code,
                phone = EXCLUDED.phone,
                email = EXCLUDED.email,
                vat_number = EXCLUDED.vat_number,
                logo_path = EXCLUDED.logo_path,
                updated_utc = EXCLUDED.updated_utc
            RETURNING "#,
            company_columns!()
        ))
        .bind(company.company_id)
        .bind(&company.display_name)
        .bind(&company.legal_name)
        .bind(&company.address)
        .bind(&company.city)
        .bind(&company.province)
        .bind(&company.postal_code)
        .bind(&company.phone)
        .bind(&company.email)
        .bind(&company.vat_number)
        .bind(&company.logo_path)
        .bind(company.active)
        .bind(company.created_utc)
        .bind(company.updated_utc)
        .fetch_one(&self.pool)
        .await?;

        timer.observe_duration();

        info!(company_id = %saved.company_id, "Supplier company saved");

        Ok(saved)
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn deactivate_company(&self, company_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE supplier_companies SET active = FALSE, updated_utc = NOW() WHERE company_id = $1",
        )
        .bind(company_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, input), fields(legal_name = %input.legal_name))]
    async fn save_customer(&self, input: &SaveCustomer) -> Result<Customer, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["save_customer"])
            .start_timer();

        let customer = Customer::from_input(input, Utc::now());
        let saved = sqlx::query_as::<_, Customer>(concat!(
            r#"
            INSERT INTO customers (
                customer_id, legal_name, address, city, province, postal_code, phone, email,
                vat_number, tax_code, category, active, created_utc, updated_utc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (customer_id) DO UPDATE
            SET legal_name = EXCLUDED.legal_name,
                address = EXCLUDED.address,
                city = EXCLUDED.city,
                province = EXCLUDED.province,
                postal_code = EXCLUDED.postal_code,
                phone = EXCLUDED.phone,
                email = EXCLUDED.email,
                vat_number = EXCLUDED.vat_number,
                tax_code = EXCLUDED.tax_code,
                category = EXCLUDED.category,
                updated_utc = EXCLUDED.updated_utc
            RETURNING "#,
            customer_columns!()
        ))
        .bind(customer.customer_id)
        .bind(&customer.legal_name)
        .bind(&customer.address)
        .bind(&customer.city)
        .bind(&customer.province)
        .bind(&customer.postal_code)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.vat_number)
        .bind(&customer.tax_code)
        .bind(&customer.category)
        .bind(customer.active)
        .bind(customer.created_utc)
        .bind(customer.updated_utc)
        .fetch_one(&self.pool)
        .await?;

        timer.observe_duration();

        info!(customer_id = %saved.customer_id, "Customer saved");

        Ok(saved)
    }

    #[instrument(skip(self, input), fields(company_id = %input.company_id, code = %input.code))]
    async fn save_product(&self, input: &SaveProduct) -> Result<Product, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["save_product"])
            .start_timer();

        let product = Product::from_input(input, Utc::now());
        let saved = sqlx::query_as::<_, Product>(concat!(
            r#"
            INSERT INTO products (
                product_id, company_id, code, name, unit_of_measure, list_price, carton_size,
                available, created_utc, updated_utc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (product_id) DO UPDATE
            SET company_id = EXCLUDED.company_id,
                code = EXCLUDED.code,
                name = EXCLUDED.name,
                unit_of_measure = EXCLUDED.unit_of_measure,
                list_price = EXCLUDED.list_price,
                carton_size = EXCLUDED.carton_size,
                available = EXCLUDED.available,
                updated_utc = EXCLUDED.updated_utc
            RETURNING "#,
            product_columns!()
        ))
        .bind(product.product_id)
        .bind(product.company_id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.unit_of_measure)
        .bind(product.list_price)
        .bind(CARTON_SIZE)
        .bind(product.available)
        .bind(product.created_utc)
        .bind(product.updated_utc)
        .fetch_one(&self.pool)
        .await?;

        timer.observe_duration();

        info!(product_id = %saved.product_id, "Product saved");

        Ok(saved)
    }
}

#[async_trait]
impl PreferenceStore for PgStore {
    #[instrument(skip(self, record), fields(customer_id = %record.customer_id, product_id = %record.product_id))]
    async fn upsert_preference(&self, record: &PreferenceRecord) -> Result<(), StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_preference"])
            .start_timer();

        sqlx::query(concat!(
            "INSERT INTO preference_records (",
            preference_columns!(),
            r#")
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (customer_id, company_id, product_id) DO UPDATE
            SET unit_price = EXCLUDED.unit_price,
                discount_percent = EXCLUDED.discount_percent,
                cartons = EXCLUDED.cartons,
                loose_units = EXCLUDED.loose_units,
                updated_utc = EXCLUDED.updated_utc
            WHERE preference_records.updated_utc <= EXCLUDED.updated_utc
            "#
        ))
        .bind(record.customer_id)
        .bind(record.company_id)
        .bind(record.product_id)
        .bind(record.unit_price)
        .bind(record.discount_percent)
        .bind(record.cartons)
        .bind(record.loose_units)
        .bind(record.updated_utc)
        .execute(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self), fields(customer_id = %customer_id, company_id = %company_id))]
    async fn preferences_for(
        &self,
        customer_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<PreferenceRecord>, StoreError> {
        let records = sqlx::query_as::<_, PreferenceRecord>(concat!(
            "SELECT ",
            preference_columns!(),
            " FROM preference_records WHERE customer_id = $1 AND company_id = $2"
        ))
        .bind(customer_id)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
