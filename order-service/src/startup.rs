//! Application startup and lifecycle management.

use crate::config::OrderServiceConfig;
use crate::handlers::{
    catalog, health_check, http_metrics_middleware, metrics_handler, orders, preferences,
    readiness_check,
};
use crate::services::{
    init_metrics, DocumentDispatch, DocumentRenderer, EmailTransport, OrderService,
    PreferenceMemory, SmtpEmailTransport, SummaryRenderer,
};
use crate::store::{CatalogStore, OrderStore, PgStore, PreferenceStore};
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: Arc<OrderService>,
    pub preferences: Arc<PreferenceMemory>,
    pub dispatch: Arc<DocumentDispatch>,
}

impl AppState {
    /// Wire the services on top of one store.
    pub fn new<S>(
        store: Arc<S>,
        renderer: Arc<dyn DocumentRenderer>,
        transport: Arc<dyn EmailTransport>,
        numbering_max_attempts: u32,
    ) -> Self
    where
        S: OrderStore + CatalogStore + PreferenceStore + 'static,
    {
        let preferences = Arc::new(PreferenceMemory::new(store.clone()));
        let orders = Arc::new(
            OrderService::new(store.clone(), preferences.clone())
                .with_max_attempts(numbering_max_attempts),
        );
        let dispatch = Arc::new(DocumentDispatch::new(orders.clone(), renderer, transport));

        Self {
            store: store.clone(),
            catalog: store,
            orders,
            preferences,
            dispatch,
        }
    }
}

/// Every route of the service, with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/companies", post(catalog::create_company))
        .route("/companies/:id", delete(catalog::deactivate_company))
        .route("/customers", post(catalog::create_customer))
        .route("/products", post(catalog::create_product))
        .route(
            "/orders",
            post(orders::create_order).get(orders::list_orders),
        )
        .route(
            "/orders/:id",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
        .route("/orders/:id/transitions", post(orders::transition_order))
        .route("/orders/:id/proforma", post(orders::issue_proforma))
        .route("/orders/:id/email", post(orders::send_order_document))
        .route(
            "/proformas/:id/artifact",
            put(orders::attach_proforma_artifact),
        )
        .route(
            "/customers/:customer_id/companies/:company_id/preferences",
            get(preferences::get_preferences),
        )
        .route(
            "/customers/:customer_id/companies/:company_id/purchased-products",
            get(preferences::get_purchased_products),
        )
        .route_layer(middleware::from_fn(http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: OrderServiceConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    pub async fn build_without_migrations(config: OrderServiceConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(
        config: OrderServiceConfig,
        run_migrations: bool,
    ) -> Result<Self, AppError> {
        init_metrics();

        let store = PgStore::connect(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            store.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let transport = SmtpEmailTransport::new(config.smtp.clone()).map_err(|e| {
            tracing::error!(error = %e, "Failed to create SMTP transport");
            AppError::EmailError(e.to_string())
        })?;
        if !transport.is_enabled() {
            tracing::warn!("SMTP disabled - document emails will fail until SMTP_ENABLED=true");
        }

        let state = AppState::new(
            Arc::new(store),
            Arc::new(SummaryRenderer::new(config.documents.agency_name.clone())),
            Arc::new(transport),
            config.numbering.max_attempts,
        );

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Order service listener bound");

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = "order-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, self.router).await
    }
}
