//! Supplier company, customer and product writes.

use crate::error::OrderError;
use crate::models::{Customer, Product, SaveCompany, SaveCustomer, SaveProduct, SupplierCompany};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}

#[tracing::instrument(skip(state, request))]
pub async fn create_company(
    State(state): State<AppState>,
    Json(request): Json<SaveCompany>,
) -> Result<(StatusCode, Json<SupplierCompany>), AppError> {
    require_text(&request.display_name, "display_name")?;

    let company = state
        .catalog
        .save_company(&request)
        .await
        .map_err(OrderError::from)?;

    Ok((StatusCode::CREATED, Json(company)))
}

/// Soft deactivation; orders keep referencing the company.
#[tracing::instrument(skip(state))]
pub async fn deactivate_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let found = state
        .catalog
        .deactivate_company(company_id)
        .await
        .map_err(OrderError::from)?;

    if !found {
        return Err(OrderError::reference("company", company_id).into());
    }

    tracing::info!(company_id = %company_id, "Supplier company deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, request))]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(request): Json<SaveCustomer>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    require_text(&request.legal_name, "legal_name")?;

    let customer = state
        .catalog
        .save_customer(&request)
        .await
        .map_err(OrderError::from)?;

    Ok((StatusCode::CREATED, Json(customer)))
}

#[tracing::instrument(skip(state, request))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<SaveProduct>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    require_text(&request.code, "code")?;
    require_text(&request.name, "name")?;
    if request.list_price < Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "list_price cannot be negative"
        )));
    }

    state
        .store
        .get_company(request.company_id)
        .await
        .map_err(OrderError::from)?
        .ok_or_else(|| OrderError::reference("company", request.company_id))?;

    let product = state
        .catalog
        .save_product(&request)
        .await
        .map_err(OrderError::from)?;

    Ok((StatusCode::CREATED, Json(product)))
}
