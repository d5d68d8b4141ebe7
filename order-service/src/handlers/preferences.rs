use crate::models::PreferenceRecord;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use service_core::error::AppError;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct PurchasedProductsResponse {
    pub customer_id: Uuid,
    pub company_id: Uuid,
    pub product_ids: Vec<Uuid>,
}

/// Last-used values keyed by product id.
#[tracing::instrument(skip(state))]
pub async fn get_preferences(
    State(state): State<AppState>,
    Path((customer_id, company_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<HashMap<Uuid, PreferenceRecord>>, AppError> {
    Ok(Json(
        state.preferences.prefill(customer_id, company_id).await?,
    ))
}

#[tracing::instrument(skip(state))]
pub async fn get_purchased_products(
    State(state): State<AppState>,
    Path((customer_id, company_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PurchasedProductsResponse>, AppError> {
    let product_ids = state
        .orders
        .purchased_products(customer_id, company_id)
        .await?;

    Ok(Json(PurchasedProductsResponse {
        customer_id,
        company_id,
        product_ids,
    }))
}
