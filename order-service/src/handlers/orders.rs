//! Order endpoints.

use crate::domain::StatusAction;
use crate::models::{
    DocumentKind, ListOrdersFilter, Order, OrderDraft, ProformaDocument, ResolvedOrder,
};
use crate::services::{DeliveryReport, EmailRequest, SavedOrder};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use service_core::error::AppError;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub action: StatusAction,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueProformaRequest {
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AttachArtifactRequest {
    pub artifact_path: String,
}

fn default_kind() -> DocumentKind {
    DocumentKind::Order
}

#[derive(Debug, Deserialize)]
pub struct SendDocumentRequest {
    #[serde(default = "default_kind")]
    pub kind: DocumentKind,
    #[serde(flatten)]
    pub email: EmailRequest,
}

#[tracing::instrument(skip(state, draft))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(draft): Json<OrderDraft>,
) -> Result<(StatusCode, Json<SavedOrder>), AppError> {
    if draft.order_id.is_some() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "order_id must not be set on create; use PUT /orders/:id"
        )));
    }

    let saved = state.orders.save_order(draft).await?;

    Ok((StatusCode::CREATED, Json(saved)))
}

#[tracing::instrument(skip(state, draft))]
pub async fn update_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(mut draft): Json<OrderDraft>,
) -> Result<Json<SavedOrder>, AppError> {
    draft.order_id = Some(order_id);

    let saved = state.orders.save_order(draft).await?;

    Ok(Json(saved))
}

#[tracing::instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ResolvedOrder>, AppError> {
    Ok(Json(state.orders.get_order(order_id).await?))
}

#[tracing::instrument(skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<ListOrdersFilter>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.orders.list_orders(&filter).await?))
}

#[tracing::instrument(skip(state))]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.orders.delete_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, request))]
pub async fn transition_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(
        state
            .orders
            .transition_order(order_id, request.action)
            .await?,
    ))
}

#[tracing::instrument(skip(state, request))]
pub async fn issue_proforma(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<IssueProformaRequest>,
) -> Result<(StatusCode, Json<ProformaDocument>), AppError> {
    let proforma = state
        .orders
        .issue_proforma(order_id, request.issue_date)
        .await?;

    Ok((StatusCode::CREATED, Json(proforma)))
}

#[tracing::instrument(skip(state, request))]
pub async fn attach_proforma_artifact(
    State(state): State<AppState>,
    Path(proforma_id): Path<Uuid>,
    Json(request): Json<AttachArtifactRequest>,
) -> Result<Json<ProformaDocument>, AppError> {
    if request.artifact_path.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "artifact_path cannot be empty"
        )));
    }

    Ok(Json(
        state
            .orders
            .attach_proforma_artifact(proforma_id, &request.artifact_path)
            .await?,
    ))
}

#[tracing::instrument(skip(state, request))]
pub async fn send_order_document(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<SendDocumentRequest>,
) -> Result<Json<DeliveryReport>, AppError> {
    let report = state
        .dispatch
        .send_order_document(order_id, request.kind, request.email)
        .await?;

    Ok(Json(report))
}
