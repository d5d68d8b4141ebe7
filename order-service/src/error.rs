//! Error taxonomy for order composition and numbering.

use crate::models::OrderStatus;
use crate::store::StoreError;
use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OrderError {
    /// Company, customer or product missing or inactive.
    #[error("{kind} {id} not found or inactive")]
    ReferenceNotFound { kind: &'static str, id: Uuid },

    #[error("Order has no valid lines")]
    EmptyOrder,

    #[error("Invalid cart line for product {product_id}: {reason}")]
    InvalidLine { product_id: Uuid, reason: String },

    /// Another writer took the number first. Retry with a fresh number.
    #[error("Document number {number} is already taken")]
    NumberingConflict { number: String },

    #[error("Preference write failed: {0}")]
    PreferenceWrite(String),

    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Proforma {0} not found")]
    ProformaNotFound(Uuid),

    #[error("Cannot {action} an order that is {from}")]
    InvalidTransition { from: &'static str, action: &'static str },

    #[error("Invalid order draft: {0}")]
    InvalidDraft(String),

    #[error("Order {0} already has a proforma")]
    ProformaAlreadyIssued(Uuid),

    #[error("Proforma {0} already points to an artifact")]
    ArtifactAlreadyAttached(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OrderError {
    pub fn reference(kind: &'static str, id: Uuid) -> Self {
        OrderError::ReferenceNotFound { kind, id }
    }

    pub fn invalid_line(product_id: Uuid, reason: impl Into<String>) -> Self {
        OrderError::InvalidLine {
            product_id,
            reason: reason.into(),
        }
    }

    pub fn invalid_transition(from: OrderStatus, action: &'static str) -> Self {
        OrderError::InvalidTransition {
            from: from.as_str(),
            action,
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::ReferenceNotFound { .. } => "reference_not_found",
            OrderError::EmptyOrder => "empty_order",
            OrderError::InvalidLine { .. } => "invalid_line",
            OrderError::NumberingConflict { .. } => "numbering_conflict",
            OrderError::PreferenceWrite(_) => "preference_write",
            OrderError::OrderNotFound(_) => "order_not_found",
            OrderError::ProformaNotFound(_) => "proforma_not_found",
            OrderError::InvalidTransition { .. } => "invalid_transition",
            OrderError::InvalidDraft(_) => "invalid_draft",
            OrderError::ProformaAlreadyIssued(_) => "proforma_already_issued",
            OrderError::ArtifactAlreadyAttached(_) => "artifact_already_attached",
            OrderError::Store(_) => "store",
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::ReferenceNotFound { .. }
            | OrderError::OrderNotFound(_)
            | OrderError::ProformaNotFound(_) => AppError::NotFound(anyhow::Error::new(err)),
            OrderError::EmptyOrder | OrderError::InvalidLine { .. } | OrderError::InvalidDraft(_) => {
                AppError::BadRequest(anyhow::Error::new(err))
            }
            OrderError::NumberingConflict { .. }
            | OrderError::InvalidTransition { .. }
            | OrderError::ProformaAlreadyIssued(_)
            | OrderError::ArtifactAlreadyAttached(_) => AppError::Conflict(anyhow::Error::new(err)),
            OrderError::PreferenceWrite(_) | OrderError::Store(_) => {
                AppError::DatabaseError(anyhow::Error::new(err))
            }
        }
    }
}
