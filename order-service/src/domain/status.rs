//! Order status transitions.

use crate::error::OrderError;
use crate::models::{Order, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    Send,
    Confirm,
    Fulfill,
    Cancel,
}

impl StatusAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusAction::Send => "send",
            StatusAction::Confirm => "confirm",
            StatusAction::Fulfill => "fulfill",
            StatusAction::Cancel => "cancel",
        }
    }

    /// Status reached by this action and the only status it may start from
    /// (`None` for cancel, which starts from any non-terminal status).
    fn edge(&self) -> (Option<OrderStatus>, OrderStatus) {
        match self {
            StatusAction::Send => (Some(OrderStatus::Draft), OrderStatus::Sent),
            StatusAction::Confirm => (Some(OrderStatus::Sent), OrderStatus::Confirmed),
            StatusAction::Fulfill => (Some(OrderStatus::Confirmed), OrderStatus::Fulfilled),
            StatusAction::Cancel => (None, OrderStatus::Cancelled),
        }
    }

    pub fn next_status(&self, from: OrderStatus) -> Result<OrderStatus, OrderError> {
        let (required, target) = self.edge();
        let allowed = match required {
            Some(required) => from == required,
            None => !from.is_terminal(),
        };

        if allowed {
            Ok(target)
        } else {
            Err(OrderError::invalid_transition(from, self.as_str()))
        }
    }
}

/// Move the order along the state machine and stamp the matching timestamp.
pub fn apply_transition(
    order: &mut Order,
    action: StatusAction,
    now: DateTime<Utc>,
) -> Result<OrderStatus, OrderError> {
    let target = action.next_status(order.status())?;

    let stamp = match target {
        OrderStatus::Sent => Some(&mut order.sent_utc),
        OrderStatus::Confirmed => Some(&mut order.confirmed_utc),
        OrderStatus::Fulfilled => Some(&mut order.fulfilled_utc),
        OrderStatus::Cancelled => Some(&mut order.cancelled_utc),
        OrderStatus::Draft => None,
    };
    if let Some(stamp) = stamp.filter(|s| s.is_none()) {
        *stamp = Some(now);
    }

    order.status = target.as_str().to_string();
    order.updated_utc = now;

    Ok(target)
}
