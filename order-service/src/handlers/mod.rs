//! HTTP handlers for order-service.

pub mod catalog;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod preferences;

pub use health::{health_check, metrics_handler, readiness_check};
pub use metrics::http_metrics_middleware;
