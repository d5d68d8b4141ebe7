//! Prometheus metrics for order-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Counter for HTTP requests by method, path and status.
pub static HTTP_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "order_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS")
});

/// Histogram for HTTP request duration by method and path.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "order_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION")
});

/// Histogram for database query duration.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "order_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Counter for saved orders by resulting status and save mode.
pub static ORDERS_SAVED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "order_orders_saved_total",
        "Total number of orders saved",
        &["status", "mode"]
    )
    .expect("Failed to register ORDERS_SAVED")
});

/// Counter for status transitions.
pub static ORDER_TRANSITIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "order_status_transitions_total",
        "Total number of order status transitions",
        &["action", "result"]
    )
    .expect("Failed to register ORDER_TRANSITIONS")
});

/// Counter for numbering conflicts, and for retries that ran out.
pub static NUMBERING_CONFLICTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "order_numbering_conflicts_total",
        "Total number of document numbering conflicts",
        &["kind", "outcome"]
    )
    .expect("Failed to register NUMBERING_CONFLICTS")
});

/// Counter for preference writes.
pub static PREFERENCE_WRITES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "order_preference_writes_total",
        "Total number of preference record writes",
        &["status"]
    )
    .expect("Failed to register PREFERENCE_WRITES")
});

/// Counter for issued documents.
pub static DOCUMENTS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "order_documents_issued_total",
        "Total number of numbered documents issued",
        &["kind"]
    )
    .expect("Failed to register DOCUMENTS_ISSUED")
});

/// Counter for document emails.
pub static EMAILS_SENT: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "order_emails_sent_total",
        "Total number of document emails",
        &["kind", "status"]
    )
    .expect("Failed to register EMAILS_SENT")
});

/// Counter for errors.
pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "order_errors_total",
        "Total number of errors",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&ORDERS_SAVED);
    Lazy::force(&ORDER_TRANSITIONS);
    Lazy::force(&NUMBERING_CONFLICTS);
    Lazy::force(&PREFERENCE_WRITES);
    Lazy::force(&DOCUMENTS_ISSUED);
    Lazy::force(&EMAILS_SENT);
    Lazy::force(&ERRORS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_http_request(method: &str, path: &str, status: &str, duration_secs: f64) {
    HTTP_REQUESTS
        .with_label_values(&[method, path, status])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Record a saved order. `mode` is "create" or "edit".
pub fn record_order_saved(status: &str, mode: &str) {
    ORDERS_SAVED.with_label_values(&[status, mode]).inc();
}

pub fn record_transition(action: &str, result: &str) {
    ORDER_TRANSITIONS.with_label_values(&[action, result]).inc();
}

/// Record a numbering conflict. `outcome` is "retried" or "exhausted".
pub fn record_numbering_conflict(kind: &str, outcome: &str) {
    NUMBERING_CONFLICTS
        .with_label_values(&[kind, outcome])
        .inc();
}

pub fn record_preference_write(status: &str) {
    PREFERENCE_WRITES.with_label_values(&[status]).inc();
}

pub fn record_document_issued(kind: &str) {
    DOCUMENTS_ISSUED.with_label_values(&[kind]).inc();
}

pub fn record_email(kind: &str, status: &str) {
    EMAILS_SENT.with_label_values(&[kind, status]).inc();
}

/// Record an error.
pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
