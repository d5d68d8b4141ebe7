//! Integration tests for the HTTP surface.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use common::{dec, spawn_app};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use tower::ServiceExt;

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

struct Seeded {
    company_id: String,
    customer_id: String,
    product_id: String,
}

async fn seed(router: &Router) -> Seeded {
    let (status, company) = call(
        router,
        Method::POST,
        "/companies",
        Some(json!({ "display_name": "Rossi Beverages SRL" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, customer) = call(
        router,
        Method::POST,
        "/customers",
        Some(json!({ "legal_name": "Bar Centrale", "email": "cliente@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, product) = call(
        router,
        Method::POST,
        "/products",
        Some(json!({
            "company_id": company["company_id"],
            "code": "VIN-001",
            "name": "Rosso Toscano",
            "list_price": "12.50"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["carton_size"], 6);

    Seeded {
        company_id: company["company_id"].as_str().unwrap().to_string(),
        customer_id: customer["customer_id"].as_str().unwrap().to_string(),
        product_id: product["product_id"].as_str().unwrap().to_string(),
    }
}

fn order_body(seeded: &Seeded, cartons: i32, loose_units: i32) -> Value {
    json!({
        "company_id": seeded.company_id,
        "customer_id": seeded.customer_id,
        "order_date": "2025-03-10",
        "entries": [{
            "product_id": seeded.product_id,
            "cartons": cartons,
            "loose_units": loose_units,
            "unit_price": "10.00",
            "discount_percent": "10"
        }]
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let app = spawn_app();
    let router = app.router();

    let (status, body) = call(&router, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "order-service");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = spawn_app();

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/ready")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn order_lifecycle_over_http() {
    let app = spawn_app();
    let router = app.router();
    let seeded = seed(&router).await;

    let (status, saved) = call(&router, Method::POST, "/orders", Some(order_body(&seeded, 2, 3))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(saved["order"]["number"], "ROS-2025-0001");
    assert_eq!(saved["order"]["status"], "draft");
    assert_eq!(decimal(&saved["order"]["final_total"]), dec("135"));
    let order_id = saved["order"]["order_id"].as_str().unwrap().to_string();

    let (status, resolved) = call(&router, Method::GET, &format!("/orders/{}", order_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["lines"].as_array().unwrap().len(), 1);
    assert_eq!(resolved["customer"]["legal_name"], "Bar Centrale");

    let (status, edited) = call(
        &router,
        Method::PUT,
        &format!("/orders/{}", order_id),
        Some(order_body(&seeded, 1, 0)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["order"]["number"], "ROS-2025-0001");
    assert_eq!(decimal(&edited["order"]["subtotal"]), dec("54"));

    let (status, sent) = call(
        &router,
        Method::POST,
        &format!("/orders/{}/transitions", order_id),
        Some(json!({ "action": "send" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["status"], "sent");

    let (status, _) = call(
        &router,
        Method::POST,
        &format!("/orders/{}/transitions", order_id),
        Some(json!({ "action": "fulfill" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, proforma) = call(
        &router,
        Method::POST,
        &format!("/orders/{}/proforma", order_id),
        Some(json!({ "issue_date": "2025-03-11" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(proforma["number"], "ROS-2025-0001");

    let (status, _) = call(
        &router,
        Method::POST,
        &format!("/orders/{}/proforma", order_id),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let proforma_id = proforma["proforma_id"].as_str().unwrap();
    let (status, attached) = call(
        &router,
        Method::PUT,
        &format!("/proformas/{}/artifact", proforma_id),
        Some(json!({ "artifact_path": "proformas/ROS-2025-0001.pdf" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(attached["artifact_path"], "proformas/ROS-2025-0001.pdf");

    let (status, report) = call(
        &router,
        Method::POST,
        &format!("/orders/{}/email", order_id),
        Some(json!({ "kind": "proforma" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["filename"], "Proforma_ROS-2025-0001.txt");
    assert_eq!(app.transport.send_count(), 1);

    let (status, purchased) = call(
        &router,
        Method::GET,
        &format!(
            "/customers/{}/companies/{}/purchased-products",
            seeded.customer_id, seeded.company_id
        ),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(purchased["product_ids"], json!([seeded.product_id]));

    let (status, preferences) = call(
        &router,
        Method::GET,
        &format!(
            "/customers/{}/companies/{}/preferences",
            seeded.customer_id, seeded.company_id
        ),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preferences[&seeded.product_id]["cartons"], 1);

    let (status, _) = call(&router, Method::DELETE, &format!("/orders/{}", order_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&router, Method::GET, &format!("/orders/{}", order_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_order_is_a_bad_request() {
    let app = spawn_app();
    let router = app.router();
    let seeded = seed(&router).await;

    let (status, body) = call(&router, Method::POST, "/orders", Some(order_body(&seeded, 0, 0))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no valid lines"));
}

#[tokio::test]
async fn create_rejects_an_order_id() {
    let app = spawn_app();
    let router = app.router();
    let seeded = seed(&router).await;

    let mut body = order_body(&seeded, 1, 0);
    body["order_id"] = json!(uuid::Uuid::new_v4());
    let (status, _) = call(&router, Method::POST, "/orders", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let app = spawn_app();
    let router = app.router();
    let seeded = seed(&router).await;

    let mut body = order_body(&seeded, 1, 0);
    body["customer_id"] = json!(uuid::Uuid::new_v4());
    let (status, body) = call(&router, Method::POST, "/orders", Some(body)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("customer"));
}

#[tokio::test]
async fn deactivated_company_rejects_new_orders() {
    let app = spawn_app();
    let router = app.router();
    let seeded = seed(&router).await;

    let (status, _) = call(
        &router,
        Method::DELETE,
        &format!("/companies/{}", seeded.company_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&router, Method::POST, "/orders", Some(order_body(&seeded, 1, 0))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_company_name_is_rejected() {
    let app = spawn_app();
    let router = app.router();

    let (status, _) = call(
        &router,
        Method::POST,
        "/companies",
        Some(json!({ "display_name": "   " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_email_is_a_bad_gateway() {
    let app = spawn_app();
    let router = app.router();
    let seeded = seed(&router).await;

    let (_, saved) = call(&router, Method::POST, "/orders", Some(order_body(&seeded, 1, 0))).await;
    let order_id = saved["order"]["order_id"].as_str().unwrap().to_string();

    app.transport.set_failing(true);
    let (status, body) = call(
        &router,
        Method::POST,
        &format!("/orders/{}/email", order_id),
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Email error");
}

#[tokio::test]
async fn metrics_are_exposed() {
    let app = spawn_app();
    let router = app.router();
    let seeded = seed(&router).await;
    call(&router, Method::POST, "/orders", Some(order_body(&seeded, 1, 0))).await;

    let response = router
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("order_orders_saved_total"));
    assert!(text.contains("order_http_requests_total"));
}
