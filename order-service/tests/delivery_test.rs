//! Integration tests for rendering and emailing order documents.

mod common;

use common::{date, draft, priced_entry, spawn_app, TestApp};
use order_service::models::{DocumentKind, Order, OrderStatus, SaveCustomer};
use order_service::services::{DeliveryError, EmailRequest};
use order_service::store::CatalogStore;

async fn saved_order(app: &TestApp) -> Order {
    let company = app.company("Rossi Beverages SRL").await;
    let customer = app.customer("Bar Centrale").await;
    let vino = app.product(&company, "VIN-001", "12.50").await;

    app.state
        .orders
        .save_order(draft(
            &company,
            &customer,
            date(2025, 7, 1),
            vec![priced_entry(&vino, 2, 3, "10.00", "10")],
        ))
        .await
        .unwrap()
        .order
}

fn attachment_text(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn order_confirmation_is_sent_to_the_customer() {
    let app = spawn_app();
    let order = saved_order(&app).await;

    let report = app
        .state
        .dispatch
        .send_order_document(order.order_id, DocumentKind::Order, EmailRequest::default())
        .await
        .unwrap();

    assert_eq!(report.recipient, "cliente@example.com");
    assert_eq!(report.filename, "Conferma_ordine_ROS-2025-0001.txt");
    assert_eq!(report.message_id.as_deref(), Some("mock-email-1"));
    assert_eq!(app.transport.send_count(), 1);

    let sent = app.transport.sent();
    let email = &sent[0];
    assert_eq!(email.subject, "Conferma ordine ROS-2025-0001");
    assert!(email.body.starts_with("Gentile Bar Centrale,"));
    assert!(email.body.contains("del 01/07/2025"));
    assert!(email.mime_type.starts_with("text/plain"));

    let text = attachment_text(&email.attachment);
    assert!(text.contains("Agenzia Test"));
    assert!(text.contains("Fornitore: Rossi Beverages SRL"));
    assert!(text.contains("Cliente: Bar Centrale"));
    assert!(text.contains("VIN-001"));
    assert!(text.contains("135.00"));
    assert!(text.contains("Totale: 135.00"));
}

#[tokio::test]
async fn overrides_replace_recipient_subject_and_body() {
    let app = spawn_app();
    let order = saved_order(&app).await;

    app.state
        .dispatch
        .send_order_document(
            order.order_id,
            DocumentKind::Order,
            EmailRequest {
                to: Some("acquisti@barcentrale.it".to_string()),
                cc: vec!["agente@example.com".to_string()],
                bcc: vec![],
                subject: Some("Il suo ordine".to_string()),
                body: Some("In allegato.".to_string()),
            },
        )
        .await
        .unwrap();

    let sent = app.transport.sent();
    assert_eq!(sent[0].to, "acquisti@barcentrale.it");
    assert_eq!(sent[0].cc, vec!["agente@example.com".to_string()]);
    assert_eq!(sent[0].subject, "Il suo ordine");
    assert_eq!(sent[0].body, "In allegato.");
}

#[tokio::test]
async fn proforma_document_needs_an_issued_proforma() {
    let app = spawn_app();
    let order = saved_order(&app).await;

    let result = app
        .state
        .dispatch
        .send_order_document(order.order_id, DocumentKind::Proforma, EmailRequest::default())
        .await;
    assert!(matches!(result, Err(DeliveryError::ProformaNotIssued(_))));
    assert_eq!(app.transport.send_count(), 0);

    app.state
        .orders
        .issue_proforma(order.order_id, Some(date(2025, 7, 2)))
        .await
        .unwrap();

    let report = app
        .state
        .dispatch
        .send_order_document(order.order_id, DocumentKind::Proforma, EmailRequest::default())
        .await
        .unwrap();

    assert_eq!(report.filename, "Proforma_ROS-2025-0001.txt");
    let text = attachment_text(&app.transport.sent()[0].attachment);
    assert!(text.contains("Data: 02/07/2025"));
    assert!(text.contains("Ordine: ROS-2025-0001 del 01/07/2025"));
}

#[tokio::test]
async fn customer_without_email_needs_a_recipient() {
    let app = spawn_app();
    let company = app.company("Rossi Beverages SRL").await;
    let customer = app
        .store
        .save_customer(&SaveCustomer {
            legal_name: "Tabaccheria Rossi".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let vino = app.product(&company, "VIN-001", "12.50").await;

    let order = app
        .state
        .orders
        .save_order(draft(
            &company,
            &customer,
            date(2025, 7, 1),
            vec![priced_entry(&vino, 1, 0, "10.00", "0")],
        ))
        .await
        .unwrap()
        .order;

    let result = app
        .state
        .dispatch
        .send_order_document(order.order_id, DocumentKind::Order, EmailRequest::default())
        .await;

    assert!(matches!(
        result,
        Err(DeliveryError::MissingRecipient(id)) if id == customer.customer_id
    ));
    assert_eq!(app.transport.send_count(), 0);
}

#[tokio::test]
async fn transport_failure_leaves_the_order_untouched() {
    let app = spawn_app();
    let order = saved_order(&app).await;

    app.transport.set_failing(true);

    let result = app
        .state
        .dispatch
        .send_order_document(order.order_id, DocumentKind::Order, EmailRequest::default())
        .await;
    assert!(matches!(result, Err(DeliveryError::Email(_))));

    let stored = app.state.orders.get_order(order.order_id).await.unwrap();
    assert_eq!(stored.order.status(), OrderStatus::Draft);
    assert_eq!(stored.order.updated_utc, order.updated_utc);
    assert_eq!(stored.lines.len(), 1);
}
