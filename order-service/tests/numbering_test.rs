//! Integration tests for order and proforma numbering.

mod common;

use common::{date, draft, entry, spawn_app, spawn_app_with_attempts};
use order_service::error::OrderError;
use order_service::models::{ListOrdersFilter, SaveCompany};
use order_service::store::CatalogStore;
use std::collections::HashSet;

#[tokio::test]
async fn numbers_increase_within_company_and_year() {
    let app = spawn_app();
    let company = app.company("Rossi Beverages SRL").await;
    let customer = app.customer("Bar Centrale").await;
    let vino = app.product(&company, "VIN-001", "12.50").await;

    let mut numbers = Vec::new();
    for day in 1..=3 {
        let saved = app
            .state
            .orders
            .save_order(draft(&company, &customer, date(2025, 4, day), vec![entry(&vino, 1, 0)]))
            .await
            .unwrap();
        numbers.push(saved.order.number);
    }

    assert_eq!(numbers, vec!["ROS-2025-0001", "ROS-2025-0002", "ROS-2025-0003"]);
}

#[tokio::test]
async fn each_company_has_its_own_sequence() {
    let app = spawn_app();
    let rossi = app.company("Rossi Beverages SRL").await;
    let bianchi = app.company("Bianchi Distribuzione").await;
    let customer = app.customer("Bar Centrale").await;
    let vino = app.product(&rossi, "VIN-001", "12.50").await;
    let pasta = app.product(&bianchi, "PAS-001", "1.20").await;

    let orders = &app.state.orders;
    let r1 = orders
        .save_order(draft(&rossi, &customer, date(2025, 4, 1), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();
    let b1 = orders
        .save_order(draft(&bianchi, &customer, date(2025, 4, 1), vec![entry(&pasta, 1, 0)]))
        .await
        .unwrap();
    let r2 = orders
        .save_order(draft(&rossi, &customer, date(2025, 4, 2), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();

    assert_eq!(r1.order.number, "ROS-2025-0001");
    assert_eq!(b1.order.number, "BIA-2025-0001");
    assert_eq!(r2.order.number, "ROS-2025-0002");
}

#[tokio::test]
async fn companies_sharing_a_prefix_keep_separate_sequences() {
    let app = spawn_app();
    let rossi = app.company("Rossi Beverages SRL").await;
    let rosa = app.company("Rosa Vini").await;
    let customer = app.customer("Bar Centrale").await;
    let vino = app.product(&rossi, "VIN-001", "12.50").await;
    let rosato = app.product(&rosa, "ROS-001", "8.00").await;

    let first = app
        .state
        .orders
        .save_order(draft(&rossi, &customer, date(2025, 4, 1), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();
    let second = app
        .state
        .orders
        .save_order(draft(&rosa, &customer, date(2025, 4, 1), vec![entry(&rosato, 1, 0)]))
        .await
        .unwrap();

    assert_eq!(first.order.number, "ROS-2025-0001");
    assert_eq!(second.order.number, "ROS-2025-0001");
}

#[tokio::test]
async fn sequence_restarts_with_the_year() {
    let app = spawn_app();
    let company = app.company("Rossi Beverages SRL").await;
    let customer = app.customer("Bar Centrale").await;
    let vino = app.product(&company, "VIN-001", "12.50").await;

    let orders = &app.state.orders;
    orders
        .save_order(draft(&company, &customer, date(2025, 12, 30), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();
    let december = orders
        .save_order(draft(&company, &customer, date(2025, 12, 31), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();
    let january = orders
        .save_order(draft(&company, &customer, date(2026, 1, 1), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();

    assert_eq!(december.order.number, "ROS-2025-0002");
    assert_eq!(january.order.number, "ROS-2026-0001");
    assert_eq!(january.order.number_year, 2026);
    assert_eq!(january.order.number_sequence, 1);
}

#[tokio::test]
async fn prefix_falls_back_when_name_has_no_alphanumerics() {
    let app = spawn_app();
    let company = app.company("!!! ---").await;
    let customer = app.customer("Bar Centrale").await;
    let vino = app.product(&company, "VIN-001", "12.50").await;

    let saved = app
        .state
        .orders
        .save_order(draft(&company, &customer, date(2025, 4, 1), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();

    assert_eq!(saved.order.number, "AZ-2025-0001");
}

#[tokio::test]
async fn renamed_company_continues_its_sequence() {
    let app = spawn_app();
    let company = app.company("Rossi Beverages SRL").await;
    let customer = app.customer("Bar Centrale").await;
    let vino = app.product(&company, "VIN-001", "12.50").await;

    let orders = &app.state.orders;
    let before = orders
        .save_order(draft(&company, &customer, date(2025, 4, 1), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();
    orders
        .issue_proforma(before.order.order_id, Some(date(2025, 4, 1)))
        .await
        .unwrap();

    let renamed = app
        .store
        .save_company(&SaveCompany {
            company_id: Some(company.company_id),
            display_name: "Bianchi Vini".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let after = orders
        .save_order(draft(&renamed, &customer, date(2025, 4, 2), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();
    let proforma = orders
        .issue_proforma(after.order.order_id, Some(date(2025, 4, 2)))
        .await
        .unwrap();

    assert_eq!(before.order.number, "ROS-2025-0001");
    assert_eq!(after.order.number, "BIA-2025-0002");
    assert_eq!(after.order.number_sequence, 2);
    assert_eq!(proforma.number, "BIA-2025-0002");
}

#[tokio::test]
async fn proforma_numbers_are_independent_of_order_numbers() {
    let app = spawn_app();
    let company = app.company("Rossi Beverages SRL").await;
    let customer = app.customer("Bar Centrale").await;
    let vino = app.product(&company, "VIN-001", "12.50").await;

    let orders = &app.state.orders;
    orders
        .save_order(draft(&company, &customer, date(2025, 4, 1), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();
    let second = orders
        .save_order(draft(&company, &customer, date(2025, 4, 2), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();

    let proforma = orders
        .issue_proforma(second.order.order_id, Some(date(2025, 4, 3)))
        .await
        .unwrap();

    assert_eq!(second.order.number, "ROS-2025-0002");
    assert_eq!(proforma.number, "ROS-2025-0001");
    assert_eq!(proforma.number_year, 2025);
}

#[tokio::test]
async fn concurrent_writer_conflict_is_retried() {
    let app = spawn_app();
    let company = app.company("Rossi Beverages SRL").await;
    let customer = app.customer("Bar Centrale").await;
    let vino = app.product(&company, "VIN-001", "12.50").await;

    app.state
        .orders
        .save_order(draft(&company, &customer, date(2025, 4, 1), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();

    // The next two reads miss the committed order, so two attempts collide.
    app.store.inject_stale_reads(2);

    let saved = app
        .state
        .orders
        .save_order(draft(&company, &customer, date(2025, 4, 2), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();

    assert_eq!(saved.attempts, 3);
    assert_eq!(saved.order.number, "ROS-2025-0002");

    let orders = app
        .state
        .orders
        .list_orders(&ListOrdersFilter::default())
        .await
        .unwrap();
    assert_eq!(orders.len(), 2);
}

#[tokio::test]
async fn exhausted_retries_surface_the_conflict() {
    let app = spawn_app_with_attempts(2);
    let company = app.company("Rossi Beverages SRL").await;
    let customer = app.customer("Bar Centrale").await;
    let vino = app.product(&company, "VIN-001", "12.50").await;

    app.state
        .orders
        .save_order(draft(&company, &customer, date(2025, 4, 1), vec![entry(&vino, 1, 0)]))
        .await
        .unwrap();

    app.store.inject_stale_reads(5);

    let result = app
        .state
        .orders
        .save_order(draft(&company, &customer, date(2025, 4, 2), vec![entry(&vino, 1, 0)]))
        .await;

    assert!(matches!(
        result,
        Err(OrderError::NumberingConflict { ref number }) if number == "ROS-2025-0001"
    ));

    let orders = app
        .state
        .orders
        .list_orders(&ListOrdersFilter::default())
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
}

#[tokio::test]
async fn concurrent_saves_get_distinct_numbers() {
    let app = spawn_app();
    let company = app.company("Rossi Beverages SRL").await;
    let customer = app.customer("Bar Centrale").await;
    let vino = app.product(&company, "VIN-001", "12.50").await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let orders = app.state.orders.clone();
        let order = draft(&company, &customer, date(2025, 4, 1), vec![entry(&vino, 1, 0)]);
        handles.push(tokio::spawn(async move { orders.save_order(order).await }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let saved = handle.await.unwrap().unwrap();
        numbers.insert(saved.order.number);
    }

    assert_eq!(numbers.len(), 10);
    for sequence in 1..=10 {
        assert!(numbers.contains(&format!("ROS-2025-{:04}", sequence)));
    }
}
