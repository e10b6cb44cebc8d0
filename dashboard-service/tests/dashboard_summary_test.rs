mod common;

use common::{customer, invoice, invoices, TestApp};
use dashboard_service::models::{InvoiceStatus, RevenueSample};
use dashboard_service::services::DataError;

#[tokio::test]
async fn test_summary_sums_by_status() {
    let customers = vec![customer("c1", "Jane Doe", "jane@doe.com")];
    let invoices = vec![
        invoice("a", "c1", 500, InvoiceStatus::Paid, "2023-01-01"),
        invoice("b", "c1", 300, InvoiceStatus::Pending, "2023-01-02"),
        invoice("c", "c1", 200, InvoiceStatus::Paid, "2023-01-03"),
    ];
    let app = TestApp::with(&customers, &invoices, &[]).await;

    let summary = app.data.fetch_dashboard_summary().await.unwrap();
    assert_eq!(summary.invoice_count, 3);
    assert_eq!(summary.customer_count, 1);
    assert_eq!(summary.total_paid, 700);
    assert_eq!(summary.total_pending, 300);
}

#[tokio::test]
async fn test_summary_counts_every_invoice() {
    let app = TestApp::spawn().await;

    let summary = app.data.fetch_dashboard_summary().await.unwrap();
    let all = invoices();
    let sum = |status: InvoiceStatus| -> i64 {
        all.iter()
            .filter(|inv| inv.status == status)
            .map(|inv| inv.amount)
            .sum()
    };

    // The orphaned invoice has no customer but still counts here.
    assert_eq!(summary.invoice_count, 14);
    assert_eq!(summary.customer_count, 6);
    assert_eq!(summary.total_paid, sum(InvoiceStatus::Paid));
    assert_eq!(summary.total_pending, sum(InvoiceStatus::Pending));
}

#[tokio::test]
async fn test_summary_of_empty_store_is_zero() {
    let app = TestApp::with(&[], &[], &[]).await;

    let summary = app.data.fetch_dashboard_summary().await.unwrap();
    assert_eq!(summary.invoice_count, 0);
    assert_eq!(summary.customer_count, 0);
    assert_eq!(summary.total_paid, 0);
    assert_eq!(summary.total_pending, 0);
}

#[tokio::test]
async fn test_card_data_is_formatted() {
    let app = TestApp::spawn().await;

    let cards = app.data.fetch_card_data().await.unwrap();
    assert_eq!(cards.number_of_invoices, 14);
    assert_eq!(cards.number_of_customers, 6);
    assert_eq!(cards.total_paid_invoices, "$1,014.03");
    assert_eq!(cards.total_pending_invoices, "$1,256.32");
}

#[tokio::test]
async fn test_invoice_by_id_converts_amount() {
    let app = TestApp::spawn().await;

    let detail = app.data.fetch_invoice_by_id("i01").await.unwrap().unwrap();
    assert_eq!(detail.id, "i01");
    assert_eq!(detail.customer_id, "c1");
    assert_eq!(detail.amount, 157.95);
    assert_eq!(detail.status, InvoiceStatus::Pending);
    assert_eq!(detail.date, "2022-12-06");
}

#[tokio::test]
async fn test_unknown_invoice_id_is_absent() {
    let app = TestApp::spawn().await;

    assert!(app.data.fetch_invoice_by_id("nope").await.unwrap().is_none());
    assert!(app.data.fetch_invoice_by_id("").await.unwrap().is_none());
}

#[tokio::test]
async fn test_latest_invoices_are_five_newest() {
    let app = TestApp::spawn().await;

    let latest = app.data.fetch_latest_invoices().await.unwrap();
    let ids: Vec<&str> = latest.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(ids, ["i04", "i11", "i05", "i06", "i07"]);
    assert_eq!(latest[0].name, "Michael Novotny");
    assert_eq!(latest[0].amount, "$448.00");
    assert_eq!(latest[4].amount, "$6.66");
}

#[tokio::test]
async fn test_revenue_samples() {
    let app = TestApp::spawn().await;

    let revenue = app.data.fetch_revenue().await.unwrap();
    assert_eq!(revenue.len(), 4);
    assert_eq!(
        revenue[0],
        RevenueSample {
            month: "Jan".to_string(),
            revenue: 2000,
        }
    );
}

#[tokio::test]
async fn test_failures_carry_operation_messages() {
    let app = TestApp::spawn().await;
    app.store.fail_with("connection refused").await;

    let cases: Vec<(DataError, &str)> = vec![
        (
            app.data.fetch_filtered_invoices("", 1).await.unwrap_err(),
            "Failed to fetch invoices.",
        ),
        (
            app.data.fetch_invoices_pages("").await.unwrap_err(),
            "Failed to fetch total number of invoices.",
        ),
        (
            app.data.fetch_invoice_by_id("i01").await.unwrap_err(),
            "Failed to fetch invoice.",
        ),
        (
            app.data.fetch_filtered_customers("").await.unwrap_err(),
            "Failed to fetch customer table.",
        ),
        (
            app.data.fetch_dashboard_summary().await.unwrap_err(),
            "Failed to fetch card data.",
        ),
        (
            app.data.fetch_revenue().await.unwrap_err(),
            "Failed to fetch revenue data.",
        ),
        (
            app.data.fetch_latest_invoices().await.unwrap_err(),
            "Failed to fetch the latest invoices.",
        ),
        (
            app.data.fetch_customers().await.unwrap_err(),
            "Failed to fetch all customers.",
        ),
    ];

    for (err, message) in cases {
        assert_eq!(err.message(), message);
        // Driver detail stays in the logs.
        assert!(!err.to_string().contains("connection refused"));
    }
}

#[tokio::test]
async fn test_reads_resume_after_recovery() {
    let app = TestApp::spawn().await;
    app.store.fail_with("connection refused").await;
    assert!(app.data.fetch_dashboard_summary().await.is_err());

    app.store.recover().await;
    assert!(app.data.fetch_dashboard_summary().await.is_ok());
}
