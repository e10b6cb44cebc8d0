#![allow(dead_code)]

use dashboard_service::models::{Customer, Invoice, InvoiceStatus, RevenueSample};
use dashboard_service::query::{CUSTOMERS, INVOICES, REVENUE};
use dashboard_service::services::DashboardData;
use dashboard_service::store::InMemoryStore;
use std::sync::Arc;

pub struct TestApp {
    pub store: InMemoryStore,
    pub data: DashboardData,
}

impl TestApp {
    /// Store seeded with the standard fixture.
    pub async fn spawn() -> Self {
        Self::with(&customers(), &invoices(), &revenue()).await
    }

    pub async fn with(
        customers: &[Customer],
        invoices: &[Invoice],
        revenue: &[RevenueSample],
    ) -> Self {
        let store = InMemoryStore::new();
        store
            .insert_many(CUSTOMERS, customers)
            .await
            .expect("Failed to seed customers");
        store
            .insert_many(INVOICES, invoices)
            .await
            .expect("Failed to seed invoices");
        store
            .insert_many(REVENUE, revenue)
            .await
            .expect("Failed to seed revenue");

        let data = DashboardData::new(Arc::new(store.clone()));
        TestApp { store, data }
    }
}

pub fn customer(id: &str, name: &str, email: &str) -> Customer {
    Customer {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        image_url: format!("/customers/{}.png", id),
    }
}

pub fn invoice(id: &str, customer_id: &str, amount: i64, status: InvoiceStatus, date: &str) -> Invoice {
    Invoice {
        id: id.to_string(),
        customer_id: customer_id.to_string(),
        amount,
        status,
        date: date.to_string(),
    }
}

/// `c6` has no invoices.
pub fn customers() -> Vec<Customer> {
    vec![
        customer("c1", "Evil Rabbit", "evil@rabbit.com"),
        customer("c2", "Delba de Oliveira", "delba@oliveira.com"),
        customer("c3", "Lee Robinson", "lee@robinson.com"),
        customer("c4", "Michael Novotny", "michael@novotny.com"),
        customer("c5", "Amy Burrell", "amy@burrell.com"),
        customer("c6", "Balazs Orban", "balazs@orban.com"),
    ]
}

/// `i14` references a customer that does not exist. `i08` and `i09` share a
/// date and sit on either side of the first page boundary, stored in the
/// opposite of their id order.
pub fn invoices() -> Vec<Invoice> {
    use InvoiceStatus::{Paid, Pending};
    vec![
        invoice("i01", "c1", 15795, Pending, "2022-12-06"),
        invoice("i02", "c2", 20348, Pending, "2022-11-14"),
        invoice("i03", "c5", 3040, Paid, "2022-10-29"),
        invoice("i04", "c4", 44800, Paid, "2023-09-10"),
        invoice("i05", "c3", 34577, Pending, "2023-08-05"),
        invoice("i06", "c3", 54246, Pending, "2023-07-16"),
        invoice("i07", "c1", 666, Pending, "2023-06-27"),
        invoice("i09", "c5", 1250, Paid, "2023-06-17"),
        invoice("i08", "c4", 32545, Paid, "2023-06-17"),
        invoice("i10", "c2", 8546, Paid, "2023-06-07"),
        invoice("i11", "c3", 500, Paid, "2023-08-19"),
        invoice("i12", "c4", 8945, Paid, "2023-06-03"),
        invoice("i13", "c5", 1000, Paid, "2022-06-05"),
        invoice("i14", "c-gone", 777, Paid, "2023-01-01"),
    ]
}

pub fn revenue() -> Vec<RevenueSample> {
    [("Jan", 2000), ("Feb", 1800), ("Mar", 2200), ("Apr", 2500)]
        .into_iter()
        .map(|(month, revenue)| RevenueSample {
            month: month.to_string(),
            revenue,
        })
        .collect()
}

/// Ids of fixture invoices matching `query`, computed by a full scan with
/// plain case-insensitive substring search. Newest first, ties by id.
pub fn expected_invoice_ids(query: &str) -> Vec<String> {
    let customers = customers();
    let needle = query.to_lowercase();
    let mut matched: Vec<Invoice> = invoices()
        .into_iter()
        .filter(|inv| {
            let Some(owner) = customers.iter().find(|c| c.id == inv.customer_id) else {
                return false;
            };
            [
                owner.name.clone(),
                owner.email.clone(),
                inv.status.to_string(),
                inv.amount.to_string(),
                inv.date.clone(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect();
    matched.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
    matched.into_iter().map(|inv| inv.id).collect()
}
