//! Public data operations consumed by route handlers.

use super::error::DataError;
use super::executor::{Operation, QueryExecutor};
use super::shaper;
use crate::models::{
    CustomerField, CustomerRollupRow, DashboardCards, DashboardSummary, FormattedCustomerRow,
    FormattedLatestInvoice, Invoice, InvoiceDetail, InvoiceListRow, LatestInvoiceRow,
    RevenueSample, StatusTotals,
};
use crate::query::{
    total_pages, Pagination, Pipeline, PipelineKind, SearchPattern, SortOrder, CUSTOMERS,
    INVOICES, REVENUE,
};
use crate::store::{DocumentStore, FindQuery};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

const FETCH_REVENUE: Operation = Operation::new("fetch_revenue", "Failed to fetch revenue data.");
const FETCH_LATEST_INVOICES: Operation = Operation::new(
    "fetch_latest_invoices",
    "Failed to fetch the latest invoices.",
);
const FETCH_CARD_DATA: Operation = Operation::new("fetch_card_data", "Failed to fetch card data.");
const FETCH_FILTERED_INVOICES: Operation =
    Operation::new("fetch_filtered_invoices", "Failed to fetch invoices.");
const FETCH_INVOICES_PAGES: Operation = Operation::new(
    "fetch_invoices_pages",
    "Failed to fetch total number of invoices.",
);
const FETCH_INVOICE_BY_ID: Operation =
    Operation::new("fetch_invoice_by_id", "Failed to fetch invoice.");
const FETCH_CUSTOMERS: Operation =
    Operation::new("fetch_customers", "Failed to fetch all customers.");
const FETCH_FILTERED_CUSTOMERS: Operation =
    Operation::new("fetch_filtered_customers", "Failed to fetch customer table.");

#[derive(Deserialize)]
struct CountRow {
    count: u64,
}

/// Dashboard queries over a shared, read-only store.
#[derive(Clone)]
pub struct DashboardData {
    executor: QueryExecutor,
}

impl DashboardData {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            executor: QueryExecutor::new(store),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        self.executor.store()
    }

    #[instrument(skip(self))]
    pub async fn fetch_revenue(&self) -> Result<Vec<RevenueSample>, DataError> {
        self.executor
            .find(REVENUE, &FindQuery::all(), FETCH_REVENUE)
            .await
    }

    /// Five most recent invoices with their customers, amounts formatted.
    #[instrument(skip(self))]
    pub async fn fetch_latest_invoices(&self) -> Result<Vec<FormattedLatestInvoice>, DataError> {
        let pipeline = Pipeline::build(&PipelineKind::LatestInvoices);
        let rows: Vec<LatestInvoiceRow> = self
            .executor
            .aggregate(&pipeline, FETCH_LATEST_INVOICES)
            .await?;
        Ok(rows.into_iter().map(shaper::shape_latest_invoice).collect())
    }

    /// Invoice count, customer count and paid/pending sums over the whole
    /// invoice collection.
    ///
    /// The three reads run concurrently; if any fails the summary fails.
    #[instrument(skip(self))]
    pub async fn fetch_dashboard_summary(&self) -> Result<DashboardSummary, DataError> {
        let pipeline = Pipeline::build(&PipelineKind::StatusTotals);

        let (invoice_count, customer_count, totals) = tokio::try_join!(
            self.executor.count(INVOICES, FETCH_CARD_DATA),
            self.executor.count(CUSTOMERS, FETCH_CARD_DATA),
            self.executor
                .aggregate::<StatusTotals>(&pipeline, FETCH_CARD_DATA),
        )?;

        // An empty collection groups into no document at all.
        let totals = totals.into_iter().next().unwrap_or_default();

        Ok(DashboardSummary {
            invoice_count,
            customer_count,
            total_paid: totals.paid,
            total_pending: totals.pending,
        })
    }

    /// Dashboard summary with currency formatting applied.
    pub async fn fetch_card_data(&self) -> Result<DashboardCards, DataError> {
        self.fetch_dashboard_summary()
            .await
            .map(shaper::shape_summary)
    }

    /// One page of invoices matching `query`, newest first.
    #[instrument(skip(self))]
    pub async fn fetch_filtered_invoices(
        &self,
        query: &str,
        current_page: i64,
    ) -> Result<Vec<InvoiceListRow>, DataError> {
        let pipeline = Pipeline::build(&PipelineKind::InvoiceList {
            pattern: SearchPattern::build(query),
            pagination: Pagination::page(current_page),
        });
        self.executor
            .aggregate(&pipeline, FETCH_FILTERED_INVOICES)
            .await
    }

    /// Number of invoices matching `query`, under the same predicate as
    /// [`Self::fetch_filtered_invoices`].
    #[instrument(skip(self))]
    pub async fn count_filtered_invoices(&self, query: &str) -> Result<u64, DataError> {
        let pipeline = Pipeline::build(&PipelineKind::InvoiceCount {
            pattern: SearchPattern::build(query),
        });
        let rows: Vec<CountRow> = self
            .executor
            .aggregate(&pipeline, FETCH_INVOICES_PAGES)
            .await?;
        Ok(rows.first().map_or(0, |row| row.count))
    }

    /// Total pages of invoices matching `query`.
    pub async fn fetch_invoices_pages(&self, query: &str) -> Result<u64, DataError> {
        self.count_filtered_invoices(query).await.map(total_pages)
    }

    /// Invoice for the edit form, amount converted to base currency units.
    #[instrument(skip(self))]
    pub async fn fetch_invoice_by_id(&self, id: &str) -> Result<Option<InvoiceDetail>, DataError> {
        let invoice: Option<Invoice> = self
            .executor
            .find_one(INVOICES, &FindQuery::by_key("id", id), FETCH_INVOICE_BY_ID)
            .await?;
        Ok(invoice.map(shaper::shape_invoice_detail))
    }

    /// Id and name of every customer, alphabetical.
    #[instrument(skip(self))]
    pub async fn fetch_customers(&self) -> Result<Vec<CustomerField>, DataError> {
        let query = FindQuery::all()
            .only(&["id", "name"])
            .sorted_by("name", SortOrder::Ascending);
        self.executor.find(CUSTOMERS, &query, FETCH_CUSTOMERS).await
    }

    /// Customers matching `query` by name or email, with invoice totals.
    #[instrument(skip(self))]
    pub async fn fetch_filtered_customers(
        &self,
        query: &str,
    ) -> Result<Vec<FormattedCustomerRow>, DataError> {
        let rows = self.fetch_customer_rollups(query).await?;
        Ok(rows.into_iter().map(shaper::shape_customer_row).collect())
    }

    /// Unformatted form of [`Self::fetch_filtered_customers`], totals in cents.
    pub async fn fetch_customer_rollups(
        &self,
        query: &str,
    ) -> Result<Vec<CustomerRollupRow>, DataError> {
        let pipeline = Pipeline::build(&PipelineKind::CustomerRollup {
            pattern: SearchPattern::build(query),
        });
        self.executor
            .aggregate(&pipeline, FETCH_FILTERED_CUSTOMERS)
            .await
    }
}
