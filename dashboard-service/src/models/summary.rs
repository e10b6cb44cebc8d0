//! Dashboard card figures.

use serde::{Deserialize, Serialize};

/// Output of the status totals `$group` stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTotals {
    #[serde(default)]
    pub paid: i64,
    #[serde(default)]
    pub pending: i64,
}

/// Whole-collection counts and sums, amounts in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub invoice_count: u64,
    pub customer_count: u64,
    pub total_paid: i64,
    pub total_pending: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardCards {
    pub number_of_invoices: u64,
    pub number_of_customers: u64,
    pub total_paid_invoices: String,
    pub total_pending_invoices: String,
}
