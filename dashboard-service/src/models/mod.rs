//! Stored documents and the explicit row types each query decodes into.

pub mod customer;
pub mod invoice;
pub mod revenue;
pub mod summary;

pub use customer::{Customer, CustomerField, CustomerRollupRow, FormattedCustomerRow};
pub use invoice::{
    FormattedLatestInvoice, Invoice, InvoiceDetail, InvoiceListRow, InvoiceStatus,
    LatestInvoiceRow,
};
pub use revenue::RevenueSample;
pub use summary::{DashboardCards, DashboardSummary, StatusTotals};
