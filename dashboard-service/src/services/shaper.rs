//! Display shaping of monetary fields. Amounts are stored in cents.

use crate::models::{
    CustomerRollupRow, DashboardCards, DashboardSummary, FormattedCustomerRow,
    FormattedLatestInvoice, Invoice, InvoiceDetail, LatestInvoiceRow,
};

const CENTS_PER_UNIT: i64 = 100;

/// US dollar string for an amount in cents, e.g. `$1,234.56`.
pub fn format_currency(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let units = abs / CENTS_PER_UNIT as u64;
    let fraction = abs % CENTS_PER_UNIT as u64;

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}${}.{:02}", sign, grouped, fraction)
}

pub fn cents_to_units(cents: i64) -> f64 {
    cents as f64 / CENTS_PER_UNIT as f64
}

pub fn shape_invoice_detail(invoice: Invoice) -> InvoiceDetail {
    InvoiceDetail {
        id: invoice.id,
        customer_id: invoice.customer_id,
        amount: cents_to_units(invoice.amount),
        status: invoice.status,
        date: invoice.date,
    }
}

pub fn shape_customer_row(row: CustomerRollupRow) -> FormattedCustomerRow {
    FormattedCustomerRow {
        id: row.id,
        name: row.name,
        email: row.email,
        image_url: row.image_url,
        total_invoices: row.total_invoices,
        total_pending: format_currency(row.total_pending),
        total_paid: format_currency(row.total_paid),
    }
}

pub fn shape_latest_invoice(row: LatestInvoiceRow) -> FormattedLatestInvoice {
    FormattedLatestInvoice {
        id: row.id,
        name: row.name,
        email: row.email,
        image_url: row.image_url,
        amount: format_currency(row.amount),
    }
}

pub fn shape_summary(summary: DashboardSummary) -> DashboardCards {
    DashboardCards {
        number_of_invoices: summary.invoice_count,
        number_of_customers: summary.customer_count,
        total_paid_invoices: format_currency(summary.total_paid),
        total_pending_invoices: format_currency(summary.total_pending),
    }
}
