//! Customer documents and customer-shaped query rows.

use serde::{Deserialize, Serialize};

/// Customer document as stored in the `customers` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
}

/// Entry of the customer picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerField {
    pub id: String,
    pub name: String,
}

/// Customer with invoice totals, amounts in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRollupRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub total_invoices: i64,
    pub total_pending: i64,
    pub total_paid: i64,
}

/// Customer table row with display-ready totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedCustomerRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub total_invoices: i64,
    pub total_pending: String,
    pub total_paid: String,
}
