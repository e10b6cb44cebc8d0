//! Dashboard Service - search, pagination and rollups over invoices and customers.

pub mod config;
pub mod models;
pub mod query;
pub mod services;
pub mod store;
