pub mod data;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod shaper;

pub use data::DashboardData;
pub use error::DataError;
pub use executor::{Operation, QueryExecutor};
pub use metrics::{get_metrics, init_metrics};
