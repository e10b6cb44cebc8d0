use serde::{Deserialize, Serialize};

/// Monthly revenue sample for the revenue chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueSample {
    pub month: String,
    pub revenue: i64,
}
