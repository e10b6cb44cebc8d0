//! Query-plan construction: search patterns, stage values and the pipeline
//! builders for each supported query shape.

pub mod pattern;
pub mod pipeline;
pub mod stage;

pub use pattern::SearchPattern;
pub use pipeline::{
    total_pages, Pagination, Pipeline, PipelineKind, COUNT_FIELD, CUSTOMERS, INVOICES,
    ITEMS_PER_PAGE, REVENUE,
};
pub use stage::{Expr, Filter, SortOrder, Stage};
